//! Instances barely used at all, candidates for deletion.
//!
//! Runs the same three-signal count as compute rightsizing with lower
//! thresholds. Every shape is eligible and instances without a series are
//! not reported.

use async_trait::async_trait;

use super::compute_rightsizing::{count_signals, format_ocpus, SignalTracker};
use super::{Heuristic, HeuristicKind, RunContext, SignalQuery, SignalState};
use crate::inventory::ProfileScope;
use crate::metrics::{MetricQuery, COMPUTE_AGENT_NAMESPACE};
use crate::models::{Category, Compartment, ComputeInstance, ObjectType, Recommendation, Suggestion};
use crate::partial::PartialResult;

pub const DECOMMISSION_QUERIES: [SignalQuery; 3] = [
    SignalQuery {
        query: MetricQuery::new(COMPUTE_AGENT_NAMESPACE, "CpuUtilization[1d].mean() > 5", 90),
        hit_threshold: 3,
        detail: "Avg Cpu 90dd - Threshold Reached (>5%)",
    },
    SignalQuery {
        query: MetricQuery::new(COMPUTE_AGENT_NAMESPACE, "CpuUtilization[1m].max() > 5", 7),
        hit_threshold: 180,
        detail: "Max Cpu 7dd - Threshold Reached (>5%)",
    },
    SignalQuery {
        query: MetricQuery::new(COMPUTE_AGENT_NAMESPACE, "MemoryUtilization[1m].max() > 40", 7),
        hit_threshold: 1,
        detail: "Max Memory 7dd - Threshold Reached (>40%)",
    },
];

pub struct ComputeDecommissioning;

impl ComputeDecommissioning {
    fn decommission(
        instance: &ComputeInstance,
        compartment: &Compartment,
        id: &str,
        name: &str,
        tracker: &SignalTracker,
    ) -> Recommendation {
        let rec = if instance.is_kubernetes_node() {
            Recommendation::new(
                Category::UnusedServiceDecommissioning,
                Suggestion::DeleteKubernetesNodeNotUsed,
                ObjectType::ClusterKubernetes,
                compartment,
                id,
                name,
            )
            .with_detail("Oke Cluster Name", instance.cluster_name().unwrap_or("-"))
        } else {
            Recommendation::new(
                Category::ComputeInstanceDecommissioning,
                Suggestion::DeleteComputeInstanceNotUsed,
                ObjectType::ComputeInstance,
                compartment,
                id,
                name,
            )
        };

        let rec = rec
            .with_detail("Instance Name", name)
            .with_detail("Shape", instance.shape.as_deref().unwrap_or("-"))
            .with_detail("Cpu Core Count", format_ocpus(instance.ocpus()));
        tracker.details(&DECOMMISSION_QUERIES, rec)
    }
}

#[async_trait]
impl Heuristic for ComputeDecommissioning {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::ComputeDecommissioning
    }

    async fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            for compartment in &scope.compartments {
                let Some(counts) =
                    count_signals(ctx, scope, compartment, &DECOMMISSION_QUERIES, &[], &mut out).await
                else {
                    continue;
                };

                for instance in counts.instances.iter().filter(|i| !i.is_stopped()) {
                    let (id, name) = match instance.id().and_then(|id| Ok((id, instance.name()?))) {
                        Ok(v) => v,
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, instance.id.as_deref(), &e));
                            continue;
                        }
                    };
                    if let Some(tracker) = counts
                        .trackers
                        .get(id)
                        .filter(|t| t.state == SignalState::Three)
                    {
                        out.push(Self::decommission(instance, compartment, id, name, tracker));
                    }
                }
            }
        }
        out
    }
}
