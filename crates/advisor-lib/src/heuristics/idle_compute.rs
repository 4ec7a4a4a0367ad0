//! Instances whose infrastructure health never reported them up.

use async_trait::async_trait;
use std::collections::HashSet;

use super::{Heuristic, HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::metrics::{MetricQuery, COMPUTE_HEALTH_NAMESPACE};
use crate::models::{Category, ComputeInstance, Compartment, ObjectType, Recommendation, Suggestion};
use crate::partial::PartialResult;

/// A datapoint of 1.0 marks a 5-minute slot in which the instance was up.
pub const IDLE_QUERY: MetricQuery =
    MetricQuery::new(COMPUTE_HEALTH_NAMESPACE, "instance_status[5m].mean() == 0", 8);

pub struct IdleCompute;

impl IdleCompute {
    fn recommend(instance: &ComputeInstance, compartment: &Compartment, id: &str, name: &str) -> Recommendation {
        let shape = instance.shape.as_deref().unwrap_or("-");
        if instance.is_kubernetes_node() {
            Recommendation::new(
                Category::UnusedServiceDecommissioning,
                Suggestion::DeleteKubernetesNodeNotActive,
                ObjectType::ClusterKubernetes,
                compartment,
                id,
                name,
            )
            .with_detail("Node Name", name)
            .with_detail("Oke Cluster Name", instance.cluster_name().unwrap_or("-"))
            .with_detail("Instance Shape", shape)
        } else {
            Recommendation::new(
                Category::ComputeInstanceIdle,
                Suggestion::DeleteComputeInstanceNotActive,
                ObjectType::ComputeInstance,
                compartment,
                id,
                name,
            )
            .with_detail("Instance Name", name)
            .with_detail("Instance Shape", shape)
        }
    }
}

#[async_trait]
impl Heuristic for IdleCompute {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::IdleCompute
    }

    async fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            for compartment in &scope.compartments {
                let instances = match scope.instances(compartment).await {
                    Ok(instances) => instances,
                    Err(e) => {
                        out.fail(scope.compartment_failure(compartment, &e));
                        continue;
                    }
                };
                if instances.is_empty() {
                    continue;
                }

                let series = match scope.summarize(ctx.now, compartment, &IDLE_QUERY).await {
                    Ok(series) => series,
                    Err(e) => {
                        out.fail(scope.compartment_failure(compartment, &e));
                        continue;
                    }
                };

                // Any slot where the instance was up clears it.
                let mut seen_up = HashSet::new();
                for stream in &series.streams {
                    let resource_id = match stream.resource_id() {
                        Ok(id) => id,
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, None, &e));
                            continue;
                        }
                    };
                    match stream.count_equal(1.0) {
                        Ok(0) => {}
                        Ok(_) => {
                            seen_up.insert(resource_id.to_string());
                        }
                        Err(e) => {
                            // Unreadable samples never count as idle.
                            seen_up.insert(resource_id.to_string());
                            out.fail(scope.resource_failure(compartment, Some(resource_id), &e));
                        }
                    }
                }

                for instance in &instances {
                    let (id, name) = match instance.id().and_then(|id| Ok((id, instance.name()?))) {
                        Ok(v) => v,
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, instance.id.as_deref(), &e));
                            continue;
                        }
                    };
                    if seen_up.contains(id) {
                        continue;
                    }
                    out.push(Self::recommend(instance, compartment, id, name));
                }
            }
        }
        out
    }
}
