//! Instances that stay well below their capacity on CPU and memory.
//!
//! Three thresholded signals are evaluated independently. An instance is
//! recommended only when all three hit.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::{Heuristic, HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::metrics::{MetricQuery, COMPUTE_AGENT_NAMESPACE};
use crate::models::{Category, Compartment, ComputeInstance, ObjectType, Recommendation, Suggestion};
use crate::partial::PartialResult;

/// Shapes too small to be downsized.
pub const EXEMPT_SHAPES: &[&str] = &["VM.Standard2.1", "VM.StandardE2.1"];

/// One thresholded signal: the query yields 1.0 wherever its condition
/// holds, and the signal fires when such datapoints exceed `hit_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct SignalQuery {
    pub query: MetricQuery,
    pub hit_threshold: usize,
    pub detail: &'static str,
}

pub const SIGNAL_QUERIES: [SignalQuery; 3] = [
    SignalQuery {
        query: MetricQuery::new(COMPUTE_AGENT_NAMESPACE, "CpuUtilization[1d].mean() > 50", 90),
        hit_threshold: 3,
        detail: "Avg Cpu 90dd - Threshold Reached (>50%)",
    },
    SignalQuery {
        query: MetricQuery::new(COMPUTE_AGENT_NAMESPACE, "CpuUtilization[1m].max() > 50", 7),
        hit_threshold: 180,
        detail: "Max Cpu 7dd - Threshold Reached (>50%)",
    },
    SignalQuery {
        query: MetricQuery::new(COMPUTE_AGENT_NAMESPACE, "MemoryUtilization[1m].max() > 90", 7),
        hit_threshold: 1,
        detail: "Max Memory 7dd - Threshold Reached (>90%)",
    },
];

/// Number of signals that fired for one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignalState {
    #[default]
    None,
    One,
    Two,
    Three,
}

impl SignalState {
    /// Moves one step up, saturating at [`SignalState::Three`].
    pub fn advance(self) -> Self {
        match self {
            SignalState::None => SignalState::One,
            SignalState::One => SignalState::Two,
            SignalState::Two | SignalState::Three => SignalState::Three,
        }
    }

    pub fn count(self) -> u8 {
        match self {
            SignalState::None => 0,
            SignalState::One => 1,
            SignalState::Two => 2,
            SignalState::Three => 3,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct SignalTracker {
    pub(super) state: SignalState,
    pub(super) hits: [Option<usize>; 3],
}

impl SignalTracker {
    /// Appends one "hits / threshold" detail per signal.
    pub(super) fn details(&self, signals: &[SignalQuery; 3], mut rec: Recommendation) -> Recommendation {
        for (signal, hits) in signals.iter().zip(self.hits.iter()) {
            rec = rec.with_detail(
                signal.detail,
                format!("{} / {}", hits.unwrap_or(0), signal.hit_threshold),
            );
        }
        rec
    }
}

/// Signal trackers for the instances of one compartment.
pub(super) struct SignalCounts {
    pub(super) instances: Vec<ComputeInstance>,
    pub(super) trackers: HashMap<String, SignalTracker>,
    /// False when any of the three queries failed.
    pub(super) all_queries_ok: bool,
}

/// Lists a compartment's instances and runs the three signal queries
/// against it. Shapes in `exempt_shapes` never advance their tracker.
///
/// Returns `None` when the compartment has no instances or they could not
/// be listed.
pub(super) async fn count_signals(
    ctx: &RunContext<'_>,
    scope: &ProfileScope,
    compartment: &Compartment,
    signals: &[SignalQuery; 3],
    exempt_shapes: &[&str],
    out: &mut PartialResult<Recommendation>,
) -> Option<SignalCounts> {
    let instances = match scope.instances(compartment).await {
        Ok(instances) => instances,
        Err(e) => {
            out.fail(scope.compartment_failure(compartment, &e));
            return None;
        }
    };
    if instances.is_empty() {
        return None;
    }

    let exempt_ids: HashSet<String> = instances
        .iter()
        .filter(|i| i.shape.as_deref().is_some_and(|s| exempt_shapes.contains(&s)))
        .filter_map(|i| i.id.clone())
        .collect();

    let mut trackers: HashMap<String, SignalTracker> = HashMap::new();
    let mut all_queries_ok = true;

    for (slot, signal) in signals.iter().enumerate() {
        let series = match scope.summarize(ctx.now, compartment, &signal.query).await {
            Ok(series) => series,
            Err(e) => {
                all_queries_ok = false;
                out.fail(scope.compartment_failure(compartment, &e));
                continue;
            }
        };

        for stream in &series.streams {
            let resource_id = match stream.resource_id() {
                Ok(id) => id,
                Err(e) => {
                    out.fail(scope.resource_failure(compartment, None, &e));
                    continue;
                }
            };
            let hits = match stream.count_equal(1.0) {
                Ok(hits) => hits,
                Err(e) => {
                    out.fail(scope.resource_failure(compartment, Some(resource_id), &e));
                    continue;
                }
            };

            let tracker = trackers.entry(resource_id.to_string()).or_default();
            tracker.hits[slot] = Some(hits);
            if hits > signal.hit_threshold && !exempt_ids.contains(resource_id) {
                tracker.state = tracker.state.advance();
            }
        }
    }

    Some(SignalCounts {
        instances,
        trackers,
        all_queries_ok,
    })
}

pub struct ComputeRightsizing;

impl ComputeRightsizing {
    fn rightsizing(
        instance: &ComputeInstance,
        compartment: &Compartment,
        id: &str,
        name: &str,
        shape: &str,
        tracker: &SignalTracker,
    ) -> Recommendation {
        let rec = if instance.is_kubernetes_node() {
            Recommendation::new(
                Category::KubernetesClusterRightsizing,
                Suggestion::ResizeOversizedKubernetesCluster,
                ObjectType::ClusterKubernetes,
                compartment,
                id,
                name,
            )
            .with_detail("Oke Cluster Name", instance.cluster_name().unwrap_or("-"))
        } else {
            Recommendation::new(
                Category::ComputeInstanceRightsizing,
                Suggestion::ResizeOversizedComputeInstance,
                ObjectType::ComputeInstance,
                compartment,
                id,
                name,
            )
        };

        let rec = rec
            .with_detail("Instance Name", name)
            .with_detail("Shape", shape)
            .with_detail("Cpu Core Count", format_ocpus(instance.ocpus()));
        tracker.details(&SIGNAL_QUERIES, rec)
    }

    fn without_monitoring(
        instance: &ComputeInstance,
        compartment: &Compartment,
        id: &str,
        name: &str,
        shape: &str,
    ) -> Recommendation {
        let object_type = if instance.is_kubernetes_node() {
            ObjectType::ClusterKubernetes
        } else {
            ObjectType::ComputeInstance
        };
        Recommendation::new(
            Category::ComputeInstanceWithoutMonitoring,
            Suggestion::EnableComputeInstanceMonitoring,
            object_type,
            compartment,
            id,
            name,
        )
        .with_detail("Instance Name", name)
        .with_detail("Shape", shape)
        .with_detail("Cpu Core Count", format_ocpus(instance.ocpus()))
    }
}

pub(super) fn format_ocpus(ocpus: Option<f32>) -> String {
    ocpus.map(|c| format!("{c:.2}")).unwrap_or_else(|| "-".to_string())
}

fn is_exempt(shape: &str) -> bool {
    EXEMPT_SHAPES.contains(&shape)
}

#[async_trait]
impl Heuristic for ComputeRightsizing {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::ComputeRightsizing
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
                    count_signals(ctx, scope, compartment, &SIGNAL_QUERIES, EXEMPT_SHAPES, &mut out)
                        .await
                else {
                    continue;
                };

                for instance in counts.instances.iter().filter(|i| !i.is_stopped()) {
                    let (id, name, shape) = match instance
                        .id()
                        .and_then(|id| Ok((id, instance.name()?, instance.shape()?)))
                    {
                        Ok(v) => v,
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, instance.id.as_deref(), &e));
                            continue;
                        }
                    };
                    if is_exempt(shape) {
                        continue;
                    }

                    match counts.trackers.get(id) {
                        Some(tracker) if tracker.state == SignalState::Three => {
                            out.push(Self::rightsizing(instance, compartment, id, name, shape, tracker));
                        }
                        Some(_) => {}
                        // Absence is only meaningful when every query answered.
                        None if counts.all_queries_ok => {
                            out.push(Self::without_monitoring(instance, compartment, id, name, shape));
                        }
                        None => {}
                    }
                }
            }
        }
        out
    }
}
