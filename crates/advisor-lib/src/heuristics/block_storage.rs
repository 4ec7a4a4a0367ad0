//! Volumes whose measured throughput and IOPS stay under half of what
//! their performance tier provides.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{Heuristic, HeuristicKind, RunContext};
use crate::error::AdvisorError;
use crate::inventory::ProfileScope;
use crate::metrics::{MetricQuery, BLOCK_STORE_NAMESPACE};
use crate::models::{Category, ObjectType, Recommendation, Suggestion};
use crate::partial::PartialResult;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Which usage figure a query contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Throughput,
    Iops,
}

/// Read and write maxima over five days, summed per measure.
pub const BLOCK_STORAGE_QUERIES: [(MetricQuery, Measure); 4] = [
    (
        MetricQuery::new(BLOCK_STORE_NAMESPACE, "VolumeReadThroughput[5d].max()", 5),
        Measure::Throughput,
    ),
    (
        MetricQuery::new(BLOCK_STORE_NAMESPACE, "VolumeWriteThroughput[5d].max()", 5),
        Measure::Throughput,
    ),
    (
        MetricQuery::new(BLOCK_STORE_NAMESPACE, "VolumeReadOps[5d].max()", 5),
        Measure::Iops,
    ),
    (
        MetricQuery::new(BLOCK_STORE_NAMESPACE, "VolumeWriteOps[5d].max()", 5),
        Measure::Iops,
    ),
];

/// Capacity a volume gets from its size and performance units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBaseline {
    pub max_throughput_mibps: f64,
    pub max_iops: i64,
}

pub fn volume_baseline(vpus_per_gb: i64, size_in_gbs: i64) -> VolumeBaseline {
    let vpu = vpus_per_gb as f64;
    let (base_iops_per_gb, max_iops, base_throughput, max_throughput) = if vpus_per_gb > 0 {
        (
            1.5 * vpu + 45.0,
            2500 * vpus_per_gb,
            (12.0 * vpu + 360.0) / 1000.0,
            20.0 * vpu + 280.0,
        )
    } else {
        (2.0, 3000, 240.0 / 15.0 / 1000.0, 480.0 / 15.0)
    };

    VolumeBaseline {
        max_throughput_mibps: (base_throughput * size_in_gbs as f64).min(max_throughput),
        max_iops: (base_iops_per_gb as i64 * size_in_gbs).min(max_iops),
    }
}

/// What a volume is provisioned for and what it actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeUsage {
    pub vpus_per_gb: i64,
    pub size_in_gbs: i64,
    pub throughput_mibps: f64,
    pub iops: f64,
}

/// Volumes without performance units never qualify.
pub fn is_optimizable(usage: &VolumeUsage) -> bool {
    if usage.vpus_per_gb == 0 {
        return false;
    }
    let baseline = volume_baseline(usage.vpus_per_gb, usage.size_in_gbs);
    usage.throughput_mibps < baseline.max_throughput_mibps / 2.0
        && usage.iops < baseline.max_iops as f64 / 2.0
}

struct Candidate<'a> {
    name: &'a str,
    usage: VolumeUsage,
    faulted: bool,
}

pub struct BlockStorageRightsizing;

#[async_trait]
impl Heuristic for BlockStorageRightsizing {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::BlockStorageRightsizing
    }

    async fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            'compartments: for compartment in &scope.compartments {
                let volumes = match scope.volumes(compartment).await {
                    Ok(volumes) => volumes,
                    Err(e) => {
                        out.fail(scope.compartment_failure(compartment, &e));
                        continue;
                    }
                };
                if volumes.is_empty() {
                    continue;
                }

                let mut candidates: Vec<(&str, Candidate)> = Vec::with_capacity(volumes.len());
                for volume in &volumes {
                    let parsed = volume.id().and_then(|id| {
                        Ok((id, volume.name()?, volume.vpus_per_gb()?, volume.size_in_gbs()?))
                    });
                    match parsed {
                        Ok((id, name, vpus_per_gb, size_in_gbs)) => candidates.push((
                            id,
                            Candidate {
                                name,
                                usage: VolumeUsage {
                                    vpus_per_gb,
                                    size_in_gbs,
                                    throughput_mibps: 0.0,
                                    iops: 0.0,
                                },
                                faulted: false,
                            },
                        )),
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, volume.id.as_deref(), &e))
                        }
                    }
                }
                let index: HashMap<&str, usize> = candidates
                    .iter()
                    .enumerate()
                    .map(|(i, (id, _))| (*id, i))
                    .collect();

                for (query, measure) in &BLOCK_STORAGE_QUERIES {
                    // Partial measurements would understate usage.
                    let series = match scope.summarize(ctx.now, compartment, query).await {
                        Ok(series) => series,
                        Err(e) => {
                            out.fail(scope.compartment_failure(compartment, &e));
                            continue 'compartments;
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
                        let Some(&slot) = index.get(resource_id) else {
                            continue;
                        };
                        let candidate = &mut candidates[slot].1;
                        let measured = stream.max_value().and_then(|value| match (measure, stream.unit()) {
                            (Measure::Throughput, None | Some("bytes")) => Ok(value / BYTES_PER_MIB),
                            (Measure::Throughput, Some(other)) => Err(AdvisorError::UnexpectedValue {
                                kind: "MetricStream",
                                field: "unit",
                                value: other.to_string(),
                            }),
                            (Measure::Iops, _) => Ok(value),
                        });
                        match (measured, measure) {
                            (Ok(v), Measure::Throughput) => candidate.usage.throughput_mibps += v,
                            (Ok(v), Measure::Iops) => candidate.usage.iops += v,
                            (Err(e), _) => {
                                candidate.faulted = true;
                                out.fail(scope.resource_failure(compartment, Some(resource_id), &e));
                            }
                        }
                    }
                }

                for (id, candidate) in &candidates {
                    if candidate.faulted || !is_optimizable(&candidate.usage) {
                        continue;
                    }
                    let usage = candidate.usage;
                    let baseline = volume_baseline(usage.vpus_per_gb, usage.size_in_gbs);
                    out.push(
                        Recommendation::new(
                            Category::BlockStorageRightsizing,
                            Suggestion::ResizeOversizedBlockStorage,
                            ObjectType::BlockStorage,
                            compartment,
                            *id,
                            candidate.name,
                        )
                        .with_detail("Block Storage Name", candidate.name)
                        .with_detail("VPU", usage.vpus_per_gb.to_string())
                        .with_detail("Size", format!("{} GB", usage.size_in_gbs))
                        .with_detail(
                            "VPU Target",
                            format!(
                                "{:.0} MB/s - {} iops",
                                baseline.max_throughput_mibps, baseline.max_iops
                            ),
                        )
                        .with_detail(
                            "Throughput R/W Max 5dd",
                            format!(
                                "{:.0} MB/s - {:.0} MB/s",
                                usage.throughput_mibps, baseline.max_throughput_mibps
                            ),
                        )
                        .with_detail(
                            "Iops Max 5dd",
                            format!("{:.0} - {}", usage.iops, baseline.max_iops),
                        ),
                    );
                }
            }
        }
        out
    }
}
