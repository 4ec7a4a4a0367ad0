//! Object storage buckets without auto-tiering.

use async_trait::async_trait;

use super::{Heuristic, HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::models::{Category, ObjectType, Recommendation, Suggestion};
use crate::partial::PartialResult;

const SIZE_UNITS: [&str; 6] = ["bytes", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Formats a byte count with binary units and two decimals.
pub fn human_size(bytes: i64) -> String {
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", SIZE_UNITS[unit])
}

pub struct BucketAutoTiering;

#[async_trait]
impl Heuristic for BucketAutoTiering {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::BucketAutoTiering
    }

    async fn evaluate(
        &self,
        _ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            for compartment in &scope.compartments {
                let buckets = scope.buckets(compartment).await;
                for bucket in out.absorb(buckets) {
                    let parsed = bucket
                        .id()
                        .and_then(|id| Ok((id, bucket.name()?, bucket.auto_tiering_enabled()?)));
                    let (id, name) = match parsed {
                        Ok((_, _, true)) => continue,
                        Ok((id, name, false)) => (id, name),
                        Err(e) => {
                            out.fail(scope.resource_failure(
                                compartment,
                                bucket.name.as_deref(),
                                &e,
                            ));
                            continue;
                        }
                    };

                    let size = bucket
                        .approximate_size
                        .map(human_size)
                        .unwrap_or_else(|| "-".to_string());
                    out.push(
                        Recommendation::new(
                            Category::ObjectStorageOptimization,
                            Suggestion::EnableBucketAutoTiering,
                            ObjectType::ObjectStorage,
                            compartment,
                            id,
                            name,
                        )
                        .with_detail("Bucket Name", name)
                        .with_detail("Size", size)
                        .with_detail(
                            "Objects",
                            bucket
                                .approximate_count
                                .map(|c| c.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        )
                        .with_detail("Optimization", "Enable auto-tiering"),
                    );
                }
            }
        }
        out
    }
}
