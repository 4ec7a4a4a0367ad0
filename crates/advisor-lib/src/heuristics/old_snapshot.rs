//! Manual backups kept past the retention threshold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Heuristic, HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::models::{Category, Compartment, ObjectType, Recommendation, Suggestion, VolumeBackup};
use crate::partial::PartialResult;

/// Backups older than this many calendar days are flagged.
pub const SNAPSHOT_MAX_AGE_DAYS: i64 = 30;

/// Calendar days between two instants, counted on UTC dates.
pub fn elapsed_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - created.date_naive()).num_days()
}

/// Size is unset while a backup is still being created.
fn format_size(size_in_gbs: Option<i64>) -> String {
    size_in_gbs
        .map(|gb| format!("{gb} GB"))
        .unwrap_or_else(|| "-".to_string())
}

pub struct OldSnapshot;

impl OldSnapshot {
    fn check(
        backups: Vec<VolumeBackup>,
        now: DateTime<Utc>,
        scope: &ProfileScope,
        compartment: &Compartment,
        out: &mut PartialResult<Recommendation>,
    ) {
        for backup in &backups {
            let parsed = backup.is_manual().and_then(|manual| {
                if !manual {
                    return Ok(None);
                }
                Ok(Some((backup.id()?, backup.name()?, backup.time_created()?)))
            });
            let (id, name, created) = match parsed {
                Ok(Some(v)) => v,
                Ok(None) => continue,
                Err(e) => {
                    out.fail(scope.resource_failure(compartment, backup.id.as_deref(), &e));
                    continue;
                }
            };

            let age = elapsed_days(created, now);
            if age <= SNAPSHOT_MAX_AGE_DAYS {
                continue;
            }
            out.push(
                Recommendation::new(
                    Category::OldSnapshot,
                    Suggestion::DeleteOldSnapshot,
                    ObjectType::Snapshot,
                    compartment,
                    id,
                    name,
                )
                .with_detail("Snapshot Name", name)
                .with_detail("Backup Type", backup.kind.to_string())
                .with_detail("Size", format_size(backup.size_in_gbs))
                .with_detail("Created", created.format("%Y-%m-%d").to_string())
                .with_detail("Age (days)", age.to_string()),
            );
        }
    }
}

#[async_trait]
impl Heuristic for OldSnapshot {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::OldSnapshot
    }

    async fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            for compartment in &scope.compartments {
                match scope.volume_backups(compartment).await {
                    Ok(backups) => Self::check(backups, ctx.now, scope, compartment, &mut out),
                    Err(e) => out.fail(scope.compartment_failure(compartment, &e)),
                }
                match scope.boot_volume_backups(compartment).await {
                    Ok(backups) => Self::check(backups, ctx.now, scope, compartment, &mut out),
                    Err(e) => out.fail(scope.compartment_failure(compartment, &e)),
                }
            }
        }
        out
    }
}
