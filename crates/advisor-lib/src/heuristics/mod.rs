//! Waste-detection heuristics
//!
//! Each heuristic walks the compartments of every requested profile and
//! emits [`Recommendation`]s. Failures are recorded per unit of work and
//! never abort the remaining units.

mod block_storage;
mod bucket_tiering;
mod compute_decommissioning;
mod compute_rightsizing;
mod database;
mod idle_compute;
mod old_snapshot;
mod unused_load_balancer;
mod unused_volume;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdvisorError;
use crate::ercole::ErcoleInventory;
use crate::inventory::ProfileScope;
use crate::models::Recommendation;
use crate::partial::PartialResult;

pub use block_storage::{
    is_optimizable, volume_baseline, BlockStorageRightsizing, VolumeBaseline, VolumeUsage,
    BLOCK_STORAGE_QUERIES,
};
pub use bucket_tiering::{human_size, BucketAutoTiering};
pub use compute_decommissioning::{ComputeDecommissioning, DECOMMISSION_QUERIES};
pub use compute_rightsizing::{
    ComputeRightsizing, SignalQuery, SignalState, EXEMPT_SHAPES, SIGNAL_QUERIES,
};
pub use database::{DatabaseRightsizing, EXCESSIVE_ZERO_SAMPLES};
pub use idle_compute::{IdleCompute, IDLE_QUERY};
pub use old_snapshot::{elapsed_days, OldSnapshot, SNAPSHOT_MAX_AGE_DAYS};
pub use unused_load_balancer::{UnusedLoadBalancer, UNHEALTHY_STATUSES};
pub use unused_volume::UnusedVolume;

/// Names of the available heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicKind {
    IdleCompute,
    ComputeRightsizing,
    ComputeDecommissioning,
    BlockStorageRightsizing,
    UnusedVolume,
    OldSnapshot,
    UnusedLoadBalancer,
    BucketAutoTiering,
    DatabaseRightsizing,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 9] = [
        HeuristicKind::IdleCompute,
        HeuristicKind::ComputeRightsizing,
        HeuristicKind::ComputeDecommissioning,
        HeuristicKind::BlockStorageRightsizing,
        HeuristicKind::UnusedVolume,
        HeuristicKind::OldSnapshot,
        HeuristicKind::UnusedLoadBalancer,
        HeuristicKind::BucketAutoTiering,
        HeuristicKind::DatabaseRightsizing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeuristicKind::IdleCompute => "idle-compute",
            HeuristicKind::ComputeRightsizing => "compute-rightsizing",
            HeuristicKind::ComputeDecommissioning => "compute-decommissioning",
            HeuristicKind::BlockStorageRightsizing => "block-storage-rightsizing",
            HeuristicKind::UnusedVolume => "unused-volume",
            HeuristicKind::OldSnapshot => "old-snapshot",
            HeuristicKind::UnusedLoadBalancer => "unused-load-balancer",
            HeuristicKind::BucketAutoTiering => "bucket-auto-tiering",
            HeuristicKind::DatabaseRightsizing => "database-rightsizing",
        }
    }

    pub fn heuristic(&self) -> Box<dyn Heuristic> {
        match self {
            HeuristicKind::IdleCompute => Box::new(IdleCompute),
            HeuristicKind::ComputeRightsizing => Box::new(ComputeRightsizing),
            HeuristicKind::ComputeDecommissioning => Box::new(ComputeDecommissioning),
            HeuristicKind::BlockStorageRightsizing => Box::new(BlockStorageRightsizing),
            HeuristicKind::UnusedVolume => Box::new(UnusedVolume),
            HeuristicKind::OldSnapshot => Box::new(OldSnapshot),
            HeuristicKind::UnusedLoadBalancer => Box::new(UnusedLoadBalancer),
            HeuristicKind::BucketAutoTiering => Box::new(BucketAutoTiering),
            HeuristicKind::DatabaseRightsizing => Box::new(DatabaseRightsizing),
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeuristicKind {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HeuristicKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AdvisorError::UnknownHeuristic(s.to_string()))
    }
}

/// Values fixed for the duration of one run.
pub struct RunContext<'a> {
    pub now: DateTime<Utc>,
    pub ercole: &'a dyn ErcoleInventory,
}

#[async_trait]
pub trait Heuristic: Send + Sync {
    fn kind(&self) -> HeuristicKind;

    async fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation>;
}
