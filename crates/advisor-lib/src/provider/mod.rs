//! Cloud provider capabilities
//!
//! Each inventory concern is a separate capability trait so heuristics and
//! tests only depend on what they call. [`CloudProvider`] is the union a
//! [`ProviderFactory`] hands out for a resolved profile.

mod memory;
pub mod oci;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::metrics::{MetricStream, SummarizeRequest};
use crate::models::{
    Bucket, BucketSummary, BlockVolume, CloudProfile, CompartmentSummary, ComputeInstance,
    Database, DbHome, DbNode, DbNodeParent, LoadBalancer, LoadBalancerHealth, VolumeAttachment,
    VolumeBackup,
};

pub use memory::{InMemoryProvider, MetricFixture, SnapshotProviderFactory, TenancySnapshot};
pub use oci::OciProviderFactory;

/// Provider call identifiers, used in errors, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    ListCompartments,
    ListInstances,
    ListVolumes,
    ListVolumeAttachments,
    ListVolumeBackups,
    ListBootVolumeBackups,
    ListDbHomes,
    ListDatabases,
    ListDbNodes,
    ListLoadBalancers,
    ListLoadBalancerHealths,
    GetNamespace,
    ListBuckets,
    GetBucket,
    SummarizeMetricsData,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListCompartments => "ListCompartments",
            Operation::ListInstances => "ListInstances",
            Operation::ListVolumes => "ListVolumes",
            Operation::ListVolumeAttachments => "ListVolumeAttachments",
            Operation::ListVolumeBackups => "ListVolumeBackups",
            Operation::ListBootVolumeBackups => "ListBootVolumeBackups",
            Operation::ListDbHomes => "ListDbHomes",
            Operation::ListDatabases => "ListDatabases",
            Operation::ListDbNodes => "ListDbNodes",
            Operation::ListLoadBalancers => "ListLoadBalancers",
            Operation::ListLoadBalancerHealths => "ListLoadBalancerHealths",
            Operation::GetNamespace => "GetNamespace",
            Operation::ListBuckets => "ListBuckets",
            Operation::GetBucket => "GetBucket",
            Operation::SummarizeMetricsData => "SummarizeMetricsData",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait CompartmentLister: Send + Sync {
    /// Lists every compartment below the tenancy root, recursively.
    async fn list_compartments(&self, tenancy_id: &str) -> Result<Vec<CompartmentSummary>>;
}

#[async_trait]
pub trait InstanceLister: Send + Sync {
    async fn list_instances(&self, compartment_id: &str) -> Result<Vec<ComputeInstance>>;
}

#[async_trait]
pub trait VolumeLister: Send + Sync {
    async fn list_volumes(&self, compartment_id: &str) -> Result<Vec<BlockVolume>>;

    async fn list_volume_attachments(&self, compartment_id: &str)
        -> Result<Vec<VolumeAttachment>>;
}

#[async_trait]
pub trait BackupLister: Send + Sync {
    async fn list_volume_backups(&self, compartment_id: &str) -> Result<Vec<VolumeBackup>>;

    async fn list_boot_volume_backups(&self, compartment_id: &str) -> Result<Vec<VolumeBackup>>;
}

#[async_trait]
pub trait DatabaseLister: Send + Sync {
    async fn list_db_homes(&self, compartment_id: &str) -> Result<Vec<DbHome>>;

    async fn list_databases(&self, compartment_id: &str, db_home_id: &str)
        -> Result<Vec<Database>>;

    async fn list_db_nodes(&self, compartment_id: &str, parent: &DbNodeParent)
        -> Result<Vec<DbNode>>;
}

#[async_trait]
pub trait LoadBalancerLister: Send + Sync {
    async fn list_load_balancer_healths(&self, compartment_id: &str)
        -> Result<Vec<LoadBalancerHealth>>;

    async fn list_load_balancers(&self, compartment_id: &str) -> Result<Vec<LoadBalancer>>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn get_namespace(&self, compartment_id: &str) -> Result<String>;

    async fn list_buckets(&self, compartment_id: &str, namespace: &str)
        -> Result<Vec<BucketSummary>>;

    /// Fetches one bucket including its tiering mode and approximate size.
    async fn get_bucket(&self, namespace: &str, bucket_name: &str) -> Result<Bucket>;
}

#[async_trait]
pub trait MetricsQuerier: Send + Sync {
    async fn summarize_metrics(&self, request: &SummarizeRequest) -> Result<Vec<MetricStream>>;
}

/// Everything the engine needs from one tenancy.
pub trait CloudProvider:
    CompartmentLister
    + InstanceLister
    + VolumeLister
    + BackupLister
    + DatabaseLister
    + LoadBalancerLister
    + ObjectStorage
    + MetricsQuerier
{
}

impl<T> CloudProvider for T where
    T: CompartmentLister
        + InstanceLister
        + VolumeLister
        + BackupLister
        + DatabaseLister
        + LoadBalancerLister
        + ObjectStorage
        + MetricsQuerier
{
}

/// Builds a connected provider from a profile's credentials.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn connect(&self, profile: &CloudProfile) -> Result<Arc<dyn CloudProvider>>;
}
