//! In-memory provider backed by a serialized tenancy snapshot
//!
//! Used for offline runs against captured inventories and throughout the
//! test suite. Individual operations can be made to fail for a given
//! compartment to exercise partial-success paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use super::{
    BackupLister, CloudProvider, CompartmentLister, DatabaseLister, InstanceLister,
    LoadBalancerLister, MetricsQuerier, ObjectStorage, Operation, ProviderFactory, VolumeLister,
};
use crate::error::{AdvisorError, Result};
use crate::metrics::{MetricStream, SummarizeRequest};
use crate::models::{
    BackupKind, Bucket, BucketSummary, BlockVolume, CloudProfile, CompartmentSummary,
    ComputeInstance, Database, DbHome, DbNode, DbNodeParent, LoadBalancer, LoadBalancerHealth,
    VolumeAttachment, VolumeBackup,
};

/// Matches every scope key when used in an injected failure.
const ANY_SCOPE: &str = "*";

/// Streams returned for one query in one compartment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFixture {
    pub compartment_id: String,
    pub namespace: String,
    pub query: String,
    #[serde(default)]
    pub streams: Vec<MetricStream>,
}

/// Captured inventory of one tenancy. Per-compartment collections are
/// keyed by compartment id; databases by home id; database nodes by the
/// owning DB system or VM cluster id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenancySnapshot {
    pub compartments: Vec<CompartmentSummary>,
    pub instances: HashMap<String, Vec<ComputeInstance>>,
    pub volumes: HashMap<String, Vec<BlockVolume>>,
    pub volume_attachments: HashMap<String, Vec<VolumeAttachment>>,
    pub volume_backups: HashMap<String, Vec<VolumeBackup>>,
    pub boot_volume_backups: HashMap<String, Vec<VolumeBackup>>,
    pub db_homes: HashMap<String, Vec<DbHome>>,
    pub databases: HashMap<String, Vec<Database>>,
    pub db_nodes: HashMap<String, Vec<DbNode>>,
    pub load_balancer_healths: HashMap<String, Vec<LoadBalancerHealth>>,
    pub load_balancers: HashMap<String, Vec<LoadBalancer>>,
    pub namespace: Option<String>,
    pub buckets: HashMap<String, Vec<Bucket>>,
    pub metrics: Vec<MetricFixture>,
}

impl TenancySnapshot {
    pub fn with_compartment(mut self, id: &str, name: &str) -> Self {
        self.compartments.push(CompartmentSummary {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            lifecycle_state: Some("ACTIVE".to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_metric(
        mut self,
        compartment_id: &str,
        namespace: &str,
        query: &str,
        streams: Vec<MetricStream>,
    ) -> Self {
        self.metrics.push(MetricFixture {
            compartment_id: compartment_id.to_string(),
            namespace: namespace.to_string(),
            query: query.to_string(),
            streams,
        });
        self
    }
}

fn scoped<T: Clone>(map: &HashMap<String, Vec<T>>, key: &str) -> Vec<T> {
    map.get(key).cloned().unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    snapshot: TenancySnapshot,
    failures: HashSet<(Operation, String)>,
}

impl InMemoryProvider {
    pub fn new(snapshot: TenancySnapshot) -> Self {
        Self {
            snapshot,
            failures: HashSet::new(),
        }
    }

    /// Makes `operation` fail when called for `scope`: a compartment id, a
    /// bucket name for [`Operation::GetBucket`], or `*` for every call.
    pub fn with_failure(mut self, operation: Operation, scope: &str) -> Self {
        self.failures.insert((operation, scope.to_string()));
        self
    }

    pub fn snapshot(&self) -> &TenancySnapshot {
        &self.snapshot
    }

    fn check(&self, operation: Operation, scope: &str) -> Result<()> {
        if self.failures.contains(&(operation, scope.to_string()))
            || self.failures.contains(&(operation, ANY_SCOPE.to_string()))
        {
            return Err(AdvisorError::Provider {
                operation,
                message: format!("injected failure for {scope}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CompartmentLister for InMemoryProvider {
    async fn list_compartments(&self, tenancy_id: &str) -> Result<Vec<CompartmentSummary>> {
        self.check(Operation::ListCompartments, tenancy_id)?;
        Ok(self.snapshot.compartments.clone())
    }
}

#[async_trait]
impl InstanceLister for InMemoryProvider {
    async fn list_instances(&self, compartment_id: &str) -> Result<Vec<ComputeInstance>> {
        self.check(Operation::ListInstances, compartment_id)?;
        Ok(scoped(&self.snapshot.instances, compartment_id))
    }
}

#[async_trait]
impl VolumeLister for InMemoryProvider {
    async fn list_volumes(&self, compartment_id: &str) -> Result<Vec<BlockVolume>> {
        self.check(Operation::ListVolumes, compartment_id)?;
        Ok(scoped(&self.snapshot.volumes, compartment_id))
    }

    async fn list_volume_attachments(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<VolumeAttachment>> {
        self.check(Operation::ListVolumeAttachments, compartment_id)?;
        Ok(scoped(&self.snapshot.volume_attachments, compartment_id))
    }
}

#[async_trait]
impl BackupLister for InMemoryProvider {
    async fn list_volume_backups(&self, compartment_id: &str) -> Result<Vec<VolumeBackup>> {
        self.check(Operation::ListVolumeBackups, compartment_id)?;
        let mut backups = scoped(&self.snapshot.volume_backups, compartment_id);
        backups.iter_mut().for_each(|b| b.kind = BackupKind::Volume);
        Ok(backups)
    }

    async fn list_boot_volume_backups(&self, compartment_id: &str) -> Result<Vec<VolumeBackup>> {
        self.check(Operation::ListBootVolumeBackups, compartment_id)?;
        let mut backups = scoped(&self.snapshot.boot_volume_backups, compartment_id);
        backups.iter_mut().for_each(|b| b.kind = BackupKind::BootVolume);
        Ok(backups)
    }
}

#[async_trait]
impl DatabaseLister for InMemoryProvider {
    async fn list_db_homes(&self, compartment_id: &str) -> Result<Vec<DbHome>> {
        self.check(Operation::ListDbHomes, compartment_id)?;
        Ok(scoped(&self.snapshot.db_homes, compartment_id))
    }

    async fn list_databases(&self, compartment_id: &str, db_home_id: &str) -> Result<Vec<Database>> {
        self.check(Operation::ListDatabases, compartment_id)?;
        Ok(scoped(&self.snapshot.databases, db_home_id))
    }

    async fn list_db_nodes(
        &self,
        compartment_id: &str,
        parent: &DbNodeParent,
    ) -> Result<Vec<DbNode>> {
        self.check(Operation::ListDbNodes, compartment_id)?;
        Ok(scoped(&self.snapshot.db_nodes, parent.id()))
    }
}

#[async_trait]
impl LoadBalancerLister for InMemoryProvider {
    async fn list_load_balancer_healths(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<LoadBalancerHealth>> {
        self.check(Operation::ListLoadBalancerHealths, compartment_id)?;
        Ok(scoped(&self.snapshot.load_balancer_healths, compartment_id))
    }

    async fn list_load_balancers(&self, compartment_id: &str) -> Result<Vec<LoadBalancer>> {
        self.check(Operation::ListLoadBalancers, compartment_id)?;
        Ok(scoped(&self.snapshot.load_balancers, compartment_id))
    }
}

#[async_trait]
impl ObjectStorage for InMemoryProvider {
    async fn get_namespace(&self, compartment_id: &str) -> Result<String> {
        self.check(Operation::GetNamespace, compartment_id)?;
        self.snapshot
            .namespace
            .clone()
            .ok_or_else(|| AdvisorError::Provider {
                operation: Operation::GetNamespace,
                message: "snapshot has no object storage namespace".to_string(),
            })
    }

    async fn list_buckets(&self, compartment_id: &str, namespace: &str) -> Result<Vec<BucketSummary>> {
        self.check(Operation::ListBuckets, compartment_id)?;
        Ok(scoped(&self.snapshot.buckets, compartment_id)
            .into_iter()
            .map(|b| BucketSummary {
                name: b.name,
                namespace: Some(namespace.to_string()),
                compartment_id: Some(compartment_id.to_string()),
            })
            .collect())
    }

    async fn get_bucket(&self, _namespace: &str, bucket_name: &str) -> Result<Bucket> {
        self.check(Operation::GetBucket, bucket_name)?;
        self.snapshot
            .buckets
            .values()
            .flatten()
            .find(|b| b.name.as_deref() == Some(bucket_name))
            .cloned()
            .ok_or_else(|| AdvisorError::HttpStatus {
                operation: Operation::GetBucket,
                status: 404,
                body: format!("bucket {bucket_name} not found"),
            })
    }
}

#[async_trait]
impl MetricsQuerier for InMemoryProvider {
    async fn summarize_metrics(&self, request: &SummarizeRequest) -> Result<Vec<MetricStream>> {
        self.check(Operation::SummarizeMetricsData, &request.compartment_id)?;
        Ok(self
            .snapshot
            .metrics
            .iter()
            .filter(|m| {
                m.compartment_id == request.compartment_id
                    && m.namespace == request.namespace
                    && m.query == request.query
            })
            .flat_map(|m| m.streams.iter().cloned())
            .collect())
    }
}

/// Snapshot file layout: one [`TenancySnapshot`] per tenancy id.
#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    tenancies: HashMap<String, TenancySnapshot>,
}

/// Hands out in-memory providers keyed by the profile's tenancy.
#[derive(Default)]
pub struct SnapshotProviderFactory {
    providers: HashMap<String, Arc<InMemoryProvider>>,
}

impl SnapshotProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenancy(mut self, tenancy_id: &str, provider: InMemoryProvider) -> Self {
        self.providers.insert(tenancy_id.to_string(), Arc::new(provider));
        self
    }

    /// Reads a JSON snapshot file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let file: SnapshotFile = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            tenancies = file.tenancies.len(),
            "Loaded tenancy snapshot"
        );
        Ok(Self {
            providers: file
                .tenancies
                .into_iter()
                .map(|(id, snapshot)| (id, Arc::new(InMemoryProvider::new(snapshot))))
                .collect(),
        })
    }
}

#[async_trait]
impl ProviderFactory for SnapshotProviderFactory {
    async fn connect(&self, profile: &CloudProfile) -> Result<Arc<dyn CloudProvider>> {
        match self.providers.get(&profile.tenancy_id) {
            Some(provider) => Ok(provider.clone() as Arc<dyn CloudProvider>),
            None => Err(AdvisorError::Connect {
                profile_id: profile.id.clone(),
                message: format!("no snapshot for tenancy {}", profile.tenancy_id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn provider() -> InMemoryProvider {
        let mut snapshot = TenancySnapshot::default().with_compartment("c1", "prod");
        snapshot.volumes.insert(
            "c1".into(),
            vec![BlockVolume {
                id: Some("v1".into()),
                ..Default::default()
            }],
        );
        snapshot.boot_volume_backups.insert(
            "c1".into(),
            vec![VolumeBackup {
                id: Some("b1".into()),
                ..Default::default()
            }],
        );
        InMemoryProvider::new(snapshot)
    }

    #[tokio::test]
    async fn test_lists_are_scoped_by_compartment() {
        let p = provider();
        assert_eq!(p.list_volumes("c1").await.unwrap().len(), 1);
        assert!(p.list_volumes("c2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_boot_backups_are_tagged() {
        let p = provider();
        let backups = p.list_boot_volume_backups("c1").await.unwrap();
        assert_eq!(backups[0].kind, BackupKind::BootVolume);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let p = provider()
            .with_failure(Operation::ListVolumes, "c1")
            .with_failure(Operation::ListInstances, "*");
        let err = p.list_volumes("c1").await.unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::Provider {
                operation: Operation::ListVolumes,
                ..
            }
        ));
        assert!(p.list_instances("anything").await.is_err());
        assert!(p.list_volume_attachments("c1").await.is_ok());
    }

    #[tokio::test]
    async fn test_factory_loads_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tenancies": {{"ocid1.tenancy.a": {{"compartments": [{{"id": "c1", "name": "prod"}}]}}}}}}"#
        )
        .unwrap();

        let factory = SnapshotProviderFactory::load(file.path()).await.unwrap();
        let profile = CloudProfile {
            id: "p1".into(),
            tenancy_id: "ocid1.tenancy.a".into(),
            user_id: "u".into(),
            key_fingerprint: "f".into(),
            region: "eu-milan-1".into(),
            private_key_path: None,
            private_key: None,
        };
        let provider = factory.connect(&profile).await.unwrap();
        let compartments = provider.list_compartments("ocid1.tenancy.a").await.unwrap();
        assert_eq!(compartments.len(), 1);

        let other = CloudProfile {
            tenancy_id: "ocid1.tenancy.b".into(),
            ..profile
        };
        assert!(factory.connect(&other).await.is_err());
    }
}
