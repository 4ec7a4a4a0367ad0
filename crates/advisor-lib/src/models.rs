//! Core data models for the recommendation engine
//!
//! Resource records mirror the provider's wire shape: every field is
//! optional and read through an accessor that reports a missing field as
//! a per-unit fault instead of aborting the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{required, Result};

/// Lifecycle state reported for a stopped instance or database node.
pub const STATE_STOPPED: &str = "STOPPED";
/// Attachment state that marks a volume as in use.
pub const STATE_ATTACHED: &str = "ATTACHED";

/// Instance metadata key set on Kubernetes worker nodes.
pub const OKE_POOL_ID_KEY: &str = "oke-pool-id";
/// Instance metadata key carrying the owning cluster's display name.
pub const OKE_CLUSTER_NAME_KEY: &str = "oke-cluster-display-name";

/// Credentials and location of one cloud tenancy.
#[derive(Clone, Serialize, Deserialize)]
pub struct CloudProfile {
    pub id: String,
    pub tenancy_id: String,
    pub user_id: String,
    pub key_fingerprint: String,
    pub region: String,
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

impl fmt::Debug for CloudProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudProfile")
            .field("id", &self.id)
            .field("tenancy_id", &self.tenancy_id)
            .field("user_id", &self.user_id)
            .field("key_fingerprint", &self.key_fingerprint)
            .field("region", &self.region)
            .field("private_key_path", &self.private_key_path)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Compartment as returned by the identity listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentSummary {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    pub lifecycle_state: Option<String>,
}

/// A compartment the engine scopes its queries to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<&CompartmentSummary> for Compartment {
    type Error = crate::error::AdvisorError;

    fn try_from(summary: &CompartmentSummary) -> Result<Self> {
        Ok(Self {
            id: required(&summary.id, "Compartment", "id")?.clone(),
            name: required(&summary.name, "Compartment", "name")?.clone(),
            description: summary.description.clone(),
            created_at: summary.time_created,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeConfig {
    pub ocpus: Option<f32>,
    #[serde(rename = "memoryInGBs")]
    pub memory_in_gbs: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstance {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub shape: Option<String>,
    pub lifecycle_state: Option<String>,
    pub availability_domain: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub shape_config: Option<ShapeConfig>,
}

impl ComputeInstance {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "Instance", "id").map(String::as_str)
    }

    pub fn name(&self) -> Result<&str> {
        required(&self.display_name, "Instance", "displayName").map(String::as_str)
    }

    pub fn shape(&self) -> Result<&str> {
        required(&self.shape, "Instance", "shape").map(String::as_str)
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle_state.as_deref() == Some(STATE_STOPPED)
    }

    /// Worker nodes of a managed Kubernetes cluster carry a pool id.
    pub fn is_kubernetes_node(&self) -> bool {
        self.metadata.contains_key(OKE_POOL_ID_KEY)
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.metadata.get(OKE_CLUSTER_NAME_KEY).map(String::as_str)
    }

    pub fn ocpus(&self) -> Option<f32> {
        self.shape_config.as_ref().and_then(|c| c.ocpus)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockVolume {
    pub id: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "sizeInGBs")]
    pub size_in_gbs: Option<i64>,
    #[serde(rename = "vpusPerGB")]
    pub vpus_per_gb: Option<i64>,
    pub availability_domain: Option<String>,
    pub lifecycle_state: Option<String>,
}

impl BlockVolume {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "Volume", "id").map(String::as_str)
    }

    pub fn name(&self) -> Result<&str> {
        required(&self.display_name, "Volume", "displayName").map(String::as_str)
    }

    pub fn size_in_gbs(&self) -> Result<i64> {
        required(&self.size_in_gbs, "Volume", "sizeInGBs").copied()
    }

    pub fn vpus_per_gb(&self) -> Result<i64> {
        required(&self.vpus_per_gb, "Volume", "vpusPerGB").copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachment {
    pub id: Option<String>,
    pub volume_id: Option<String>,
    pub instance_id: Option<String>,
    pub lifecycle_state: Option<String>,
}

impl VolumeAttachment {
    pub fn volume_id(&self) -> Result<&str> {
        required(&self.volume_id, "VolumeAttachment", "volumeId").map(String::as_str)
    }

    pub fn is_attached(&self) -> bool {
        self.lifecycle_state.as_deref() == Some(STATE_ATTACHED)
    }
}

/// Which kind of volume a backup was taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupKind {
    #[default]
    Volume,
    BootVolume,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Volume => write!(f, "Block Volume"),
            BackupKind::BootVolume => write!(f, "Boot Volume"),
        }
    }
}

/// Backup source type for backups taken by hand.
pub const BACKUP_SOURCE_MANUAL: &str = "MANUAL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeBackup {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub source_type: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    #[serde(rename = "sizeInGBs")]
    pub size_in_gbs: Option<i64>,
    #[serde(skip)]
    pub kind: BackupKind,
}

impl VolumeBackup {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "VolumeBackup", "id").map(String::as_str)
    }

    pub fn name(&self) -> Result<&str> {
        required(&self.display_name, "VolumeBackup", "displayName").map(String::as_str)
    }

    pub fn is_manual(&self) -> Result<bool> {
        required(&self.source_type, "VolumeBackup", "sourceType")
            .map(|s| s == BACKUP_SOURCE_MANUAL)
    }

    pub fn time_created(&self) -> Result<DateTime<Utc>> {
        required(&self.time_created, "VolumeBackup", "timeCreated").copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbHome {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub db_system_id: Option<String>,
    pub vm_cluster_id: Option<String>,
}

/// The parent a database node listing is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DbNodeParent {
    DbSystem(String),
    VmCluster(String),
}

impl DbNodeParent {
    pub fn id(&self) -> &str {
        match self {
            DbNodeParent::DbSystem(id) | DbNodeParent::VmCluster(id) => id,
        }
    }
}

impl DbHome {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "DbHome", "id").map(String::as_str)
    }

    /// A home runs either on a DB system or on a VM cluster.
    pub fn node_parent(&self) -> Result<DbNodeParent> {
        match (&self.db_system_id, &self.vm_cluster_id) {
            (Some(id), _) => Ok(DbNodeParent::DbSystem(id.clone())),
            (None, Some(id)) => Ok(DbNodeParent::VmCluster(id.clone())),
            (None, None) => Err(crate::error::AdvisorError::MissingField {
                kind: "DbHome",
                field: "dbSystemId",
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: Option<String>,
    pub db_home_id: Option<String>,
    pub db_system_id: Option<String>,
    pub vm_cluster_id: Option<String>,
    pub db_name: Option<String>,
    pub db_unique_name: Option<String>,
}

impl Database {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "Database", "id").map(String::as_str)
    }

    pub fn unique_name(&self) -> Result<&str> {
        required(&self.db_unique_name, "Database", "dbUniqueName").map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbNode {
    pub id: Option<String>,
    pub hostname: Option<String>,
    pub lifecycle_state: Option<String>,
    pub cpu_core_count: Option<i64>,
}

impl DbNode {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "DbNode", "id").map(String::as_str)
    }

    pub fn hostname(&self) -> Result<&str> {
        required(&self.hostname, "DbNode", "hostname").map(String::as_str)
    }

    pub fn state(&self) -> Result<&str> {
        required(&self.lifecycle_state, "DbNode", "lifecycleState").map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub shape_name: Option<String>,
}

impl LoadBalancer {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "LoadBalancer", "id").map(String::as_str)
    }

    pub fn name(&self) -> Result<&str> {
        required(&self.display_name, "LoadBalancer", "displayName").map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerHealth {
    pub load_balancer_id: Option<String>,
    pub status: Option<String>,
}

impl LoadBalancerHealth {
    pub fn load_balancer_id(&self) -> Result<&str> {
        required(&self.load_balancer_id, "LoadBalancerHealth", "loadBalancerId")
            .map(String::as_str)
    }

    pub fn status(&self) -> Result<&str> {
        required(&self.status, "LoadBalancerHealth", "status").map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub compartment_id: Option<String>,
}

impl BucketSummary {
    pub fn name(&self) -> Result<&str> {
        required(&self.name, "BucketSummary", "name").map(String::as_str)
    }
}

/// Auto-tiering value the object store reports for untiered buckets.
pub const AUTO_TIERING_DISABLED: &str = "Disabled";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: Option<String>,
    pub name: Option<String>,
    pub auto_tiering: Option<String>,
    pub approximate_size: Option<i64>,
    pub approximate_count: Option<i64>,
}

impl Bucket {
    pub fn id(&self) -> Result<&str> {
        required(&self.id, "Bucket", "id").map(String::as_str)
    }

    pub fn name(&self) -> Result<&str> {
        required(&self.name, "Bucket", "name").map(String::as_str)
    }

    pub fn auto_tiering_enabled(&self) -> Result<bool> {
        required(&self.auto_tiering, "Bucket", "autoTiering").map(|v| v != AUTO_TIERING_DISABLED)
    }
}

/// Recommendation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Block Storage Rightsizing")]
    BlockStorageRightsizing,
    #[serde(rename = "Compute Instance Decommissioning")]
    ComputeInstanceDecommissioning,
    #[serde(rename = "Compute Instance Idle")]
    ComputeInstanceIdle,
    #[serde(rename = "Compute Instance Rightsizing")]
    ComputeInstanceRightsizing,
    #[serde(rename = "Compute Instance Without Monitoring")]
    ComputeInstanceWithoutMonitoring,
    #[serde(rename = "Kubernetes Cluster Rightsizing")]
    KubernetesClusterRightsizing,
    #[serde(rename = "Old Snapshot")]
    OldSnapshot,
    #[serde(rename = "Unused Resource")]
    UnusedResource,
    #[serde(rename = "Unused Storage")]
    UnusedStorage,
    #[serde(rename = "Software Infrastructure Service Rightsizing")]
    SoftwareInfrastructureRightsizing,
    #[serde(rename = "Object Storage Optimization")]
    ObjectStorageOptimization,
    #[serde(rename = "Unused Service Decommissioning")]
    UnusedServiceDecommissioning,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BlockStorageRightsizing => "Block Storage Rightsizing",
            Category::ComputeInstanceDecommissioning => "Compute Instance Decommissioning",
            Category::ComputeInstanceIdle => "Compute Instance Idle",
            Category::ComputeInstanceRightsizing => "Compute Instance Rightsizing",
            Category::ComputeInstanceWithoutMonitoring => "Compute Instance Without Monitoring",
            Category::KubernetesClusterRightsizing => "Kubernetes Cluster Rightsizing",
            Category::OldSnapshot => "Old Snapshot",
            Category::UnusedResource => "Unused Resource",
            Category::UnusedStorage => "Unused Storage",
            Category::SoftwareInfrastructureRightsizing => {
                "Software Infrastructure Service Rightsizing"
            }
            Category::ObjectStorageOptimization => "Object Storage Optimization",
            Category::UnusedServiceDecommissioning => "Unused Service Decommissioning",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suggestion {
    #[serde(rename = "Resize oversized Block Storage")]
    ResizeOversizedBlockStorage,
    #[serde(rename = "Delete Compute Instance not active")]
    DeleteComputeInstanceNotActive,
    #[serde(rename = "Delete Compute Instance not used")]
    DeleteComputeInstanceNotUsed,
    #[serde(rename = "Resize oversized compute instance")]
    ResizeOversizedComputeInstance,
    #[serde(rename = "Enable Compute Instance monitoring")]
    EnableComputeInstanceMonitoring,
    #[serde(rename = "Enable bucket auto tiering")]
    EnableBucketAutoTiering,
    #[serde(rename = "Delete snapshot older than 30 days")]
    DeleteOldSnapshot,
    #[serde(rename = "Resize oversized Database instance")]
    ResizeOversizedDatabaseInstance,
    #[serde(rename = "Resize oversized Kubernetes Cluster")]
    ResizeOversizedKubernetesCluster,
    #[serde(rename = "Delete Load balancer not active")]
    DeleteLoadBalancerNotActive,
    #[serde(rename = "Delete kubernetes node not active")]
    DeleteKubernetesNodeNotActive,
    #[serde(rename = "Delete Kubernetes node not used")]
    DeleteKubernetesNodeNotUsed,
    #[serde(rename = "Delete Database instance not active")]
    DeleteDatabaseInstanceNotActive,
    #[serde(rename = "Delete Block Storage not used")]
    DeleteBlockStorageNotUsed,
}

impl Suggestion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suggestion::ResizeOversizedBlockStorage => "Resize oversized Block Storage",
            Suggestion::DeleteComputeInstanceNotActive => "Delete Compute Instance not active",
            Suggestion::DeleteComputeInstanceNotUsed => "Delete Compute Instance not used",
            Suggestion::ResizeOversizedComputeInstance => "Resize oversized compute instance",
            Suggestion::EnableComputeInstanceMonitoring => "Enable Compute Instance monitoring",
            Suggestion::EnableBucketAutoTiering => "Enable bucket auto tiering",
            Suggestion::DeleteOldSnapshot => "Delete snapshot older than 30 days",
            Suggestion::ResizeOversizedDatabaseInstance => "Resize oversized Database instance",
            Suggestion::ResizeOversizedKubernetesCluster => "Resize oversized Kubernetes Cluster",
            Suggestion::DeleteLoadBalancerNotActive => "Delete Load balancer not active",
            Suggestion::DeleteKubernetesNodeNotActive => "Delete kubernetes node not active",
            Suggestion::DeleteKubernetesNodeNotUsed => "Delete Kubernetes node not used",
            Suggestion::DeleteDatabaseInstanceNotActive => "Delete Database instance not active",
            Suggestion::DeleteBlockStorageNotUsed => "Delete Block Storage not used",
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of resource a recommendation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "Block Storage")]
    BlockStorage,
    #[serde(rename = "Compute Instance")]
    ComputeInstance,
    #[serde(rename = "Database")]
    Database,
    #[serde(rename = "Load Balancer")]
    LoadBalancer,
    #[serde(rename = "Snapshot")]
    Snapshot,
    #[serde(rename = "Cluster Kubernetes")]
    ClusterKubernetes,
    #[serde(rename = "Object Storage")]
    ObjectStorage,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::BlockStorage => "Block Storage",
            ObjectType::ComputeInstance => "Compute Instance",
            ObjectType::Database => "Database",
            ObjectType::LoadBalancer => "Load Balancer",
            ObjectType::Snapshot => "Snapshot",
            ObjectType::ClusterKubernetes => "Cluster Kubernetes",
            ObjectType::ObjectStorage => "Object Storage",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named piece of evidence attached to a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecDetail {
    pub name: String,
    pub value: String,
}

/// A single actionable recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub category: Category,
    pub suggestion: Suggestion,
    pub compartment_id: String,
    pub compartment_name: String,
    pub resource_id: String,
    pub name: String,
    pub object_type: ObjectType,
    pub details: Vec<RecDetail>,
}

impl Recommendation {
    pub fn new(
        category: Category,
        suggestion: Suggestion,
        object_type: ObjectType,
        compartment: &Compartment,
        resource_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            category,
            suggestion,
            compartment_id: compartment.id.clone(),
            compartment_name: compartment.name.clone(),
            resource_id: resource_id.into(),
            name: name.into(),
            object_type,
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(RecDetail {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Two recommendations with the same identity describe the same finding.
    ///
    /// The name is part of the identity: several findings can share one
    /// resource id, such as every Ercole-only database on a host.
    pub fn identity(&self) -> (Category, &str, &str) {
        (self.category, self.resource_id.as_str(), self.name.as_str())
    }

    pub fn detail(&self, name: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

/// Per-database workload samples collected by Ercole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErcoleDatabase {
    pub unique_name: String,
    #[serde(default)]
    pub work_samples: Vec<i64>,
}

/// One host as reported by the Ercole inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErcoleDatabaseRecord {
    pub hostname: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub cpu_threads: i64,
    #[serde(default)]
    pub databases: Vec<ErcoleDatabase>,
}

/// Count of resources of one kind inside a compartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCount {
    pub profile_id: String,
    pub compartment_id: String,
    pub compartment_name: String,
    pub object_type: ObjectType,
    pub count: usize,
}
