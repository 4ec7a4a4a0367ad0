//! Inventory gathering for one resolved profile
//!
//! [`ProfileScope`] wraps a provider together with the compartments it
//! covers. Every provider call goes through it so calls are counted and
//! logged the same way, and multi-step lookups (bucket details, database
//! topology) live in one place.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AdvisorError, Result};
use crate::metrics::{MetricQuery, MetricSeries, MetricsClient};
use crate::models::{
    Bucket, BlockVolume, Compartment, ComputeInstance, Database, DbNode, LoadBalancer,
    LoadBalancerHealth, ObjectCount, ObjectType, VolumeAttachment, VolumeBackup,
};
use crate::observability::AdvisorMetrics;
use crate::partial::{PartialResult, UnitFailure};
use crate::profiles::ResolvedProfile;
use crate::provider::{CloudProvider, Operation};

async fn observe<T>(operation: Operation, call: impl Future<Output = Result<T>>) -> Result<T> {
    let result = call.await;
    AdvisorMetrics::new().inc_provider_call(operation, result.is_ok());
    if let Err(e) = &result {
        debug!(operation = %operation, error = %e, "Provider call failed");
    }
    result
}

/// Databases and nodes found under one database home.
#[derive(Debug, Clone)]
pub struct DbHomeTopology {
    pub compartment: Compartment,
    pub home_id: String,
    pub databases: Vec<Database>,
    pub nodes: Vec<DbNode>,
}

/// A resolved profile and the compartments below its tenancy.
#[derive(Clone)]
pub struct ProfileScope {
    pub profile_id: String,
    pub tenancy_id: String,
    pub provider: Arc<dyn CloudProvider>,
    pub compartments: Vec<Compartment>,
}

impl ProfileScope {
    /// Lists the tenancy's compartments. A failed listing is fatal for the
    /// profile; a malformed compartment record only drops that record.
    pub async fn discover(resolved: ResolvedProfile, out: &mut PartialResult<ProfileScope>) {
        let listed = observe(
            Operation::ListCompartments,
            resolved.provider.list_compartments(&resolved.tenancy_id),
        )
        .await;

        let summaries = match listed {
            Ok(summaries) => summaries,
            Err(e) => {
                out.fail(UnitFailure::profile(&resolved.profile_id, &e));
                return;
            }
        };

        let mut compartments = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            match Compartment::try_from(summary) {
                Ok(c) => compartments.push(c),
                Err(e) => out.fail(UnitFailure::resource(
                    &resolved.profile_id,
                    &resolved.tenancy_id,
                    summary.id.as_deref(),
                    &e,
                )),
            }
        }

        out.push(ProfileScope {
            profile_id: resolved.profile_id,
            tenancy_id: resolved.tenancy_id,
            provider: resolved.provider,
            compartments,
        });
    }

    pub fn compartment_failure(&self, compartment: &Compartment, err: &AdvisorError) -> UnitFailure {
        UnitFailure::compartment(&self.profile_id, &compartment.id, err)
    }

    pub fn resource_failure(
        &self,
        compartment: &Compartment,
        resource_id: Option<&str>,
        err: &AdvisorError,
    ) -> UnitFailure {
        UnitFailure::resource(&self.profile_id, &compartment.id, resource_id, err)
    }

    pub async fn instances(&self, compartment: &Compartment) -> Result<Vec<ComputeInstance>> {
        observe(
            Operation::ListInstances,
            self.provider.list_instances(&compartment.id),
        )
        .await
    }

    pub async fn volumes(&self, compartment: &Compartment) -> Result<Vec<BlockVolume>> {
        observe(Operation::ListVolumes, self.provider.list_volumes(&compartment.id)).await
    }

    pub async fn volume_attachments(&self, compartment: &Compartment) -> Result<Vec<VolumeAttachment>> {
        observe(
            Operation::ListVolumeAttachments,
            self.provider.list_volume_attachments(&compartment.id),
        )
        .await
    }

    pub async fn volume_backups(&self, compartment: &Compartment) -> Result<Vec<VolumeBackup>> {
        observe(
            Operation::ListVolumeBackups,
            self.provider.list_volume_backups(&compartment.id),
        )
        .await
    }

    pub async fn boot_volume_backups(&self, compartment: &Compartment) -> Result<Vec<VolumeBackup>> {
        observe(
            Operation::ListBootVolumeBackups,
            self.provider.list_boot_volume_backups(&compartment.id),
        )
        .await
    }

    pub async fn load_balancer_healths(
        &self,
        compartment: &Compartment,
    ) -> Result<Vec<LoadBalancerHealth>> {
        observe(
            Operation::ListLoadBalancerHealths,
            self.provider.list_load_balancer_healths(&compartment.id),
        )
        .await
    }

    pub async fn load_balancers(&self, compartment: &Compartment) -> Result<Vec<LoadBalancer>> {
        observe(
            Operation::ListLoadBalancers,
            self.provider.list_load_balancers(&compartment.id),
        )
        .await
    }

    pub async fn summarize(
        &self,
        now: DateTime<Utc>,
        compartment: &Compartment,
        query: &MetricQuery,
    ) -> Result<MetricSeries> {
        let client = MetricsClient::new(self.provider.as_ref(), now);
        observe(
            Operation::SummarizeMetricsData,
            client.summarize(&compartment.id, query),
        )
        .await
    }

    /// Resolves the namespace, lists buckets, then fetches each bucket's
    /// details. Failing to fetch one bucket only drops that bucket.
    pub async fn buckets(&self, compartment: &Compartment) -> PartialResult<Bucket> {
        let mut out = PartialResult::new();

        let namespace = match observe(
            Operation::GetNamespace,
            self.provider.get_namespace(&compartment.id),
        )
        .await
        {
            Ok(ns) => ns,
            Err(e) => {
                out.fail(self.compartment_failure(compartment, &e));
                return out;
            }
        };

        let summaries = match observe(
            Operation::ListBuckets,
            self.provider.list_buckets(&compartment.id, &namespace),
        )
        .await
        {
            Ok(s) => s,
            Err(e) => {
                out.fail(self.compartment_failure(compartment, &e));
                return out;
            }
        };

        for summary in &summaries {
            let name = match summary.name() {
                Ok(name) => name,
                Err(e) => {
                    out.fail(self.resource_failure(compartment, None, &e));
                    continue;
                }
            };
            match observe(Operation::GetBucket, self.provider.get_bucket(&namespace, name)).await {
                Ok(bucket) => out.push(bucket),
                Err(e) => out.fail(self.resource_failure(compartment, Some(name), &e)),
            }
        }
        out
    }

    /// Lists every database under the compartment's homes.
    pub async fn databases(&self, compartment: &Compartment) -> PartialResult<Database> {
        let mut out = PartialResult::new();

        let homes = match observe(
            Operation::ListDbHomes,
            self.provider.list_db_homes(&compartment.id),
        )
        .await
        {
            Ok(homes) => homes,
            Err(e) => {
                out.fail(self.compartment_failure(compartment, &e));
                return out;
            }
        };

        for home in &homes {
            let home_id = match home.id() {
                Ok(id) => id,
                Err(e) => {
                    out.fail(self.resource_failure(compartment, None, &e));
                    continue;
                }
            };
            match observe(
                Operation::ListDatabases,
                self.provider.list_databases(&compartment.id, home_id),
            )
            .await
            {
                Ok(databases) => out.items.extend(databases),
                Err(e) => out.fail(self.resource_failure(compartment, Some(home_id), &e)),
            }
        }
        out
    }

    /// Walks homes, then each home's databases and nodes.
    pub async fn database_topology(&self, compartment: &Compartment) -> PartialResult<DbHomeTopology> {
        let mut out = PartialResult::new();

        let homes = match observe(
            Operation::ListDbHomes,
            self.provider.list_db_homes(&compartment.id),
        )
        .await
        {
            Ok(homes) => homes,
            Err(e) => {
                out.fail(self.compartment_failure(compartment, &e));
                return out;
            }
        };

        for home in &homes {
            let (home_id, parent) = match home.id().and_then(|id| Ok((id, home.node_parent()?))) {
                Ok(v) => v,
                Err(e) => {
                    out.fail(self.resource_failure(compartment, home.id.as_deref(), &e));
                    continue;
                }
            };

            let databases = match observe(
                Operation::ListDatabases,
                self.provider.list_databases(&compartment.id, home_id),
            )
            .await
            {
                Ok(dbs) => dbs,
                Err(e) => {
                    out.fail(self.resource_failure(compartment, Some(home_id), &e));
                    continue;
                }
            };

            let nodes = match observe(
                Operation::ListDbNodes,
                self.provider.list_db_nodes(&compartment.id, &parent),
            )
            .await
            {
                Ok(nodes) => nodes,
                Err(e) => {
                    out.fail(self.resource_failure(compartment, Some(parent.id()), &e));
                    continue;
                }
            };

            out.push(DbHomeTopology {
                compartment: compartment.clone(),
                home_id: home_id.to_string(),
                databases,
                nodes,
            });
        }
        out
    }

    /// Counts resources per kind in one compartment. Each kind is counted
    /// independently; a failed listing drops only that kind.
    pub async fn object_counts(&self, compartment: &Compartment) -> PartialResult<ObjectCount> {
        let mut out = PartialResult::new();

        let counts: Vec<(ObjectType, Result<usize>)> = vec![
            (
                ObjectType::ComputeInstance,
                self.instances(compartment).await.map(|v| v.len()),
            ),
            (
                ObjectType::BlockStorage,
                self.volumes(compartment).await.map(|v| v.len()),
            ),
            (ObjectType::Snapshot, {
                match self.volume_backups(compartment).await {
                    Ok(volume) => self
                        .boot_volume_backups(compartment)
                        .await
                        .map(|boot| volume.len() + boot.len()),
                    Err(e) => Err(e),
                }
            }),
            (
                ObjectType::LoadBalancer,
                self.load_balancers(compartment).await.map(|v| v.len()),
            ),
        ];

        for (object_type, count) in counts {
            match count {
                Ok(count) => out.push(self.object_count(compartment, object_type, count)),
                Err(e) => out.fail(self.compartment_failure(compartment, &e)),
            }
        }

        // Multi-step counts are only reported when every step completed.
        let databases = self.databases(compartment).await;
        let database_count = databases.items.len();
        let complete = databases.is_complete();
        out.absorb(databases);
        if complete {
            out.push(self.object_count(compartment, ObjectType::Database, database_count));
        }

        let buckets = self.buckets(compartment).await;
        let bucket_count = buckets.items.len();
        let complete = buckets.is_complete();
        out.absorb(buckets);
        if complete {
            out.push(self.object_count(compartment, ObjectType::ObjectStorage, bucket_count));
        }
        out
    }

    fn object_count(&self, compartment: &Compartment, object_type: ObjectType, count: usize) -> ObjectCount {
        ObjectCount {
            profile_id: self.profile_id.clone(),
            compartment_id: compartment.id.clone(),
            compartment_name: compartment.name.clone(),
            object_type,
            count,
        }
    }
}
