use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::*;
use crate::ercole::StaticErcoleInventory;
use crate::metrics::{Datapoint, MetricStream, RESOURCE_ID_DIMENSION, UNIT_METADATA};
use crate::models::{
    BackupKind, Bucket, BlockVolume, Category, Compartment, ComputeInstance, Database, DbHome,
    DbNode, ErcoleDatabase, ErcoleDatabaseRecord, LoadBalancer, LoadBalancerHealth, ObjectType,
    ShapeConfig, Suggestion, VolumeAttachment, VolumeBackup,
};
use crate::provider::{InMemoryProvider, Operation, TenancySnapshot};

const C1: &str = "ocid1.compartment.oc1..prod";
const C2: &str = "ocid1.compartment.oc1..dev";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

fn scope(provider: InMemoryProvider) -> ProfileScope {
    let compartments = provider
        .snapshot()
        .compartments
        .iter()
        .map(|c| Compartment::try_from(c).unwrap())
        .collect();
    ProfileScope {
        profile_id: "prod".into(),
        tenancy_id: "ocid1.tenancy.oc1..t".into(),
        provider: Arc::new(provider),
        compartments,
    }
}

fn base() -> TenancySnapshot {
    TenancySnapshot::default().with_compartment(C1, "prod")
}

async fn evaluate_with(
    kind: HeuristicKind,
    provider: InMemoryProvider,
    ercole: &StaticErcoleInventory,
) -> PartialResult<Recommendation> {
    let ctx = RunContext { now: now(), ercole };
    kind.heuristic().evaluate(&ctx, &[scope(provider)]).await
}

async fn evaluate(kind: HeuristicKind, provider: InMemoryProvider) -> PartialResult<Recommendation> {
    evaluate_with(kind, provider, &StaticErcoleInventory::empty()).await
}

fn stream(resource_id: &str, values: &[f64]) -> MetricStream {
    MetricStream {
        dimensions: HashMap::from([(RESOURCE_ID_DIMENSION.to_string(), resource_id.to_string())]),
        aggregated_datapoints: values
            .iter()
            .map(|v| Datapoint {
                timestamp: None,
                value: Some(*v),
            })
            .collect(),
        ..Default::default()
    }
}

fn with_unit(mut stream: MetricStream, unit: &str) -> MetricStream {
    stream.metadata.insert(UNIT_METADATA.to_string(), unit.to_string());
    stream
}

fn instance(id: &str, shape: &str) -> ComputeInstance {
    ComputeInstance {
        id: Some(id.into()),
        display_name: Some(format!("{id}-name")),
        shape: Some(shape.into()),
        lifecycle_state: Some("RUNNING".into()),
        shape_config: Some(ShapeConfig {
            ocpus: Some(2.0),
            memory_in_gbs: Some(16.0),
        }),
        ..Default::default()
    }
}

fn ids(result: &PartialResult<Recommendation>) -> Vec<&str> {
    result.items.iter().map(|r| r.resource_id.as_str()).collect()
}

// Idle compute

#[tokio::test]
async fn test_idle_single_up_sample_clears_instance() {
    let mut snapshot = base().with_metric(
        C1,
        IDLE_QUERY.namespace,
        IDLE_QUERY.query,
        vec![
            stream("i-up", &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            stream("i-down", &[0.0; 8]),
        ],
    );
    snapshot.instances.insert(
        C1.into(),
        vec![instance("i-up", "VM.Standard.E4.Flex"), instance("i-down", "VM.Standard.E4.Flex")],
    );

    let result = evaluate(HeuristicKind::IdleCompute, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["i-down"]);
    assert_eq!(result.items[0].category, Category::ComputeInstanceIdle);
    assert_eq!(result.items[0].detail("Instance Shape"), Some("VM.Standard.E4.Flex"));
}

#[tokio::test]
async fn test_idle_kubernetes_node() {
    let mut node = instance("i-node", "VM.Standard.E4.Flex");
    node.metadata.insert("oke-pool-id".into(), "pool".into());
    node.metadata
        .insert("oke-cluster-display-name".into(), "cluster-a".into());
    let mut snapshot = base();
    snapshot.instances.insert(C1.into(), vec![node]);

    let result = evaluate(HeuristicKind::IdleCompute, InMemoryProvider::new(snapshot)).await;

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].category, Category::UnusedServiceDecommissioning);
    assert_eq!(result.items[0].object_type, ObjectType::ClusterKubernetes);
    assert_eq!(result.items[0].detail("Oke Cluster Name"), Some("cluster-a"));
}

#[tokio::test]
async fn test_idle_metric_failure_skips_compartment() {
    let mut snapshot = base().with_compartment(C2, "dev");
    snapshot
        .instances
        .insert(C1.into(), vec![instance("i-1", "VM.Standard.E4.Flex")]);
    snapshot
        .instances
        .insert(C2.into(), vec![instance("i-2", "VM.Standard.E4.Flex")]);
    let provider = InMemoryProvider::new(snapshot).with_failure(Operation::SummarizeMetricsData, C1);

    let result = evaluate(HeuristicKind::IdleCompute, provider).await;

    assert_eq!(ids(&result), vec!["i-2"]);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].compartment_id.as_deref(), Some(C1));
}

#[tokio::test]
async fn test_idle_missing_name_is_recorded() {
    let mut nameless = instance("i-1", "VM.Standard.E4.Flex");
    nameless.display_name = None;
    let mut snapshot = base();
    snapshot.instances.insert(C1.into(), vec![nameless]);

    let result = evaluate(HeuristicKind::IdleCompute, InMemoryProvider::new(snapshot)).await;

    assert!(result.items.is_empty());
    assert_eq!(result.failures[0].resource_id.as_deref(), Some("i-1"));
    assert!(result.failures[0].message.contains("displayName"));
}

// Compute rightsizing

fn signal_snapshot(
    signals: &[SignalQuery; 3],
    instances: Vec<ComputeInstance>,
    streams: [Vec<MetricStream>; 3],
) -> TenancySnapshot {
    let mut snapshot = base();
    snapshot.instances.insert(C1.into(), instances);
    for (signal, streams) in signals.iter().zip(streams) {
        snapshot = snapshot.with_metric(C1, signal.query.namespace, signal.query.query, streams);
    }
    snapshot
}

fn rightsizing_snapshot(instances: Vec<ComputeInstance>, streams: [Vec<MetricStream>; 3]) -> TenancySnapshot {
    signal_snapshot(&SIGNAL_QUERIES, instances, streams)
}

fn hits(resource_id: &str, count: usize) -> MetricStream {
    stream(resource_id, &vec![1.0; count])
}

#[tokio::test]
async fn test_rightsizing_requires_all_three_signals() {
    let snapshot = rightsizing_snapshot(
        vec![
            instance("i-all", "VM.Standard.E4.Flex"),
            instance("i-two", "VM.Standard.E4.Flex"),
        ],
        [
            vec![hits("i-all", 4), hits("i-two", 4)],
            vec![hits("i-all", 181), hits("i-two", 181)],
            vec![hits("i-all", 2), hits("i-two", 1)],
        ],
    );

    let result = evaluate(HeuristicKind::ComputeRightsizing, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["i-all"]);
    let rec = &result.items[0];
    assert_eq!(rec.category, Category::ComputeInstanceRightsizing);
    assert_eq!(rec.detail("Cpu Core Count"), Some("2.00"));
    assert_eq!(rec.detail(SIGNAL_QUERIES[1].detail), Some("181 / 180"));
}

#[tokio::test]
async fn test_rightsizing_exempt_shape_never_recommended() {
    let snapshot = rightsizing_snapshot(
        vec![instance("i-small", "VM.Standard2.1")],
        [
            vec![hits("i-small", 10)],
            vec![hits("i-small", 500)],
            vec![hits("i-small", 10)],
        ],
    );

    let result = evaluate(HeuristicKind::ComputeRightsizing, InMemoryProvider::new(snapshot)).await;

    assert!(result.items.is_empty());
}

#[tokio::test]
async fn test_rightsizing_flags_instances_without_monitoring() {
    let mut stopped = instance("i-stopped", "VM.Standard.E4.Flex");
    stopped.lifecycle_state = Some("STOPPED".into());
    let snapshot = rightsizing_snapshot(
        vec![
            instance("i-watched", "VM.Standard.E4.Flex"),
            instance("i-blind", "VM.Standard.E4.Flex"),
            stopped,
        ],
        [vec![hits("i-watched", 0)], vec![], vec![]],
    );

    let result = evaluate(HeuristicKind::ComputeRightsizing, InMemoryProvider::new(snapshot)).await;

    assert_eq!(ids(&result), vec!["i-blind"]);
    assert_eq!(result.items[0].category, Category::ComputeInstanceWithoutMonitoring);
}

#[tokio::test]
async fn test_rightsizing_failed_query_suppresses_without_monitoring() {
    let snapshot = rightsizing_snapshot(
        vec![instance("i-blind", "VM.Standard.E4.Flex")],
        [vec![], vec![], vec![]],
    );
    let provider = InMemoryProvider::new(snapshot).with_failure(Operation::SummarizeMetricsData, C1);

    let result = evaluate(HeuristicKind::ComputeRightsizing, provider).await;

    assert!(result.items.is_empty());
    assert_eq!(result.failures.len(), 3);
}

// Compute decommissioning

#[tokio::test]
async fn test_decommissioning_uses_its_own_thresholds() {
    let snapshot = signal_snapshot(
        &DECOMMISSION_QUERIES,
        vec![
            // Exempt from rightsizing, but any shape can be deleted.
            instance("i-small", "VM.Standard2.1"),
            instance("i-two", "VM.Standard.E4.Flex"),
            instance("i-blind", "VM.Standard.E4.Flex"),
        ],
        [
            vec![hits("i-small", 4), hits("i-two", 4)],
            vec![hits("i-small", 181), hits("i-two", 100)],
            vec![hits("i-small", 2), hits("i-two", 2)],
        ],
    );

    let result = evaluate(HeuristicKind::ComputeDecommissioning, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["i-small"]);
    let rec = &result.items[0];
    assert_eq!(rec.category, Category::ComputeInstanceDecommissioning);
    assert_eq!(rec.suggestion, Suggestion::DeleteComputeInstanceNotUsed);
    assert_eq!(rec.detail(DECOMMISSION_QUERIES[2].detail), Some("2 / 1"));
}

#[tokio::test]
async fn test_decommissioning_kubernetes_node() {
    let mut node = instance("i-node", "VM.Standard.E4.Flex");
    node.metadata.insert("oke-pool-id".into(), "pool".into());
    node.metadata
        .insert("oke-cluster-display-name".into(), "cluster-a".into());
    let snapshot = signal_snapshot(
        &DECOMMISSION_QUERIES,
        vec![node],
        [
            vec![hits("i-node", 4)],
            vec![hits("i-node", 181)],
            vec![hits("i-node", 2)],
        ],
    );

    let result = evaluate(HeuristicKind::ComputeDecommissioning, InMemoryProvider::new(snapshot)).await;

    let rec = &result.items[0];
    assert_eq!(rec.category, Category::UnusedServiceDecommissioning);
    assert_eq!(rec.suggestion, Suggestion::DeleteKubernetesNodeNotUsed);
    assert_eq!(rec.object_type, ObjectType::ClusterKubernetes);
    assert_eq!(rec.detail("Oke Cluster Name"), Some("cluster-a"));
}

#[tokio::test]
async fn test_decommissioning_ignores_rightsizing_series() {
    let snapshot = rightsizing_snapshot(
        vec![instance("i-all", "VM.Standard.E4.Flex")],
        [
            vec![hits("i-all", 4)],
            vec![hits("i-all", 181)],
            vec![hits("i-all", 2)],
        ],
    );

    let result = evaluate(HeuristicKind::ComputeDecommissioning, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert!(result.items.is_empty());
}

// Block storage rightsizing

fn volume(id: &str, vpu: i64, size: i64) -> BlockVolume {
    BlockVolume {
        id: Some(id.into()),
        display_name: Some(format!("{id}-name")),
        size_in_gbs: Some(size),
        vpus_per_gb: Some(vpu),
        availability_domain: Some("AD-1".into()),
        lifecycle_state: Some("AVAILABLE".into()),
    }
}

const MIB: f64 = 1024.0 * 1024.0;

fn block_snapshot(volumes: Vec<BlockVolume>, usage: &[(&str, f64, f64)]) -> TenancySnapshot {
    let mut snapshot = base();
    snapshot.volumes.insert(C1.into(), volumes);
    for (query, measure) in &BLOCK_STORAGE_QUERIES {
        let streams = usage
            .iter()
            .map(|(id, mibps, iops)| match measure {
                // Read and write each carry half the load.
                block_storage::Measure::Throughput => {
                    with_unit(stream(id, &[0.0, mibps / 2.0 * MIB]), "bytes")
                }
                block_storage::Measure::Iops => with_unit(stream(id, &[iops / 2.0]), "operations"),
            })
            .collect();
        snapshot = snapshot.with_metric(C1, query.namespace, query.query, streams);
    }
    snapshot
}

#[tokio::test]
async fn test_block_storage_flags_quiet_volume() {
    let snapshot = block_snapshot(
        vec![volume("v-quiet", 10, 100), volume("v-busy", 10, 100)],
        &[("v-quiet", 10.0, 100.0), ("v-busy", 50.0, 1000.0)],
    );

    let result =
        evaluate(HeuristicKind::BlockStorageRightsizing, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["v-quiet"]);
    let rec = &result.items[0];
    assert_eq!(rec.detail("Size"), Some("100 GB"));
    assert_eq!(rec.detail("VPU"), Some("10"));
    assert_eq!(rec.detail("VPU Target"), Some("48 MB/s - 6000 iops"));
    assert_eq!(rec.detail("Throughput R/W Max 5dd"), Some("10 MB/s - 48 MB/s"));
    assert_eq!(rec.detail("Iops Max 5dd"), Some("100 - 6000"));
}

#[tokio::test]
async fn test_block_storage_zero_vpu_never_flagged() {
    let snapshot = block_snapshot(vec![volume("v-low", 0, 100)], &[("v-low", 0.0, 0.0)]);

    let result =
        evaluate(HeuristicKind::BlockStorageRightsizing, InMemoryProvider::new(snapshot)).await;

    assert!(result.items.is_empty());
}

#[tokio::test]
async fn test_block_storage_empty_datapoints_is_fault() {
    let mut snapshot = base();
    snapshot.volumes.insert(C1.into(), vec![volume("v-1", 10, 100)]);
    for (query, _) in &BLOCK_STORAGE_QUERIES {
        snapshot = snapshot.with_metric(C1, query.namespace, query.query, vec![stream("v-1", &[])]);
    }

    let result =
        evaluate(HeuristicKind::BlockStorageRightsizing, InMemoryProvider::new(snapshot)).await;

    assert!(result.items.is_empty());
    assert_eq!(result.failures.len(), 4);
    assert_eq!(result.failures[0].resource_id.as_deref(), Some("v-1"));
}

// Unused volume

fn attachment(volume_id: &str, state: &str) -> VolumeAttachment {
    VolumeAttachment {
        id: Some(format!("att-{volume_id}")),
        volume_id: Some(volume_id.into()),
        instance_id: Some("i-1".into()),
        lifecycle_state: Some(state.into()),
    }
}

#[tokio::test]
async fn test_unused_volumes_are_set_difference() {
    let mut snapshot = base().with_compartment(C2, "dev");
    snapshot.volumes.insert(
        C1.into(),
        vec![volume("v-1", 10, 50), volume("v-2", 10, 50), volume("v-3", 10, 50)],
    );
    snapshot.volume_attachments.insert(C1.into(), vec![attachment("v-1", "ATTACHED")]);
    // Attached from an instance in another compartment.
    snapshot.volume_attachments.insert(
        C2.into(),
        vec![attachment("v-2", "ATTACHED"), attachment("v-3", "DETACHED")],
    );

    let result = evaluate(HeuristicKind::UnusedVolume, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["v-3"]);
    assert_eq!(result.items[0].category, Category::UnusedStorage);
    assert_eq!(result.items[0].compartment_id, C1);
    assert_eq!(result.items[0].detail("Availability Domain"), Some("AD-1"));
}

#[tokio::test]
async fn test_unused_volumes_withheld_when_attachments_incomplete() {
    let mut snapshot = base();
    snapshot.volumes.insert(C1.into(), vec![volume("v-1", 10, 50)]);
    let provider =
        InMemoryProvider::new(snapshot).with_failure(Operation::ListVolumeAttachments, C1);

    let result = evaluate(HeuristicKind::UnusedVolume, provider).await;

    assert!(result.items.is_empty());
    assert_eq!(result.failures.len(), 2);
}

// Old snapshot

fn backup(id: &str, source: &str, age_days: i64) -> VolumeBackup {
    VolumeBackup {
        id: Some(id.into()),
        display_name: Some(format!("{id}-name")),
        source_type: Some(source.into()),
        time_created: Some(now() - Duration::days(age_days)),
        size_in_gbs: Some(50),
        kind: BackupKind::Volume,
    }
}

#[tokio::test]
async fn test_old_snapshot_only_old_manual_backups() {
    let mut snapshot = base();
    snapshot.volume_backups.insert(
        C1.into(),
        vec![
            backup("b-old", "MANUAL", 35),
            backup("b-new", "MANUAL", 10),
            backup("b-sched", "SCHEDULED", 400),
        ],
    );
    snapshot
        .boot_volume_backups
        .insert(C1.into(), vec![backup("bb-old", "MANUAL", 90)]);

    let result = evaluate(HeuristicKind::OldSnapshot, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["b-old", "bb-old"]);
    assert_eq!(result.items[0].detail("Age (days)"), Some("35"));
    assert_eq!(result.items[0].detail("Size"), Some("50 GB"));
    assert_eq!(result.items[1].detail("Backup Type"), Some("Boot Volume"));
}

#[tokio::test]
async fn test_old_snapshot_boot_listing_failure_keeps_volume_results() {
    let mut snapshot = base();
    snapshot
        .volume_backups
        .insert(C1.into(), vec![backup("b-old", "MANUAL", 35)]);
    let provider =
        InMemoryProvider::new(snapshot).with_failure(Operation::ListBootVolumeBackups, C1);

    let result = evaluate(HeuristicKind::OldSnapshot, provider).await;

    assert_eq!(ids(&result), vec!["b-old"]);
    assert_eq!(result.failures.len(), 1);
}

// Unused load balancer

fn health(id: &str, status: &str) -> LoadBalancerHealth {
    LoadBalancerHealth {
        load_balancer_id: Some(id.into()),
        status: Some(status.into()),
    }
}

fn load_balancer(id: &str) -> LoadBalancer {
    LoadBalancer {
        id: Some(id.into()),
        display_name: Some(format!("{id}-name")),
        shape_name: Some("flexible".into()),
    }
}

#[tokio::test]
async fn test_unhealthy_load_balancers() {
    let mut snapshot = base();
    snapshot.load_balancer_healths.insert(
        C1.into(),
        vec![
            health("lb-critical", "CRITICAL"),
            health("lb-unknown", "UNKNOWN"),
            health("lb-ok", "OK"),
            health("lb-gone", "CRITICAL"),
        ],
    );
    snapshot.load_balancers.insert(
        C1.into(),
        vec![
            load_balancer("lb-critical"),
            load_balancer("lb-unknown"),
            load_balancer("lb-ok"),
        ],
    );

    let result = evaluate(HeuristicKind::UnusedLoadBalancer, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["lb-critical", "lb-unknown"]);
    assert_eq!(result.items[0].name, "lb-critical-name");
    assert_eq!(result.items[1].detail("Health Status"), Some("UNKNOWN"));
}

#[tokio::test]
async fn test_load_balancer_without_id_is_a_failure() {
    let mut snapshot = base();
    snapshot
        .load_balancer_healths
        .insert(C1.into(), vec![health("lb-critical", "CRITICAL")]);
    let mut anonymous = load_balancer("lb-anon");
    anonymous.id = None;
    snapshot
        .load_balancers
        .insert(C1.into(), vec![anonymous, load_balancer("lb-critical")]);

    let result = evaluate(HeuristicKind::UnusedLoadBalancer, InMemoryProvider::new(snapshot)).await;

    assert_eq!(ids(&result), vec!["lb-critical"]);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].message.contains("LoadBalancer record is missing"));
}

// Bucket auto-tiering

fn bucket(name: &str, tiering: &str, size: i64) -> Bucket {
    Bucket {
        id: Some(format!("id-{name}")),
        name: Some(name.into()),
        auto_tiering: Some(tiering.into()),
        approximate_size: Some(size),
        approximate_count: Some(12),
    }
}

#[tokio::test]
async fn test_buckets_without_auto_tiering() {
    let mut snapshot = TenancySnapshot {
        namespace: Some("tenancyns".into()),
        ..base()
    };
    snapshot.buckets.insert(
        C1.into(),
        vec![
            bucket("logs", "Disabled", 3 * 1024 * 1024 * 1024),
            bucket("archive", "InfrequentAccess", 10),
        ],
    );

    let result = evaluate(HeuristicKind::BucketAutoTiering, InMemoryProvider::new(snapshot)).await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["id-logs"]);
    let rec = &result.items[0];
    assert_eq!(rec.object_type, ObjectType::ObjectStorage);
    assert_eq!(rec.detail("Size"), Some("3.00 GiB"));
    assert_eq!(rec.detail("Optimization"), Some("Enable auto-tiering"));
}

// Database rightsizing

fn db_snapshot() -> TenancySnapshot {
    let mut snapshot = base();
    snapshot.db_homes.insert(
        C1.into(),
        vec![DbHome {
            id: Some("home-1".into()),
            db_system_id: Some("sys-1".into()),
            ..Default::default()
        }],
    );
    snapshot.databases.insert(
        "home-1".into(),
        vec![
            Database {
                id: Some("db-orcl".into()),
                db_unique_name: Some("ORCL".into()),
                ..Default::default()
            },
            Database {
                id: Some("db-hr".into()),
                db_unique_name: Some("HR".into()),
                ..Default::default()
            },
        ],
    );
    snapshot.db_nodes.insert(
        "sys-1".into(),
        vec![
            DbNode {
                id: Some("node-1".into()),
                hostname: Some("dbhost1".into()),
                lifecycle_state: Some("AVAILABLE".into()),
                cpu_core_count: Some(4),
            },
            DbNode {
                id: Some("node-2".into()),
                hostname: Some("dbhost2".into()),
                lifecycle_state: Some("STOPPED".into()),
                cpu_core_count: Some(2),
            },
        ],
    );
    snapshot
}

fn ercole_record(hostname: &str, cpu_threads: i64, dbs: &[(&str, &[i64])]) -> ErcoleDatabaseRecord {
    ErcoleDatabaseRecord {
        hostname: hostname.into(),
        archived: false,
        cpu_threads,
        databases: dbs
            .iter()
            .map(|(name, samples)| ErcoleDatabase {
                unique_name: (*name).into(),
                work_samples: samples.to_vec(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_database_stopped_node_and_unknown_host() {
    let result = evaluate(HeuristicKind::DatabaseRightsizing, InMemoryProvider::new(db_snapshot())).await;

    assert!(result.is_complete());
    let stopped = result
        .items
        .iter()
        .find(|r| r.category == Category::UnusedServiceDecommissioning)
        .unwrap();
    assert_eq!(stopped.resource_id, "node-2");
    assert_eq!(stopped.detail("CPU Core Count"), Some("2"));

    let unknown = result
        .items
        .iter()
        .find(|r| r.category == Category::SoftwareInfrastructureRightsizing)
        .unwrap();
    assert_eq!(unknown.resource_id, "node-1");
    assert_eq!(unknown.detail("Ercole Installed"), Some("NO"));
}

#[tokio::test]
async fn test_database_reconciliation_and_work_passes() {
    let ercole = StaticErcoleInventory::new(vec![
        // HR is visible in the cloud but not tracked by Ercole.
        ercole_record("dbhost1", 8, &[("ORCL", &[0, 0, 0, 0, 0, 0, 1])]),
        // Host not running in the cloud: ignored by the work pass.
        ercole_record("elsewhere", 8, &[("X", &[0])]),
    ]);

    let result = evaluate_with(
        HeuristicKind::DatabaseRightsizing,
        InMemoryProvider::new(db_snapshot()),
        &ercole,
    )
    .await;

    let missing = result
        .items
        .iter()
        .find(|r| r.resource_id == "db-hr")
        .unwrap();
    assert_eq!(missing.name, "dbhost1-HR");
    assert_eq!(missing.detail("Ercole Installed"), Some("NO"));

    let work = result
        .items
        .iter()
        .find(|r| r.resource_id == "db-orcl")
        .unwrap();
    assert_eq!(work.detail("Ercole Installed"), Some("YES"));
    assert_eq!(work.detail("AWR Enabled"), Some("NO"));
    assert_eq!(work.detail("Ercole Host Cpu Thread"), Some("8"));

    assert!(result.items.iter().all(|r| !r.name.starts_with("elsewhere")));
}

#[tokio::test]
async fn test_database_busy_instance_not_flagged() {
    let ercole = StaticErcoleInventory::new(vec![ercole_record(
        "dbhost1",
        8,
        &[("ORCL", &[1, 2, 6]), ("HR", &[5])],
    )]);

    let result = evaluate_with(
        HeuristicKind::DatabaseRightsizing,
        InMemoryProvider::new(db_snapshot()),
        &ercole,
    )
    .await;

    assert!(result.is_complete());
    assert_eq!(ids(&result), vec!["node-2"]);
}

#[tokio::test]
async fn test_database_live_node_states_are_reconciled() {
    let ercole = StaticErcoleInventory::new(vec![ercole_record(
        "dbhost1",
        8,
        &[("ORCL", &[0; 7]), ("HR", &[6])],
    )]);

    for state in ["AVAILABLE", "STARTING", "UPDATING", "RUNNING"] {
        let mut snapshot = db_snapshot();
        snapshot.db_nodes.get_mut("sys-1").unwrap()[0].lifecycle_state = Some(state.into());

        let result = evaluate_with(
            HeuristicKind::DatabaseRightsizing,
            InMemoryProvider::new(snapshot),
            &ercole,
        )
        .await;

        assert!(result.is_complete());
        assert_eq!(ids(&result), vec!["node-2", "db-orcl"], "state {state}");
        assert_eq!(result.items[1].detail("AWR Enabled"), Some("NO"));
    }
}

#[tokio::test]
async fn test_database_ercole_only_databases_on_one_host() {
    let ercole = StaticErcoleInventory::new(vec![ercole_record(
        "dbhost1",
        8,
        &[("ORCL", &[6]), ("HR", &[6]), ("X1", &[0]), ("X2", &[1])],
    )]);

    let run = evaluate_with(
        HeuristicKind::DatabaseRightsizing,
        InMemoryProvider::new(db_snapshot()),
        &ercole,
    )
    .await
    .into_run_result();

    let on_node: Vec<&str> = run
        .recommendations
        .iter()
        .filter(|r| r.resource_id == "node-1")
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(on_node, vec!["dbhost1-X1", "dbhost1-X2"]);
}

struct FailingErcole;

#[async_trait::async_trait]
impl crate::ercole::ErcoleInventory for FailingErcole {
    async fn databases(&self) -> crate::error::Result<Vec<ErcoleDatabaseRecord>> {
        Err(crate::error::AdvisorError::Inventory("ercole unreachable".into()))
    }

    async fn active_databases(&self) -> crate::error::Result<Vec<ErcoleDatabaseRecord>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_database_ercole_failure_keeps_decommission() {
    let ercole = FailingErcole;
    let ctx = RunContext {
        now: now(),
        ercole: &ercole,
    };
    let result = DatabaseRightsizing
        .evaluate(&ctx, &[scope(InMemoryProvider::new(db_snapshot()))])
        .await;

    assert_eq!(ids(&result), vec!["node-2"]);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].message.contains("ercole unreachable"));
}

#[test]
fn test_heuristic_kind_round_trips_names() {
    for kind in HeuristicKind::ALL {
        assert_eq!(kind.as_str().parse::<HeuristicKind>().unwrap(), kind);
        assert_eq!(kind.heuristic().kind(), kind);
    }
    assert!("bogus".parse::<HeuristicKind>().is_err());
}
