//! Database decommissioning, Ercole reconciliation and work-based
//! rightsizing.
//!
//! Stopped database nodes are flagged directly. Every other node, whatever
//! its lifecycle state, is grouped by hostname and compared against the Ercole inventory in two passes:
//!
//! 1. Presence: a live host unknown to Ercole, or a cloud-visible
//!    database missing from Ercole's list for a known host, is reported
//!    with `Ercole Installed = NO`.
//! 2. Work: for every Ercole-tracked database on a cloud-visible host, too
//!    many zero work samples or no sample above half the host's CPU
//!    threads marks the database as oversized.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{Heuristic, HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::models::{
    Category, Compartment, DbNode, ErcoleDatabaseRecord, ObjectType, Recommendation, Suggestion,
    STATE_STOPPED,
};
use crate::partial::{PartialResult, UnitFailure};

/// More zero work samples than this suggests AWR is not collecting.
pub const EXCESSIVE_ZERO_SAMPLES: usize = 5;

#[derive(Debug, Clone)]
struct CloudDatabase {
    unique_name: String,
    id: String,
}

/// Cloud-visible databases found on one live host.
#[derive(Debug, Clone)]
struct HostDatabases {
    compartment: Compartment,
    node_id: String,
    databases: Vec<CloudDatabase>,
}

impl HostDatabases {
    fn database(&self, unique_name: &str) -> Option<&CloudDatabase> {
        self.databases.iter().find(|d| d.unique_name == unique_name)
    }
}

/// Work samples Ercole holds for one database on one host.
#[derive(Debug, Default)]
struct WorkHistory {
    cpu_threads: i64,
    samples: Vec<i64>,
}

impl WorkHistory {
    fn zero_samples(&self) -> usize {
        self.samples.iter().filter(|s| **s == 0).count()
    }

    fn exceeds_half_capacity(&self) -> bool {
        let half = self.cpu_threads as f64 / 2.0;
        self.samples.iter().any(|s| *s as f64 > half)
    }
}

pub struct DatabaseRightsizing;

impl DatabaseRightsizing {
    fn decommission(node: &DbNode, compartment: &Compartment, id: &str, hostname: &str) -> Recommendation {
        Recommendation::new(
            Category::UnusedServiceDecommissioning,
            Suggestion::DeleteDatabaseInstanceNotActive,
            ObjectType::Database,
            compartment,
            id,
            hostname,
        )
        .with_detail("Hostname", hostname)
        .with_detail(
            "CPU Core Count",
            node.cpu_core_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }

    fn reconciliation(
        compartment: &Compartment,
        resource_id: &str,
        instance_name: &str,
    ) -> Recommendation {
        Recommendation::new(
            Category::SoftwareInfrastructureRightsizing,
            Suggestion::ResizeOversizedDatabaseInstance,
            ObjectType::Database,
            compartment,
            resource_id,
            instance_name,
        )
        .with_detail("Instance Name", instance_name)
        .with_detail("Ercole Installed", "NO")
        .with_detail("AWR Enabled", "NO")
    }

    /// Groups live nodes by hostname and flags stopped ones.
    async fn collect_hosts(
        scopes: &[ProfileScope],
        out: &mut PartialResult<Recommendation>,
    ) -> BTreeMap<String, HostDatabases> {
        let mut hosts: BTreeMap<String, HostDatabases> = BTreeMap::new();

        for scope in scopes {
            for compartment in &scope.compartments {
                let topology = scope.database_topology(compartment).await;
                for home in out.absorb(topology) {
                    let mut databases = Vec::with_capacity(home.databases.len());
                    for db in &home.databases {
                        match db.id().and_then(|id| Ok((id, db.unique_name()?))) {
                            Ok((id, unique_name)) => databases.push(CloudDatabase {
                                unique_name: unique_name.to_string(),
                                id: id.to_string(),
                            }),
                            Err(e) => out.fail(scope.resource_failure(compartment, db.id.as_deref(), &e)),
                        }
                    }

                    for node in &home.nodes {
                        let parsed = node
                            .id()
                            .and_then(|id| Ok((id, node.hostname()?, node.state()?)));
                        let (id, hostname, state) = match parsed {
                            Ok(v) => v,
                            Err(e) => {
                                out.fail(scope.resource_failure(compartment, node.id.as_deref(), &e));
                                continue;
                            }
                        };

                        match state {
                            STATE_STOPPED => {
                                out.push(Self::decommission(node, compartment, id, hostname));
                            }
                            _ => {
                                let entry = hosts.entry(hostname.to_string()).or_insert_with(|| {
                                    HostDatabases {
                                        compartment: compartment.clone(),
                                        node_id: id.to_string(),
                                        databases: Vec::new(),
                                    }
                                });
                                for db in &databases {
                                    if entry.database(&db.unique_name).is_none() {
                                        entry.databases.push(db.clone());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        hosts
    }

    fn presence_check(
        hosts: &BTreeMap<String, HostDatabases>,
        active: &[ErcoleDatabaseRecord],
        out: &mut PartialResult<Recommendation>,
    ) {
        let mut tracked: HashMap<&str, HashSet<&str>> = HashMap::new();
        for record in active {
            tracked
                .entry(record.hostname.as_str())
                .or_default()
                .extend(record.databases.iter().map(|d| d.unique_name.as_str()));
        }

        for (hostname, host) in hosts {
            match tracked.get(hostname.as_str()) {
                None => out.push(Self::reconciliation(&host.compartment, &host.node_id, hostname)),
                Some(names) => {
                    for db in host.databases.iter().filter(|d| !names.contains(d.unique_name.as_str())) {
                        out.push(Self::reconciliation(
                            &host.compartment,
                            &db.id,
                            &format!("{hostname}-{}", db.unique_name),
                        ));
                    }
                }
            }
        }
    }

    fn work_check(
        hosts: &BTreeMap<String, HostDatabases>,
        records: &[ErcoleDatabaseRecord],
        out: &mut PartialResult<Recommendation>,
    ) {
        let mut histories: BTreeMap<(&str, &str), WorkHistory> = BTreeMap::new();
        for record in records.iter().filter(|r| hosts.contains_key(&r.hostname)) {
            for db in &record.databases {
                let history = histories
                    .entry((record.hostname.as_str(), db.unique_name.as_str()))
                    .or_default();
                // Current host records win over archived ones.
                if !record.archived || history.cpu_threads == 0 {
                    history.cpu_threads = record.cpu_threads;
                }
                history.samples.extend_from_slice(&db.work_samples);
            }
        }

        for ((hostname, unique_name), history) in &histories {
            let Some(host) = hosts.get(*hostname) else {
                continue;
            };
            let zeros = history.zero_samples();
            let awr_disabled = zeros > EXCESSIVE_ZERO_SAMPLES;
            if !awr_disabled && history.exceeds_half_capacity() {
                continue;
            }

            let resource_id = host
                .database(unique_name)
                .map(|d| d.id.as_str())
                .unwrap_or(host.node_id.as_str());
            let instance_name = format!("{hostname}-{unique_name}");
            out.push(
                Recommendation::new(
                    Category::SoftwareInfrastructureRightsizing,
                    Suggestion::ResizeOversizedDatabaseInstance,
                    ObjectType::Database,
                    &host.compartment,
                    resource_id,
                    instance_name.as_str(),
                )
                .with_detail("Instance Name", instance_name.as_str())
                .with_detail("Ercole Installed", "YES")
                .with_detail("AWR Enabled", if awr_disabled { "NO" } else { "YES" })
                .with_detail("Ercole Host Cpu Thread", history.cpu_threads.to_string()),
            );
        }
    }
}

#[async_trait]
impl Heuristic for DatabaseRightsizing {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::DatabaseRightsizing
    }

    async fn evaluate(
        &self,
        ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        let ercole = match ctx.ercole.databases().await {
            Ok(all) => match ctx.ercole.active_databases().await {
                Ok(active) => Some((all, active)),
                Err(e) => {
                    out.fail(UnitFailure::run(&e));
                    None
                }
            },
            Err(e) => {
                out.fail(UnitFailure::run(&e));
                None
            }
        };

        let hosts = Self::collect_hosts(scopes, &mut out).await;

        if let Some((all, active)) = ercole {
            Self::presence_check(&hosts, &active, &mut out);
            Self::work_check(&hosts, &all, &mut out);
        }
        out
    }
}
