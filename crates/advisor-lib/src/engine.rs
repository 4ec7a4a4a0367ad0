//! Recommendation engine
//!
//! Resolves the requested profiles into scopes, runs heuristics over them
//! and folds every unit failure into the returned result.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::ercole::ErcoleInventory;
use crate::heuristics::{HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::models::{Compartment, ObjectCount};
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::partial::{PartialResult, RunResult, UnitFailure};
use crate::profiles::{ProfileResolver, ProfileStore};
use crate::provider::ProviderFactory;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A compartment together with the profile it was listed under.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompartment {
    pub profile_id: String,
    #[serde(flatten)]
    pub compartment: Compartment,
}

pub struct RecommendationEngine {
    resolver: ProfileResolver,
    ercole: Arc<dyn ErcoleInventory>,
    clock: Clock,
    metrics: AdvisorMetrics,
    logger: StructuredLogger,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        factory: Arc<dyn ProviderFactory>,
        ercole: Arc<dyn ErcoleInventory>,
    ) -> Self {
        Self {
            resolver: ProfileResolver::new(store, factory),
            ercole,
            clock: Arc::new(Utc::now),
            metrics: AdvisorMetrics::new(),
            logger: StructuredLogger::new("recommendation-engine"),
        }
    }

    /// Pins "now" for metric windows and age checks.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Resolves each distinct profile id and lists its compartments.
    /// Failures skip the profile and are recorded.
    async fn scopes(&self, profiles: &[String]) -> PartialResult<ProfileScope> {
        let mut out = PartialResult::new();

        let table = match self.resolver.load().await {
            Ok(table) => table,
            Err(e) => {
                out.fail(UnitFailure::run(&e));
                return out;
            }
        };

        let mut seen = std::collections::HashSet::new();
        for profile_id in profiles.iter().filter(|p| seen.insert(p.as_str())) {
            match self.resolver.resolve(&table, profile_id).await {
                Ok(resolved) => {
                    let before = out.items.len();
                    ProfileScope::discover(resolved, &mut out).await;
                    if let Some(scope) = out.items.get(before) {
                        self.logger
                            .log_profile_resolved(&scope.profile_id, scope.compartments.len());
                    }
                }
                Err(e) => out.fail(UnitFailure::profile(profile_id, &e)),
            }
        }
        out
    }

    /// Runs one heuristic across the given profiles.
    pub async fn run(&self, kind: HeuristicKind, profiles: &[String]) -> RunResult {
        self.logger.log_run_started(kind, profiles.len());
        let started = Instant::now();

        let mut result = PartialResult::new();
        let scopes = self.scopes(profiles).await;
        let scopes = result.absorb(scopes);

        let ctx = RunContext {
            now: (self.clock)(),
            ercole: self.ercole.as_ref(),
        };
        result.merge(kind.heuristic().evaluate(&ctx, &scopes).await);

        let run = result.tag(kind).into_run_result();
        self.record(kind, &run, started.elapsed().as_secs_f64());
        run
    }

    /// Runs every heuristic in turn and concatenates the results.
    pub async fn run_all(&self, profiles: &[String]) -> RunResult {
        let mut combined = PartialResult::new();
        for kind in HeuristicKind::ALL {
            let run = self.run(kind, profiles).await;
            combined.items.extend(run.recommendations);
            if let Some(error) = run.error {
                combined.failures.extend(error.failures);
            }
        }
        combined.into_run_result()
    }

    /// Lists the compartments visible to each profile.
    pub async fn list_compartments(&self, profiles: &[String]) -> PartialResult<ProfileCompartment> {
        let mut out = PartialResult::new();
        let scopes = self.scopes(profiles).await;
        for scope in out.absorb(scopes) {
            out.items.extend(scope.compartments.into_iter().map(|compartment| ProfileCompartment {
                profile_id: scope.profile_id.clone(),
                compartment,
            }));
        }
        out
    }

    /// Counts resources per kind in every compartment of each profile.
    pub async fn object_summary(&self, profiles: &[String]) -> PartialResult<ObjectCount> {
        let mut out = PartialResult::new();
        let scopes = self.scopes(profiles).await;
        for scope in out.absorb(scopes) {
            for compartment in &scope.compartments {
                out.merge(scope.object_counts(compartment).await);
            }
        }
        for failure in &out.failures {
            self.logger.log_unit_failure(failure);
        }
        out
    }

    fn record(&self, kind: HeuristicKind, run: &RunResult, duration_secs: f64) {
        self.metrics.observe_run_latency(kind, duration_secs);
        for rec in &run.recommendations {
            self.metrics.inc_recommendations(rec.category);
            self.logger.log_recommendation(rec);
        }
        for failure in run.failures() {
            self.metrics.inc_unit_failures(failure.heuristic);
            self.logger.log_unit_failure(failure);
        }
        self.logger.log_run_finished(
            kind,
            run.recommendations.len(),
            run.failures().len(),
            duration_secs,
        );
    }
}
