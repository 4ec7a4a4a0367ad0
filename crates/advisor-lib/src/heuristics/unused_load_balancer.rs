//! Load balancers whose overall health is critical or unknown.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{Heuristic, HeuristicKind, RunContext};
use crate::inventory::ProfileScope;
use crate::models::{Category, ObjectType, Recommendation, Suggestion};
use crate::partial::PartialResult;

pub const UNHEALTHY_STATUSES: &[&str] = &["CRITICAL", "UNKNOWN"];

pub struct UnusedLoadBalancer;

#[async_trait]
impl Heuristic for UnusedLoadBalancer {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::UnusedLoadBalancer
    }

    async fn evaluate(
        &self,
        _ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            for compartment in &scope.compartments {
                let healths = match scope.load_balancer_healths(compartment).await {
                    Ok(healths) => healths,
                    Err(e) => {
                        out.fail(scope.compartment_failure(compartment, &e));
                        continue;
                    }
                };

                let mut candidates: HashMap<String, String> = HashMap::new();
                for health in &healths {
                    match health
                        .load_balancer_id()
                        .and_then(|id| Ok((id, health.status()?)))
                    {
                        Ok((id, status)) if UNHEALTHY_STATUSES.contains(&status) => {
                            candidates.insert(id.to_string(), status.to_string());
                        }
                        Ok(_) => {}
                        Err(e) => out.fail(scope.resource_failure(
                            compartment,
                            health.load_balancer_id.as_deref(),
                            &e,
                        )),
                    }
                }
                if candidates.is_empty() {
                    continue;
                }

                let load_balancers = match scope.load_balancers(compartment).await {
                    Ok(lbs) => lbs,
                    Err(e) => {
                        out.fail(scope.compartment_failure(compartment, &e));
                        continue;
                    }
                };

                // Candidates missing from this listing were deleted in between.
                for lb in &load_balancers {
                    let id = match lb.id() {
                        Ok(id) => id,
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, None, &e));
                            continue;
                        }
                    };
                    let Some(status) = candidates.get(id) else {
                        continue;
                    };
                    let name = match lb.name() {
                        Ok(name) => name,
                        Err(e) => {
                            out.fail(scope.resource_failure(compartment, Some(id), &e));
                            continue;
                        }
                    };
                    out.push(
                        Recommendation::new(
                            Category::UnusedResource,
                            Suggestion::DeleteLoadBalancerNotActive,
                            ObjectType::LoadBalancer,
                            compartment,
                            id,
                            name,
                        )
                        .with_detail("Load Balancer Name", name)
                        .with_detail("Health Status", status.as_str()),
                    );
                }
            }
        }
        out
    }
}
