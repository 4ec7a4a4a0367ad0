//! Volumes with no live attachment anywhere in the profile.

use async_trait::async_trait;
use std::collections::HashSet;

use super::{Heuristic, HeuristicKind, RunContext};
use crate::error::AdvisorError;
use crate::inventory::ProfileScope;
use crate::models::{BlockVolume, Category, Compartment, ObjectType, Recommendation, Suggestion};
use crate::partial::{PartialResult, UnitFailure};

pub struct UnusedVolume;

#[async_trait]
impl Heuristic for UnusedVolume {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::UnusedVolume
    }

    async fn evaluate(
        &self,
        _ctx: &RunContext<'_>,
        scopes: &[ProfileScope],
    ) -> PartialResult<Recommendation> {
        let mut out = PartialResult::new();

        for scope in scopes {
            // Attachments may cross compartments, so the difference is taken
            // over the whole profile.
            let mut volumes: Vec<(&Compartment, BlockVolume)> = Vec::new();
            let mut attached: HashSet<String> = HashSet::new();
            let mut attachments_complete = true;

            for compartment in &scope.compartments {
                match scope.volumes(compartment).await {
                    Ok(listed) => volumes.extend(listed.into_iter().map(|v| (compartment, v))),
                    Err(e) => out.fail(scope.compartment_failure(compartment, &e)),
                }

                match scope.volume_attachments(compartment).await {
                    Ok(attachments) => {
                        for attachment in attachments.iter().filter(|a| a.is_attached()) {
                            match attachment.volume_id() {
                                Ok(id) => {
                                    attached.insert(id.to_string());
                                }
                                Err(e) => {
                                    attachments_complete = false;
                                    out.fail(scope.resource_failure(
                                        compartment,
                                        attachment.id.as_deref(),
                                        &e,
                                    ));
                                }
                            }
                        }
                    }
                    Err(e) => {
                        attachments_complete = false;
                        out.fail(scope.compartment_failure(compartment, &e));
                    }
                }
            }

            // Without every attachment, any volume could be a false positive.
            if !attachments_complete {
                out.fail(UnitFailure::profile(
                    &scope.profile_id,
                    &AdvisorError::Inventory(
                        "volume attachments incomplete, unused volumes not evaluated".to_string(),
                    ),
                ));
                continue;
            }

            for (compartment, volume) in &volumes {
                let (id, name) = match volume.id().and_then(|id| Ok((id, volume.name()?))) {
                    Ok(v) => v,
                    Err(e) => {
                        out.fail(scope.resource_failure(compartment, volume.id.as_deref(), &e));
                        continue;
                    }
                };
                if attached.contains(id) {
                    continue;
                }
                let size = volume
                    .size_in_gbs
                    .map(|s| format!("{s} GB"))
                    .unwrap_or_else(|| "-".to_string());
                out.push(
                    Recommendation::new(
                        Category::UnusedStorage,
                        Suggestion::DeleteBlockStorageNotUsed,
                        ObjectType::BlockStorage,
                        compartment,
                        id,
                        name,
                    )
                    .with_detail("Block Storage Name", name)
                    .with_detail("Size", size)
                    .with_detail(
                        "VPU",
                        volume.vpus_per_gb.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                    )
                    .with_detail(
                        "Availability Domain",
                        volume.availability_domain.as_deref().unwrap_or("-"),
                    )
                    .with_detail("State", volume.lifecycle_state.as_deref().unwrap_or("-")),
                );
            }
        }
        out
    }
}
