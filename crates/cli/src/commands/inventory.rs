//! Compartment listing and resource counts

use advisor_lib::{ObjectCount, PartialResult, ProfileCompartment, RecommendationEngine};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::process::ExitCode;
use tabled::Tabled;

use super::exit_code;
use crate::output::{print_failures, print_records, short_id, OutputFormat};

/// Row for compartments table
#[derive(Tabled)]
struct CompartmentRow {
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
}

/// Row for the per-profile summary table
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Object Type")]
    object_type: String,
    #[tabled(rename = "Count")]
    count: usize,
}

#[derive(Serialize)]
struct Report<'a, T> {
    items: &'a [T],
    failures: &'a [advisor_lib::UnitFailure],
}

fn finish<R: Tabled, T: Serialize>(
    rows: Vec<R>,
    result: &PartialResult<T>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let report = Report {
        items: &result.items,
        failures: &result.failures,
    };
    print_records(rows, &report, format)?;
    if matches!(format, OutputFormat::Table) {
        print_failures(&result.failures);
    }
    Ok(exit_code(result.is_complete()))
}

/// List compartments for the given profiles
pub async fn compartments(
    engine: &RecommendationEngine,
    profiles: &[String],
    format: OutputFormat,
) -> Result<ExitCode> {
    let result: PartialResult<ProfileCompartment> = engine.list_compartments(profiles).await;
    let rows: Vec<CompartmentRow> = result
        .items
        .iter()
        .map(|c| CompartmentRow {
            profile: c.profile_id.clone(),
            name: c.compartment.name.clone(),
            id: short_id(&c.compartment.id),
            created: c
                .compartment
                .created_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    finish(rows, &result, format)
}

/// Totals per (profile, object type), ordered by profile
fn totals(counts: &[ObjectCount]) -> BTreeMap<(String, String), usize> {
    let mut totals = BTreeMap::new();
    for count in counts {
        *totals
            .entry((count.profile_id.clone(), count.object_type.to_string()))
            .or_insert(0) += count.count;
    }
    totals
}

/// Count resources for the given profiles
pub async fn summary(
    engine: &RecommendationEngine,
    profiles: &[String],
    format: OutputFormat,
) -> Result<ExitCode> {
    let result: PartialResult<ObjectCount> = engine.object_summary(profiles).await;
    let rows: Vec<SummaryRow> = totals(&result.items)
        .into_iter()
        .map(|((profile, object_type), count)| SummaryRow {
            profile,
            object_type,
            count,
        })
        .collect();
    finish(rows, &result, format)
}
