//! Heuristic runs

use advisor_lib::{HeuristicKind, Recommendation, RecommendationEngine, RunResult};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;
use tabled::Tabled;

use super::exit_code;
use crate::output::{
    color_category, print_failures, print_info, print_records, short_id, OutputFormat,
};

/// What `run` evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    One(HeuristicKind),
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            return Ok(Target::All);
        }
        s.parse().map(Target::One).map_err(|_| {
            let known: Vec<_> = HeuristicKind::ALL.iter().map(|k| k.as_str()).collect();
            anyhow!("unknown heuristic {s:?}; expected all or one of: {}", known.join(", "))
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::All => f.write_str("all"),
            Target::One(kind) => f.write_str(kind.as_str()),
        }
    }
}

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Suggestion")]
    suggestion: String,
    #[tabled(rename = "Compartment")]
    compartment: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(rec: &Recommendation) -> Self {
        Self {
            category: color_category(rec.category),
            suggestion: rec.suggestion.to_string(),
            compartment: rec.compartment_name.clone(),
            name: rec.name.clone(),
            resource: short_id(&rec.resource_id),
            details: rec
                .details
                .iter()
                .map(|d| format!("{}: {}", d.name, d.value))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    recommendations: &'a [Recommendation],
    failures: &'a [advisor_lib::UnitFailure],
}

/// Run a heuristic, or all of them, and print the results
pub async fn run(
    engine: &RecommendationEngine,
    target: Target,
    profiles: &[String],
    format: OutputFormat,
) -> Result<ExitCode> {
    let result: RunResult = match target {
        Target::All => engine.run_all(profiles).await,
        Target::One(kind) => engine.run(kind, profiles).await,
    };

    let rows: Vec<RecommendationRow> =
        result.recommendations.iter().map(RecommendationRow::from).collect();
    let report = RunReport {
        recommendations: &result.recommendations,
        failures: result.failures(),
    };
    print_records(rows, &report, format)?;

    if matches!(format, OutputFormat::Table) {
        print_info(&format!(
            "{} recommendation(s) from {target}",
            result.recommendations.len()
        ));
        print_failures(result.failures());
    }

    Ok(exit_code(result.is_complete()))
}
