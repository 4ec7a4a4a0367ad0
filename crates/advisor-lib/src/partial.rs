//! Partial-success accumulation
//!
//! A run keeps going when one profile, compartment, or resource fails.
//! Every such failure is recorded as a [`UnitFailure`] next to the items
//! that were produced, and surfaced together at the end of the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::AdvisorError;
use crate::heuristics::HeuristicKind;
use crate::models::Recommendation;

/// The unit of work a failure aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureScope {
    Run,
    Profile,
    Compartment,
    Resource,
}

/// One failed unit of work.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
    pub scope: FailureScope,
    pub profile_id: Option<String>,
    pub heuristic: Option<HeuristicKind>,
    pub compartment_id: Option<String>,
    pub resource_id: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl UnitFailure {
    fn new(scope: FailureScope, message: String) -> Self {
        Self {
            scope,
            profile_id: None,
            heuristic: None,
            compartment_id: None,
            resource_id: None,
            message,
            occurred_at: Utc::now(),
        }
    }

    /// A failure that prevented the run from touching any profile.
    pub fn run(err: &AdvisorError) -> Self {
        Self::new(FailureScope::Run, err.to_string())
    }

    pub fn profile(profile_id: &str, err: &AdvisorError) -> Self {
        let mut failure = Self::new(FailureScope::Profile, err.to_string());
        failure.profile_id = Some(profile_id.to_string());
        failure
    }

    pub fn compartment(profile_id: &str, compartment_id: &str, err: &AdvisorError) -> Self {
        let mut failure = Self::new(FailureScope::Compartment, err.to_string());
        failure.profile_id = Some(profile_id.to_string());
        failure.compartment_id = Some(compartment_id.to_string());
        failure
    }

    /// A single record that could not be interpreted. `resource_id` is
    /// absent when the record lacked its own id.
    pub fn resource(
        profile_id: &str,
        compartment_id: &str,
        resource_id: Option<&str>,
        err: &AdvisorError,
    ) -> Self {
        let mut failure = Self::new(FailureScope::Resource, err.to_string());
        failure.profile_id = Some(profile_id.to_string());
        failure.compartment_id = Some(compartment_id.to_string());
        failure.resource_id = resource_id.map(str::to_string);
        failure
    }

    pub fn with_heuristic(mut self, kind: HeuristicKind) -> Self {
        self.heuristic = Some(kind);
        self
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(kind) = self.heuristic {
            parts.push(kind.as_str().to_string());
        }
        if let Some(profile) = &self.profile_id {
            parts.push(format!("profile {profile}"));
        }
        if let Some(compartment) = &self.compartment_id {
            parts.push(format!("compartment {compartment}"));
        }
        if let Some(resource) = &self.resource_id {
            parts.push(format!("resource {resource}"));
        }
        if parts.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", parts.join(" / "), self.message)
        }
    }
}

/// Items produced so far plus the failures met on the way.
#[derive(Debug, Clone)]
pub struct PartialResult<T> {
    pub items: Vec<T>,
    pub failures: Vec<UnitFailure>,
}

impl<T> Default for PartialResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> PartialResult<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn fail(&mut self, failure: UnitFailure) {
        self.failures.push(failure);
    }

    /// Appends another result's items and failures.
    pub fn merge(&mut self, other: PartialResult<T>) {
        self.items.extend(other.items);
        self.failures.extend(other.failures);
    }

    /// Moves failures from a result of another item type into this one,
    /// returning its items.
    pub fn absorb<U>(&mut self, other: PartialResult<U>) -> Vec<U> {
        self.failures.extend(other.failures);
        other.items
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Stamps every failure that has no heuristic yet.
    pub fn tag(mut self, kind: HeuristicKind) -> Self {
        for failure in &mut self.failures {
            failure.heuristic.get_or_insert(kind);
        }
        self
    }

    /// Splits into the produced items and an aggregate error, if any unit
    /// failed.
    pub fn into_parts(self) -> (Vec<T>, Option<RunError>) {
        let error = if self.failures.is_empty() {
            None
        } else {
            Some(RunError {
                failures: self.failures,
            })
        };
        (self.items, error)
    }
}

impl PartialResult<Recommendation> {
    /// Collapses duplicate findings, keeping the first occurrence.
    pub fn dedup(mut self) -> Self {
        let mut seen = HashSet::new();
        self.items.retain(|rec| {
            let (category, resource_id, name) = rec.identity();
            seen.insert((category, resource_id.to_string(), name.to_string()))
        });
        self
    }

    pub fn into_run_result(self) -> RunResult {
        let (recommendations, error) = self.dedup().into_parts();
        RunResult {
            recommendations,
            error,
        }
    }
}

/// Aggregate of every unit failure in a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    pub failures: Vec<UnitFailure>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unit(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunError {}

/// Outcome of a heuristic run: every recommendation that could be
/// produced, and the aggregate error when some units failed.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub recommendations: Vec<Recommendation>,
    pub error: Option<RunError>,
}

impl RunResult {
    pub fn failures(&self) -> &[UnitFailure] {
        self.error.as_ref().map(|e| e.failures.as_slice()).unwrap_or(&[])
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}
