//! Cloud resource advisor library
//!
//! This crate provides the core functionality for:
//! - Resolving cloud profiles and discovering their compartments
//! - Querying inventory and monitoring data through provider capabilities
//! - Running utilization heuristics that produce recommendations
//! - Reconciling database usage against an Ercole inventory
//! - Metrics and structured logging for each run

pub mod engine;
pub mod ercole;
pub mod error;
pub mod heuristics;
pub mod inventory;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod partial;
pub mod profiles;
pub mod provider;

pub use engine::{ProfileCompartment, RecommendationEngine};
pub use error::{AdvisorError, Result};
pub use heuristics::HeuristicKind;
pub use models::*;
pub use observability::{AdvisorMetrics, StructuredLogger};
pub use partial::{FailureScope, PartialResult, RunError, RunResult, UnitFailure};
