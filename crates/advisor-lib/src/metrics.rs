//! Time-windowed metric queries against the monitoring service

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AdvisorError, Result};
use crate::provider::MetricsQuerier;

pub const COMPUTE_HEALTH_NAMESPACE: &str = "oci_compute_infrastructure_health";
pub const COMPUTE_AGENT_NAMESPACE: &str = "oci_computeagent";
pub const BLOCK_STORE_NAMESPACE: &str = "oci_blockstore";

/// Dimension that names the resource a stream belongs to.
pub const RESOURCE_ID_DIMENSION: &str = "resourceId";
/// Metadata key carrying the unit of a stream's values.
pub const UNIT_METADATA: &str = "unit";

/// A query expression and how far back it looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricQuery {
    pub namespace: &'static str,
    pub query: &'static str,
    pub window_days: i64,
}

impl MetricQuery {
    pub const fn new(namespace: &'static str, query: &'static str, window_days: i64) -> Self {
        Self {
            namespace,
            query,
            window_days,
        }
    }
}

/// Body of a summarize call. The compartment travels as a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    #[serde(skip)]
    pub compartment_id: String,
    pub namespace: String,
    pub query: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
}

/// One resource's datapoints for a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStream {
    pub name: Option<String>,
    pub namespace: Option<String>,
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub aggregated_datapoints: Vec<Datapoint>,
}

impl MetricStream {
    pub fn resource_id(&self) -> Result<&str> {
        self.dimensions
            .get(RESOURCE_ID_DIMENSION)
            .map(String::as_str)
            .ok_or(AdvisorError::MissingField {
                kind: "MetricStream",
                field: "resourceId",
            })
    }

    pub fn unit(&self) -> Option<&str> {
        self.metadata.get(UNIT_METADATA).map(String::as_str)
    }

    pub fn values(&self) -> Result<Vec<f64>> {
        self.aggregated_datapoints
            .iter()
            .map(|dp| {
                dp.value.ok_or(AdvisorError::MissingField {
                    kind: "Datapoint",
                    field: "value",
                })
            })
            .collect()
    }

    /// Number of datapoints whose value is exactly `target`.
    pub fn count_equal(&self, target: f64) -> Result<usize> {
        Ok(self
            .values()?
            .into_iter()
            .filter(|v| (v - target).abs() < f64::EPSILON)
            .count())
    }

    /// Largest datapoint value. A stream without datapoints is a fault.
    pub fn max_value(&self) -> Result<f64> {
        self.values()?
            .into_iter()
            .reduce(f64::max)
            .ok_or(AdvisorError::MissingField {
                kind: "MetricStream",
                field: "aggregatedDatapoints",
            })
    }
}

/// All streams returned for one query over one compartment.
#[derive(Debug, Clone)]
pub struct MetricSeries {
    pub query: MetricQuery,
    pub compartment_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub streams: Vec<MetricStream>,
}

/// Resolves query windows against a fixed "now" and forwards them to the
/// monitoring backend.
pub struct MetricsClient<'a, Q: MetricsQuerier + ?Sized> {
    querier: &'a Q,
    now: DateTime<Utc>,
}

impl<'a, Q: MetricsQuerier + ?Sized> MetricsClient<'a, Q> {
    pub fn new(querier: &'a Q, now: DateTime<Utc>) -> Self {
        Self { querier, now }
    }

    pub fn request(&self, compartment_id: &str, query: &MetricQuery) -> SummarizeRequest {
        SummarizeRequest {
            compartment_id: compartment_id.to_string(),
            namespace: query.namespace.to_string(),
            query: query.query.to_string(),
            start_time: self.now - Duration::days(query.window_days),
            end_time: self.now,
        }
    }

    pub async fn summarize(&self, compartment_id: &str, query: &MetricQuery) -> Result<MetricSeries> {
        let request = self.request(compartment_id, query);
        tracing::debug!(
            compartment_id = %compartment_id,
            namespace = %query.namespace,
            query = %query.query,
            window_days = query.window_days,
            "Summarizing metrics"
        );
        let streams = self.querier.summarize_metrics(&request).await?;
        Ok(MetricSeries {
            query: *query,
            compartment_id: request.compartment_id,
            window_start: request.start_time,
            window_end: request.end_time,
            streams,
        })
    }
}
