//! Prometheus HTTP API response shapes.

use std::collections::HashMap;

use error_stack::Report;
use serde::Deserialize;
use tracing::debug;

use super::error::PrometheusError;

/// Label identifying the node a PSI sample belongs to.
pub const INSTANCE_LABEL: &str = "instance";

/// Envelope of `/api/v1/query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<VectorSample>,
}

/// One element of an instant vector: labels plus `[timestamp, "value"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

impl QueryResponse {
    /// Sample values keyed by their `instance` label.
    ///
    /// Samples without the label are skipped. Non-finite values such as
    /// `NaN` are kept so the planner rejects the cycle.
    ///
    /// # Errors
    ///
    /// - [`PrometheusError::Query`] if Prometheus reported an error
    /// - [`PrometheusError::Parse`] for a non-vector result or a non-numeric value
    pub fn values_by_instance(self) -> Result<HashMap<String, f64>, Report<PrometheusError>> {
        if self.status != "success" {
            return Err(Report::new(PrometheusError::Query {
                message: format!(
                    "{}: {}",
                    self.error_type.as_deref().unwrap_or("unknown"),
                    self.error.as_deref().unwrap_or("no error message")
                ),
            }));
        }

        let data = self.data.ok_or_else(|| {
            Report::new(PrometheusError::Parse {
                message: "successful response without data".to_string(),
            })
        })?;
        if data.result_type != "vector" {
            return Err(Report::new(PrometheusError::Parse {
                message: format!("expected vector result, got {}", data.result_type),
            }));
        }

        let mut values = HashMap::with_capacity(data.result.len());
        for sample in data.result {
            let Some(instance) = sample.metric.get(INSTANCE_LABEL) else {
                debug!(labels = ?sample.metric, "sample without instance label");
                continue;
            };
            let value: f64 = sample.value.1.parse().map_err(|e| {
                Report::new(PrometheusError::Parse {
                    message: format!("value {:?} for {instance}: {e}", sample.value.1),
                })
            })?;
            values.insert(instance.clone(), value);
        }
        Ok(values)
    }
}
