use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use reqwest::Certificate;
use reqwest::Client;
use tracing::debug;
use tracing::info;
use url::Url;

use super::credentials::Credentials;
use super::error::PrometheusError;
use super::types::QueryResponse;
use crate::domain::traits::MetricsSource;

/// Rate of time tasks spent waiting for a CPU, per node.
pub const PSI_CPU_QUERY: &str = "rate(node_pressure_cpu_waiting_seconds_total[1m])";

/// Instant-query client for the Prometheus HTTP API.
pub struct PrometheusClient {
    http: Client,
    query_url: Url,
    token: String,
    query: String,
}

impl PrometheusClient {
    /// # Errors
    ///
    /// - [`PrometheusError::Configuration`] for an unusable base URL, CA
    ///   bundle or HTTP client setup
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        query: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, Report<PrometheusError>> {
        let query_url = query_endpoint(base_url)?;

        let mut builder = Client::builder().timeout(request_timeout);
        if let Some(pem) = &credentials.ca_pem {
            let certificate =
                Certificate::from_pem(pem).change_context(PrometheusError::Configuration {
                    message: "Invalid CA bundle".into(),
                })?;
            builder = builder.add_root_certificate(certificate);
        }
        let http = builder
            .build()
            .change_context(PrometheusError::Configuration {
                message: "Failed to create HTTP client for Prometheus".into(),
            })?;

        info!(url = %query_url, "Prometheus client created");

        Ok(Self {
            http,
            query_url,
            token: credentials.token,
            query: query.into(),
        })
    }

    /// Runs an instant query and returns the raw response envelope.
    ///
    /// # Errors
    ///
    /// - [`PrometheusError::Network`] if the request cannot be sent
    /// - [`PrometheusError::Http`] for a non-success status
    /// - [`PrometheusError::Parse`] if the body is not a query response
    pub async fn instant_query(&self, query: &str) -> Result<QueryResponse, Report<PrometheusError>> {
        debug!(%query, "querying Prometheus");

        let response = self
            .http
            .get(self.query_url.clone())
            .bearer_auth(&self.token)
            .query(&[("query", query)])
            .send()
            .await
            .change_context(PrometheusError::Network {
                message: format!("Failed to reach {}", self.query_url),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Report::new(PrometheusError::Http {
                status: status.as_u16(),
                message: body,
            }));
        }

        response
            .json::<QueryResponse>()
            .await
            .change_context(PrometheusError::Parse {
                message: "Failed to decode query response".into(),
            })
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    type Error = PrometheusError;

    #[tracing::instrument(skip(self))]
    async fn cpu_pressure(&self) -> Result<HashMap<String, f64>, Report<PrometheusError>> {
        let values = self.instant_query(&self.query).await?.values_by_instance()?;
        debug!(samples = values.len(), "received cpu pressure samples");
        Ok(values)
    }
}

/// `<base>/api/v1/query`, keeping any path prefix of the base URL.
fn query_endpoint(base_url: &str) -> Result<Url, Report<PrometheusError>> {
    let mut url = Url::parse(base_url).change_context_lazy(|| PrometheusError::Configuration {
        message: format!("Invalid Prometheus URL {base_url}"),
    })?;

    url.path_segments_mut()
        .map_err(|()| {
            Report::new(PrometheusError::Configuration {
                message: format!("Prometheus URL {base_url} cannot be a base"),
            })
        })?
        .pop_if_empty()
        .extend(["api", "v1", "query"]);
    Ok(url)
}
