//! Error types for the Prometheus metrics source.

use core::error::Error;

use derive_more::Display;

/// Errors that can occur while querying Prometheus.
#[derive(Debug, Display)]
pub enum PrometheusError {
    /// Client or endpoint configuration errors
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// Token or CA bundle could not be loaded
    #[display("Credentials error: {message}")]
    Credentials { message: String },

    /// Network connectivity issues
    #[display("Network error: {message}")]
    Network { message: String },

    /// Non-success HTTP status
    #[display("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Prometheus answered with an error status
    #[display("Query error: {message}")]
    Query { message: String },

    /// Response body did not have the expected shape
    #[display("Parse error: {message}")]
    Parse { message: String },
}

impl Error for PrometheusError {}
