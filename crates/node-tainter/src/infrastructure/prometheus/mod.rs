//! Prometheus metrics source.

pub mod client;
pub mod credentials;
pub mod error;
pub mod types;

pub use client::PrometheusClient;
pub use client::PSI_CPU_QUERY;
pub use credentials::CredentialPaths;
pub use credentials::Credentials;
pub use error::PrometheusError;
