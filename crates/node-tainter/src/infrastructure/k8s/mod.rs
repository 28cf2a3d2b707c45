//! Kubernetes integration module.
//!
//! The main components are:
//! - [`KubeNodeSource`]: lists worker nodes together with their psi taint
//! - [`KubeTaintExecutor`]: writes taint patches back to the nodes
//! - [`discover_prometheus_url`]: resolves the OpenShift Prometheus route

pub mod node_source;
pub mod route;
pub mod taint_executor;
pub mod types;

pub use node_source::KubeNodeSource;
pub use route::discover_prometheus_url;
pub use taint_executor::KubeTaintExecutor;
pub use types::KubernetesError;
