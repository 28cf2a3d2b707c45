use core::error::Error;

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to list nodes: {message}")]
    ListFailed { message: String },
    #[display("Failed to patch node {node_name}: {message}")]
    PatchFailed { node_name: String, message: String },
    #[display("Route {name} not usable in namespace {namespace}: {message}")]
    RouteNotFound {
        name: String,
        namespace: String,
        message: String,
    },
}

impl Error for KubernetesError {}
