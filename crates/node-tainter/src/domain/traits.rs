//! Seams between the reconciler and the outside world.

use std::collections::HashMap;

use async_trait::async_trait;
use error_stack::Context;
use error_stack::Report;

use crate::domain::taint::Patch;
use crate::domain::taint::Taint;

/// Worker node as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNode {
    pub name: String,
    /// Taint carrying the tainter's key, if the node has one.
    pub existing_taint: Option<Taint>,
}

/// Lists the worker nodes eligible for psi taints.
#[async_trait]
pub trait NodeSource: Send + Sync {
    type Error: Context;

    async fn list_worker_nodes(&self) -> Result<Vec<ClusterNode>, Report<Self::Error>>;
}

/// Supplies the CPU pressure ratio (0.0 to 1.0) per node name.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    type Error: Context;

    async fn cpu_pressure(&self) -> Result<HashMap<String, f64>, Report<Self::Error>>;
}

/// Applies a single taint patch to the cluster.
#[async_trait]
pub trait PatchExecutor: Send + Sync {
    type Error: Context;

    async fn apply(&self, patch: &Patch) -> Result<(), Report<Self::Error>>;
}
