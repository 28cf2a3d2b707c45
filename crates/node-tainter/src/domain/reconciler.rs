//! One reconcile cycle: list nodes, read pressure, plan, patch.

use core::error::Error;
use std::collections::HashMap;
use std::time::Duration;

use error_stack::Report;
use error_stack::ResultExt;
use serde::Serialize;
use tokio::select;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::domain::taint::NodeRecord;
use crate::domain::taint::NodeSet;
use crate::domain::taint::Patch;
use crate::domain::taint::TaintPlan;
use crate::domain::taint::TaintPlanner;
use crate::domain::traits::ClusterNode;
use crate::domain::traits::MetricsSource;
use crate::domain::traits::NodeSource;
use crate::domain::traits::PatchExecutor;

/// Cycle-level failures. A cycle that hits one of these issues no patches.
#[derive(Debug, derive_more::Display)]
pub enum ReconcileError {
    #[display("Failed to list worker nodes")]
    NodeListing,
    #[display("Failed to query cpu pressure")]
    MetricsQuery,
    #[display("Failed to compute taint plan")]
    Planning,
}

impl Error for ReconcileError {}

/// Patch that could not be applied this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchFailure {
    pub patch: Patch,
    pub reason: String,
}

/// What a cycle planned and how applying it went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub plan: TaintPlan,
    pub applied: Vec<Patch>,
    pub failed: Vec<PatchFailure>,
}

/// Drives the planner with live cluster data.
pub struct TaintReconciler<N, M, E> {
    node_source: N,
    metrics_source: M,
    executor: E,
    planner: TaintPlanner,
}

impl<N, M, E> TaintReconciler<N, M, E>
where
    N: NodeSource,
    M: MetricsSource,
    E: PatchExecutor,
{
    pub fn new(node_source: N, metrics_source: M, executor: E, planner: TaintPlanner) -> Self {
        Self {
            node_source,
            metrics_source,
            executor,
            planner,
        }
    }

    /// Computes the plan for the current cluster state without applying it.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::NodeListing`] if the node source fails
    /// - [`ReconcileError::MetricsQuery`] if the metrics source fails
    /// - [`ReconcileError::Planning`] if the collected data is malformed
    pub async fn plan(&self) -> Result<TaintPlan, Report<ReconcileError>> {
        let cluster_nodes = self
            .node_source
            .list_worker_nodes()
            .await
            .change_context(ReconcileError::NodeListing)?;

        let ratios = self
            .metrics_source
            .cpu_pressure()
            .await
            .change_context(ReconcileError::MetricsQuery)?;

        let nodes = build_node_set(cluster_nodes, &ratios);
        debug!(?nodes, "collected worker nodes");

        self.planner
            .plan(nodes)
            .change_context(ReconcileError::Planning)
    }

    /// Runs one full cycle. Patch failures are collected in the report and
    /// never abort the remaining patches.
    ///
    /// # Errors
    ///
    /// Same as [`TaintReconciler::plan`].
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_once(&self) -> Result<CycleReport, Report<ReconcileError>> {
        let plan = self.plan().await?;
        let mut applied = Vec::with_capacity(plan.patches.len());
        let mut failed = Vec::new();

        for patch in &plan.patches {
            match self.executor.apply(patch).await {
                Ok(()) => {
                    info!(node = %patch.node_name, op = patch.operation.kind(), "applied taint patch");
                    applied.push(patch.clone());
                }
                Err(e) => {
                    warn!(node = %patch.node_name, "failed to apply {patch}, retrying next cycle: {e:?}");
                    failed.push(PatchFailure {
                        patch: patch.clone(),
                        reason: e.current_context().to_string(),
                    });
                }
            }
        }

        Ok(CycleReport {
            plan,
            applied,
            failed,
        })
    }

    /// Reconciles every `period` until the token is cancelled. Each finished
    /// cycle is handed to `on_report`.
    pub async fn run<F>(&self, period: Duration, token: CancellationToken, mut on_report: F)
    where
        F: FnMut(&CycleReport) + Send,
    {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            select! {
                biased;
                _ = token.cancelled() => {
                    info!("Taint reconciler shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    match self.reconcile_once().await {
                        Ok(report) => {
                            info!(
                                hard = report.plan.counts.hard,
                                soft = report.plan.counts.soft,
                                applied = report.applied.len(),
                                failed = report.failed.len(),
                                "reconcile cycle finished"
                            );
                            on_report(&report);
                        }
                        Err(e) => {
                            error!("Reconcile cycle failed: {e:?}");
                        }
                    }
                }
            }
        }
    }
}

/// Joins listed nodes with their pressure samples. Ratios become percent;
/// nodes without a sample count as idle. Samples for unknown nodes are dropped.
fn build_node_set(cluster_nodes: Vec<ClusterNode>, ratios: &HashMap<String, f64>) -> NodeSet {
    for instance in ratios.keys() {
        if !cluster_nodes.iter().any(|n| &n.name == instance) {
            debug!(%instance, "ignoring pressure sample for non-worker instance");
        }
    }

    cluster_nodes
        .into_iter()
        .map(|node| {
            let ratio = ratios.get(&node.name).copied().unwrap_or_else(|| {
                debug!(node = %node.name, "no pressure sample, assuming idle");
                0.0
            });
            NodeRecord::new(node.name, node.existing_taint, ratio * 100.0)
        })
        .collect()
}
