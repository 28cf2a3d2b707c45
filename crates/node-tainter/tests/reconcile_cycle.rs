use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use error_stack::Report;
use node_tainter::reconciler::TaintReconciler;
use node_tainter::taint::Patch;
use node_tainter::taint::PatchOperation;
use node_tainter::taint::Taint;
use node_tainter::taint::TaintEffect;
use node_tainter::taint::TaintPlanner;
use node_tainter::taint::TaintPolicy;
use node_tainter::taint::DEFAULT_TAINT_KEY;
use node_tainter::traits::ClusterNode;
use node_tainter::traits::MetricsSource;
use node_tainter::traits::NodeSource;
use node_tainter::traits::PatchExecutor;
use similar_asserts::assert_eq;

#[derive(Debug, derive_more::Display)]
#[display("in-memory cluster error")]
struct ClusterError;

impl core::error::Error for ClusterError {}

/// Worker nodes whose taints change as patches are applied.
#[derive(Clone)]
struct InMemoryCluster {
    nodes: Arc<Mutex<Vec<(String, Option<Taint>)>>>,
}

impl InMemoryCluster {
    fn new(nodes: &[(&str, Option<TaintEffect>)]) -> Self {
        let nodes = nodes
            .iter()
            .map(|(name, effect)| {
                (
                    name.to_string(),
                    effect.map(|e| Taint::new(DEFAULT_TAINT_KEY, e)),
                )
            })
            .collect();
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
        }
    }

    fn taint_of(&self, name: &str) -> Option<TaintEffect> {
        let nodes = self.nodes.lock().expect("lock");
        nodes
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, t)| t.as_ref().map(|t| t.effect))
    }
}

#[async_trait]
impl NodeSource for InMemoryCluster {
    type Error = ClusterError;

    async fn list_worker_nodes(&self) -> Result<Vec<ClusterNode>, Report<ClusterError>> {
        let nodes = self.nodes.lock().expect("lock");
        Ok(nodes
            .iter()
            .map(|(name, taint)| ClusterNode {
                name: name.clone(),
                existing_taint: taint.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl PatchExecutor for InMemoryCluster {
    type Error = ClusterError;

    async fn apply(&self, patch: &Patch) -> Result<(), Report<ClusterError>> {
        let mut nodes = self.nodes.lock().expect("lock");
        let (_, taint) = nodes
            .iter_mut()
            .find(|(name, _)| *name == patch.node_name)
            .ok_or_else(|| Report::new(ClusterError))?;
        *taint = match &patch.operation {
            PatchOperation::Add(t) | PatchOperation::Update(t) => Some(t.clone()),
            PatchOperation::Remove(_) => None,
        };
        Ok(())
    }
}

struct FixedPressure(HashMap<String, f64>);

#[async_trait]
impl MetricsSource for FixedPressure {
    type Error = ClusterError;

    async fn cpu_pressure(&self) -> Result<HashMap<String, f64>, Report<ClusterError>> {
        Ok(self.0.clone())
    }
}

fn pressure(samples: &[(&str, f64)]) -> FixedPressure {
    FixedPressure(
        samples
            .iter()
            .map(|(name, ratio)| (name.to_string(), *ratio))
            .collect(),
    )
}

#[test_log::test(tokio::test)]
async fn cluster_converges_after_one_cycle() {
    let cluster = InMemoryCluster::new(&[
        ("worker-0", None),
        ("worker-1", None),
        ("worker-2", None),
        ("worker-3", Some(TaintEffect::Soft)),
        ("worker-4", Some(TaintEffect::Hard)),
        ("worker-5", None),
    ]);
    let metrics = pressure(&[
        ("worker-0", 0.72),
        ("worker-1", 0.55),
        ("worker-2", 0.40),
        ("worker-3", 0.25),
        ("worker-4", 0.05),
        ("master-0", 0.99),
    ]);
    let planner = TaintPlanner::new(TaintPolicy::default()).expect("default policy");
    let reconciler = TaintReconciler::new(cluster.clone(), metrics, cluster.clone(), planner);

    let first = reconciler.reconcile_once().await.expect("first cycle");

    let ops: Vec<(&str, &str)> = first
        .applied
        .iter()
        .map(|p| (p.node_name.as_str(), p.operation.kind()))
        .collect();
    assert_eq!(
        ops,
        vec![
            ("worker-0", "add"),
            ("worker-1", "add"),
            ("worker-2", "add"),
            ("worker-3", "remove"),
            ("worker-4", "remove"),
        ]
    );
    assert!(first.failed.is_empty());
    assert_eq!(cluster.taint_of("worker-0"), Some(TaintEffect::Hard));
    assert_eq!(cluster.taint_of("worker-1"), Some(TaintEffect::Hard));
    assert_eq!(cluster.taint_of("worker-2"), Some(TaintEffect::Soft));
    assert_eq!(cluster.taint_of("worker-3"), None);
    assert_eq!(cluster.taint_of("worker-4"), None);
    assert_eq!(cluster.taint_of("worker-5"), None);

    let second = reconciler.reconcile_once().await.expect("second cycle");
    assert!(second.plan.patches.is_empty(), "{:?}", second.plan.patches);
    assert_eq!(second.plan.counts, first.plan.counts);
}

#[test_log::test(tokio::test)]
async fn plan_serializes_for_the_cli() {
    let cluster = InMemoryCluster::new(&[("worker-0", None), ("worker-1", None)]);
    let metrics = pressure(&[("worker-1", 0.61)]);
    let planner = TaintPlanner::new(TaintPolicy::default()).expect("default policy");
    let reconciler = TaintReconciler::new(cluster.clone(), metrics, cluster.clone(), planner);

    let plan = reconciler.plan().await.expect("plan");
    let json = serde_json::to_value(&plan).expect("serializable plan");

    assert_eq!(json["counts"], serde_json::json!({ "hard": 1, "soft": 0 }));
    assert_eq!(json["nodes"][0]["name"], "worker-1");
    assert_eq!(
        json["patches"],
        serde_json::json!([{
            "node_name": "worker-1",
            "operation": {
                "op": "add",
                "taint": { "key": DEFAULT_TAINT_KEY, "effect": "NoSchedule", "value": "NoSchedule" }
            }
        }])
    );
    assert_eq!(cluster.taint_of("worker-1"), None);
}
