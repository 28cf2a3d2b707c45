use std::cmp::Ordering;
use std::collections::HashSet;

use error_stack::Report;
use serde::Serialize;
use tracing::debug;

use super::error::PlanError;
use super::policy::TaintPolicy;
use super::quota;
use super::types::NodeRecord;
use super::types::NodeSet;
use super::types::Patch;
use super::types::PatchOperation;
use super::types::Taint;
use super::types::TaintEffect;

/// Number of proposed taints per effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaintCounts {
    pub hard: usize,
    pub soft: usize,
}

/// Outcome of one planning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaintPlan {
    /// Nodes in rank order with their proposed taints.
    pub nodes: NodeSet,
    /// Patches in rank order; nodes that need no change are absent.
    pub patches: Vec<Patch>,
    pub counts: TaintCounts,
}

/// Decides which worker nodes carry a psi taint.
#[derive(Debug, Clone)]
pub struct TaintPlanner {
    policy: TaintPolicy,
}

impl TaintPlanner {
    /// # Errors
    ///
    /// - [`PlanError::InvalidPolicy`] if the policy does not validate
    pub fn new(policy: TaintPolicy) -> Result<Self, Report<PlanError>> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// Ranks, assigns and diffs `nodes`.
    ///
    /// # Errors
    ///
    /// - [`PlanError::InvalidInput`] for duplicate node names or a pressure
    ///   that is NaN, infinite or negative
    #[tracing::instrument(skip_all, fields(nodes = nodes.len()))]
    pub fn plan(&self, mut nodes: NodeSet) -> Result<TaintPlan, Report<PlanError>> {
        validate_nodes(&nodes)?;

        rank(&mut nodes);
        let counts = self.assign(&mut nodes);
        let patches = diff(&nodes);

        debug!(
            hard = counts.hard,
            soft = counts.soft,
            patches = patches.len(),
            "taint plan computed"
        );

        Ok(TaintPlan {
            nodes,
            patches,
            counts,
        })
    }

    /// Greedy assignment over nodes that are already ranked.
    ///
    /// The walk stops at the first node that qualifies for neither effect;
    /// lower ranked nodes are not looked at and keep no proposed taint. It
    /// also stops as soon as the hard or the soft quota is used up.
    pub fn assign(&self, nodes: &mut [NodeRecord]) -> TaintCounts {
        let total = nodes.len();
        let ratio = self.policy.max_taint_ratio;
        let max_hard = quota::max_hard_taints(total, ratio);
        let mut max_soft = quota::max_soft_taints(total, 0, ratio);
        let mut counts = TaintCounts::default();

        for node in nodes.iter_mut() {
            node.proposed_taint = None;
        }

        for node in nodes.iter_mut() {
            if node.cpu_pressure >= self.policy.hard_threshold && counts.hard < max_hard {
                node.proposed_taint = Some(self.taint(TaintEffect::Hard));
                counts.hard += 1;
                max_soft = quota::max_soft_taints(total, counts.hard, ratio);
                debug!(node = %node.name, pressure = node.cpu_pressure, "proposing hard taint");
                if counts.hard >= max_hard {
                    break;
                }
            } else if node.cpu_pressure >= self.policy.soft_threshold && counts.soft < max_soft {
                node.proposed_taint = Some(self.taint(TaintEffect::Soft));
                counts.soft += 1;
                debug!(node = %node.name, pressure = node.cpu_pressure, "proposing soft taint");
                if counts.soft >= max_soft {
                    break;
                }
            } else {
                debug!(
                    node = %node.name,
                    pressure = node.cpu_pressure,
                    "node does not qualify, remaining nodes stay untainted"
                );
                break;
            }
        }

        counts
    }

    fn taint(&self, effect: TaintEffect) -> Taint {
        Taint::new(self.policy.taint_key.as_str(), effect)
    }
}

/// Stable sort by pressure, highest first. Equal pressures keep input order.
pub fn rank(nodes: &mut [NodeRecord]) {
    nodes.sort_by(|a, b| {
        b.cpu_pressure
            .partial_cmp(&a.cpu_pressure)
            .unwrap_or(Ordering::Equal)
    });
}

/// Patches that move every node from its existing to its proposed taint.
pub fn diff(nodes: &[NodeRecord]) -> Vec<Patch> {
    nodes
        .iter()
        .filter_map(|node| {
            operation_for(node.existing_taint.as_ref(), node.proposed_taint.as_ref())
                .map(|operation| Patch::new(node.name.as_str(), operation))
        })
        .collect()
}

fn operation_for(existing: Option<&Taint>, proposed: Option<&Taint>) -> Option<PatchOperation> {
    match (existing, proposed) {
        (None, None) => None,
        (None, Some(proposed)) => Some(PatchOperation::Add(proposed.clone())),
        (Some(existing), None) => Some(PatchOperation::Remove(existing.clone())),
        (Some(existing), Some(proposed)) if existing.effect == proposed.effect => None,
        (Some(_), Some(proposed)) => Some(PatchOperation::Update(proposed.clone())),
    }
}

fn validate_nodes(nodes: &[NodeRecord]) -> Result<(), Report<PlanError>> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.name.as_str()) {
            return Err(Report::new(PlanError::InvalidInput {
                message: format!("duplicate node name {}", node.name),
            }));
        }
        if !node.cpu_pressure.is_finite() || node.cpu_pressure < 0.0 {
            return Err(Report::new(PlanError::InvalidInput {
                message: format!(
                    "node {} has invalid cpu pressure {}",
                    node.name, node.cpu_pressure
                ),
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::domain::taint::types::DEFAULT_TAINT_KEY;

    fn planner() -> TaintPlanner {
        TaintPlanner::new(TaintPolicy::default()).expect("default policy is valid")
    }

    fn node(name: &str, existing: Option<TaintEffect>, pressure: f64) -> NodeRecord {
        NodeRecord::new(
            name,
            existing.map(|effect| Taint::new(DEFAULT_TAINT_KEY, effect)),
            pressure,
        )
    }

    fn proposed(plan: &TaintPlan, name: &str) -> Option<TaintEffect> {
        plan.nodes
            .iter()
            .find(|n| n.name == name)
            .expect("node should be in plan")
            .proposed_taint
            .as_ref()
            .map(|t| t.effect)
    }

    #[test]
    fn remove_hard_taint() {
        let plan = planner()
            .plan(vec![
                node("worker-0", Some(TaintEffect::Hard), 56.1),
                node("worker-1", Some(TaintEffect::Hard), 46.0),
                node("worker-2", None, 18.2),
            ])
            .expect("should plan");

        assert_eq!(proposed(&plan, "worker-0"), Some(TaintEffect::Hard));
        assert_eq!(proposed(&plan, "worker-1"), None);
        assert_eq!(proposed(&plan, "worker-2"), None);
        assert_eq!(
            plan.patches,
            vec![Patch::new(
                "worker-1",
                PatchOperation::Remove(Taint::hard(DEFAULT_TAINT_KEY))
            )]
        );
    }

    #[test]
    fn add_hard_taint() {
        let plan = planner()
            .plan(vec![
                node("worker-0", None, 56.1),
                node("worker-1", None, 46.0),
                node("worker-2", None, 18.2),
            ])
            .expect("should plan");

        assert_eq!(proposed(&plan, "worker-0"), Some(TaintEffect::Hard));
        assert_eq!(proposed(&plan, "worker-1"), None);
        assert_eq!(proposed(&plan, "worker-2"), None);
        assert_eq!(plan.counts, TaintCounts { hard: 1, soft: 0 });
        assert_eq!(
            plan.patches,
            vec![Patch::new(
                "worker-0",
                PatchOperation::Add(Taint::hard(DEFAULT_TAINT_KEY))
            )]
        );
    }

    #[test]
    fn add_soft_taint() {
        let plan = planner()
            .plan(vec![
                node("worker-0", None, 36.1),
                node("worker-1", None, 25.0),
                node("worker-2", None, 0.2),
            ])
            .expect("should plan");

        assert_eq!(proposed(&plan, "worker-0"), Some(TaintEffect::Soft));
        assert_eq!(proposed(&plan, "worker-1"), None);
        assert_eq!(proposed(&plan, "worker-2"), None);
        assert_eq!(plan.counts, TaintCounts { hard: 0, soft: 1 });
    }

    #[test]
    fn swap_hard_taint() {
        let plan = planner()
            .plan(vec![
                node("worker-0", None, 36.1),
                node("worker-1", Some(TaintEffect::Hard), 25.0),
                node("worker-2", None, 0.2),
            ])
            .expect("should plan");

        assert_eq!(proposed(&plan, "worker-0"), Some(TaintEffect::Soft));
        assert_eq!(proposed(&plan, "worker-1"), None);
        assert_eq!(
            plan.patches,
            vec![
                Patch::new("worker-0", PatchOperation::Add(Taint::soft(DEFAULT_TAINT_KEY))),
                Patch::new(
                    "worker-1",
                    PatchOperation::Remove(Taint::hard(DEFAULT_TAINT_KEY))
                ),
            ]
        );
    }

    #[test]
    fn remove_all_taints() {
        let plan = planner()
            .plan(vec![
                node("worker-0", None, 1.1),
                node("worker-1", None, 2.0),
                node("worker-2", None, 3.2),
            ])
            .expect("should plan");

        let order: Vec<&str> = plan.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["worker-2", "worker-1", "worker-0"]);
        assert!(plan.nodes.iter().all(|n| n.proposed_taint.is_none()));
        assert!(plan.patches.is_empty());
    }

    #[test]
    fn update_when_effect_changes() {
        let plan = planner()
            .plan(vec![
                node("worker-0", Some(TaintEffect::Soft), 70.0),
                node("worker-1", None, 10.0),
            ])
            .expect("should plan");

        assert_eq!(
            plan.patches,
            vec![Patch::new(
                "worker-0",
                PatchOperation::Update(Taint::hard(DEFAULT_TAINT_KEY))
            )]
        );
    }

    #[test]
    fn same_effect_with_other_value_is_noop() {
        let existing = Taint {
            key: DEFAULT_TAINT_KEY.to_string(),
            effect: TaintEffect::Hard,
            value: "set-by-hand".to_string(),
        };
        let plan = planner()
            .plan(vec![
                NodeRecord::new("worker-0", Some(existing), 90.0),
                node("worker-1", None, 0.0),
            ])
            .expect("should plan");

        assert!(plan.patches.is_empty());
    }

    #[test]
    fn walk_stops_at_first_unqualified_node() {
        // 10 nodes, quota 5. worker-2 sits below the soft threshold, so
        // the nodes ranked after it stay untainted.
        let mut nodes = vec![
            node("worker-0", None, 80.0),
            node("worker-1", None, 30.0),
            node("worker-2", None, 19.9),
        ];
        for i in 3..10 {
            nodes.push(node(&format!("worker-{i}"), None, 1.0));
        }

        let plan = planner().plan(nodes).expect("should plan");

        assert_eq!(plan.counts, TaintCounts { hard: 1, soft: 1 });
        let first_none = plan
            .nodes
            .iter()
            .position(|n| n.proposed_taint.is_none())
            .expect("some node stays untainted");
        assert!(plan.nodes[first_none..]
            .iter()
            .all(|n| n.proposed_taint.is_none()));
    }

    #[test]
    fn assign_does_not_look_past_unqualified_node() {
        let mut nodes = vec![
            node("worker-0", None, 10.0),
            node("worker-1", None, 80.0),
            node("worker-2", None, 30.0),
            node("worker-3", None, 30.0),
        ];

        let counts = planner().assign(&mut nodes);

        assert_eq!(counts, TaintCounts::default());
        assert!(nodes.iter().all(|n| n.proposed_taint.is_none()));
    }

    #[test]
    fn hard_quota_exhaustion_stops_walk() {
        // 4 nodes, hard quota 2: the third hot node gets nothing even though
        // soft quota would be 0 anyway after two hard taints.
        let plan = planner()
            .plan(vec![
                node("a", None, 90.0),
                node("b", None, 80.0),
                node("c", None, 70.0),
                node("d", None, 60.0),
            ])
            .expect("should plan");

        assert_eq!(plan.counts, TaintCounts { hard: 2, soft: 0 });
        assert_eq!(proposed(&plan, "c"), None);
        assert_eq!(proposed(&plan, "d"), None);
    }

    #[test]
    fn soft_quota_shrinks_after_hard_assignment() {
        // 6 nodes, quota 3: one hard leaves room for two soft.
        let plan = planner()
            .plan(vec![
                node("a", None, 55.0),
                node("b", None, 45.0),
                node("c", None, 35.0),
                node("d", None, 25.0),
                node("e", None, 5.0),
                node("f", None, 5.0),
            ])
            .expect("should plan");

        assert_eq!(plan.counts, TaintCounts { hard: 1, soft: 2 });
        assert_eq!(proposed(&plan, "a"), Some(TaintEffect::Hard));
        assert_eq!(proposed(&plan, "b"), Some(TaintEffect::Soft));
        assert_eq!(proposed(&plan, "c"), Some(TaintEffect::Soft));
        assert_eq!(proposed(&plan, "d"), None);
    }

    #[test]
    fn single_node_never_tainted() {
        let plan = planner()
            .plan(vec![node("only", Some(TaintEffect::Soft), 99.0)])
            .expect("should plan");

        assert_eq!(proposed(&plan, "only"), None);
        assert_eq!(
            plan.patches,
            vec![Patch::new(
                "only",
                PatchOperation::Remove(Taint::soft(DEFAULT_TAINT_KEY))
            )]
        );
    }

    #[test]
    fn empty_node_set() {
        let plan = planner().plan(Vec::new()).expect("should plan");
        assert!(plan.nodes.is_empty());
        assert!(plan.patches.is_empty());
        assert_eq!(plan.counts, TaintCounts::default());
    }

    #[test]
    fn equal_pressure_keeps_input_order() {
        let mut nodes = vec![
            node("c", None, 10.0),
            node("a", None, 42.0),
            node("b", None, 42.0),
            node("d", None, 42.0),
        ];
        rank(&mut nodes);

        let order: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn planning_is_idempotent() {
        let input = vec![
            node("worker-0", Some(TaintEffect::Soft), 63.0),
            node("worker-1", None, 21.0),
            node("worker-2", Some(TaintEffect::Hard), 22.0),
            node("worker-3", None, 48.0),
        ];

        let first = planner().plan(input.clone()).expect("should plan");
        let second = planner().plan(input).expect("should plan");
        assert_eq!(first, second);

        // feeding the ranked output back in yields the same proposal too
        let again = planner().plan(first.nodes.clone()).expect("should plan");
        assert_eq!(again.nodes, first.nodes);
    }

    #[test]
    fn previous_proposals_are_discarded() {
        let mut stale = node("worker-0", None, 1.0);
        stale.proposed_taint = Some(Taint::hard(DEFAULT_TAINT_KEY));

        let plan = planner()
            .plan(vec![stale, node("worker-1", None, 2.0)])
            .expect("should plan");

        assert!(plan.nodes.iter().all(|n| n.proposed_taint.is_none()));
    }

    #[test]
    fn rejects_invalid_pressure() {
        for pressure in [f64::NAN, f64::INFINITY, -1.0] {
            let err = planner()
                .plan(vec![node("worker-0", None, pressure)])
                .expect_err("invalid pressure should be rejected");
            assert!(matches!(
                err.current_context(),
                PlanError::InvalidInput { .. }
            ));
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = planner()
            .plan(vec![node("worker-0", None, 1.0), node("worker-0", None, 2.0)])
            .expect_err("duplicate names should be rejected");
        assert!(err.to_string().contains("duplicate node name worker-0"));
    }

    #[test]
    fn custom_policy_thresholds() {
        let planner = TaintPlanner::new(TaintPolicy {
            taint_key: "example.com/pressure".to_string(),
            hard_threshold: 90.0,
            soft_threshold: 40.0,
            max_taint_ratio: 1.0,
        })
        .expect("policy is valid");

        let plan = planner
            .plan(vec![node("a", None, 95.0), node("b", None, 60.0), node("c", None, 39.0)])
            .expect("should plan");

        assert_eq!(plan.counts, TaintCounts { hard: 1, soft: 1 });
        assert_eq!(
            plan.nodes[0].proposed_taint,
            Some(Taint::hard("example.com/pressure"))
        );
    }
}
