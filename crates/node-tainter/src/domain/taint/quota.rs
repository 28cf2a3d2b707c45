//! Cluster-wide taint quotas.

/// Default share of worker nodes that may carry a psi taint at once.
pub const DEFAULT_MAX_TAINT_RATIO: f64 = 0.5;

/// Absorbs binary rounding of ratios such as `0.29 * 100`.
const RATIO_EPSILON: f64 = 1e-9;

/// Total number of tainted nodes allowed for `node_count` workers.
pub fn max_taints(node_count: usize, ratio: f64) -> usize {
    (node_count as f64 * ratio + RATIO_EPSILON).floor() as usize
}

/// Maximum number of hard taints: `floor(node_count * ratio)`.
pub fn max_hard_taints(node_count: usize, ratio: f64) -> usize {
    max_taints(node_count, ratio)
}

/// Soft quota left once `hard_assigned` hard taints are handed out.
pub fn max_soft_taints(node_count: usize, hard_assigned: usize, ratio: f64) -> usize {
    max_taints(node_count, ratio).saturating_sub(hard_assigned)
}
