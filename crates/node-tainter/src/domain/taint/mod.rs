//! Taint decision core.
//!
//! Ranks worker nodes by CPU pressure, hands out hard and soft taints within
//! the cluster-wide quota and diffs the outcome against the taints already on
//! the nodes. Everything here is synchronous and free of I/O.

pub mod error;
pub mod planner;
pub mod policy;
pub mod quota;
pub mod types;

pub use error::PlanError;
pub use planner::diff;
pub use planner::rank;
pub use planner::TaintCounts;
pub use planner::TaintPlan;
pub use planner::TaintPlanner;
pub use policy::TaintPolicy;
pub use types::NodeRecord;
pub use types::NodeSet;
pub use types::Patch;
pub use types::PatchOperation;
pub use types::Taint;
pub use types::TaintEffect;
pub use types::DEFAULT_TAINT_KEY;
