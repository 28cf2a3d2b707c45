use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Taint key written to nodes under CPU pressure.
pub const DEFAULT_TAINT_KEY: &str = "la-taint-psi-cpu";

/// Scheduling effect of a psi taint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum TaintEffect {
    /// Repels new pods (`NoSchedule`).
    #[display("NoSchedule")]
    #[serde(rename = "NoSchedule")]
    Hard,
    /// Discourages new pods (`PreferNoSchedule`).
    #[display("PreferNoSchedule")]
    #[serde(rename = "PreferNoSchedule")]
    Soft,
}

impl TaintEffect {
    /// Kubernetes spelling of the effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaintEffect::Hard => "NoSchedule",
            TaintEffect::Soft => "PreferNoSchedule",
        }
    }

    /// Maps a Kubernetes effect string. `NoExecute` and unknown effects
    /// have no psi counterpart and yield `None`.
    pub fn from_kubernetes(effect: &str) -> Option<Self> {
        match effect {
            "NoSchedule" => Some(TaintEffect::Hard),
            "PreferNoSchedule" => Some(TaintEffect::Soft),
            _ => None,
        }
    }
}

/// A node taint owned by the tainter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub effect: TaintEffect,
    pub value: String,
}

impl Taint {
    /// Builds a taint whose value mirrors its effect name.
    pub fn new(key: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            effect,
            value: effect.as_str().to_string(),
        }
    }

    pub fn hard(key: impl Into<String>) -> Self {
        Self::new(key, TaintEffect::Hard)
    }

    pub fn soft(key: impl Into<String>) -> Self {
        Self::new(key, TaintEffect::Soft)
    }
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.key, self.value, self.effect)
    }
}

/// Per-cycle view of a worker node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub existing_taint: Option<Taint>,
    /// CPU pressure in percent (0 to 100).
    pub cpu_pressure: f64,
    pub proposed_taint: Option<Taint>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, existing_taint: Option<Taint>, cpu_pressure: f64) -> Self {
        Self {
            name: name.into(),
            existing_taint,
            cpu_pressure,
            proposed_taint: None,
        }
    }
}

/// Ordered node collection. Names are unique; order is input order until
/// the planner ranks it.
pub type NodeSet = Vec<NodeRecord>;

/// Change required to move a node from its existing to its proposed taint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "taint", rename_all = "lowercase")]
pub enum PatchOperation {
    Add(Taint),
    /// Carries the taint currently on the node.
    Remove(Taint),
    /// Carries the replacement taint.
    Update(Taint),
}

impl PatchOperation {
    pub fn taint(&self) -> &Taint {
        match self {
            PatchOperation::Add(t) | PatchOperation::Remove(t) | PatchOperation::Update(t) => t,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PatchOperation::Add(_) => "add",
            PatchOperation::Remove(_) => "remove",
            PatchOperation::Update(_) => "update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub node_name: String,
    pub operation: PatchOperation,
}

impl Patch {
    pub fn new(node_name: impl Into<String>, operation: PatchOperation) -> Self {
        Self {
            node_name: node_name.into(),
            operation,
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {}",
            self.operation.kind(),
            self.operation.taint(),
            self.node_name
        )
    }
}
