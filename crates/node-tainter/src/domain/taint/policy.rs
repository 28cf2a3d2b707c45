use error_stack::Report;
use serde::Serialize;

use super::error::PlanError;
use super::quota::DEFAULT_MAX_TAINT_RATIO;
use super::types::DEFAULT_TAINT_KEY;

/// Pressure (percent) at or above which a node qualifies for a hard taint.
pub const DEFAULT_HARD_THRESHOLD: f64 = 50.0;
/// Pressure (percent) at or above which a node qualifies for a soft taint.
pub const DEFAULT_SOFT_THRESHOLD: f64 = 20.0;

/// Tunables of the taint decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaintPolicy {
    pub taint_key: String,
    pub hard_threshold: f64,
    pub soft_threshold: f64,
    pub max_taint_ratio: f64,
}

impl Default for TaintPolicy {
    fn default() -> Self {
        Self {
            taint_key: DEFAULT_TAINT_KEY.to_string(),
            hard_threshold: DEFAULT_HARD_THRESHOLD,
            soft_threshold: DEFAULT_SOFT_THRESHOLD,
            max_taint_ratio: DEFAULT_MAX_TAINT_RATIO,
        }
    }
}

impl TaintPolicy {
    /// Checks the policy before any plan is computed with it.
    ///
    /// # Errors
    ///
    /// - [`PlanError::InvalidPolicy`] for an empty key, non-finite or negative
    ///   thresholds, a soft threshold above the hard one, or a ratio outside `[0, 1]`
    pub fn validate(&self) -> Result<(), Report<PlanError>> {
        let invalid = |message: String| Err(Report::new(PlanError::InvalidPolicy { message }));

        if self.taint_key.trim().is_empty() {
            return invalid("taint key must not be empty".to_string());
        }
        for (name, value) in [
            ("hard threshold", self.hard_threshold),
            ("soft threshold", self.soft_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a finite percentage, got {value}"));
            }
        }
        if self.soft_threshold > self.hard_threshold {
            return invalid(format!(
                "soft threshold {} exceeds hard threshold {}",
                self.soft_threshold, self.hard_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.max_taint_ratio) {
            return invalid(format!(
                "max taint ratio must be within [0, 1], got {}",
                self.max_taint_ratio
            ));
        }
        Ok(())
    }
}
