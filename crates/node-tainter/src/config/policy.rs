use serde::Deserialize;
use serde::Deserializer;

use crate::domain::taint::TaintPolicy;

/// Taint policy overrides passed as one JSON document. Every key is
/// optional; numbers may be JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub taint_key: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub hard_threshold: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub soft_threshold: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub max_taint_ratio: Option<f64>,
}

impl PolicyConfig {
    pub fn apply_to(&self, policy: &mut TaintPolicy) {
        if let Some(key) = &self.taint_key {
            policy.taint_key.clone_from(key);
        }
        if let Some(hard) = self.hard_threshold {
            policy.hard_threshold = hard;
        }
        if let Some(soft) = self.soft_threshold {
            policy.soft_threshold = soft;
        }
        if let Some(ratio) = self.max_taint_ratio {
            policy.max_taint_ratio = ratio;
        }
    }
}

fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    match Option::<StringOrFloat>::deserialize(deserializer)? {
        Some(StringOrFloat::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|e| {
            serde::de::Error::custom(format!("Failed to parse float from string '{s}': {e}"))
        }),
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        None => Ok(None),
    }
}

/// Parse JSON string into a [`PolicyConfig`].
pub fn parse_policy_config(s: &str) -> Result<PolicyConfig, String> {
    serde_json::from_str(s).map_err(|e| format!("Failed to parse taint policy JSON: {e}"))
}
