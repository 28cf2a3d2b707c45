use std::collections::HashMap;

pub mod influx;
pub mod json;

/// Field value of a metrics line.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum FieldValue {
    UnsignedInteger(u64),
    Float(f64),
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::UnsignedInteger(value as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// Renders one measurement as a single output line.
pub trait MetricsEncoder: Send + Sync {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String;
}

/// `json` selects the JSON encoder, anything else influx line protocol.
pub fn create_encoder(format: &str) -> Box<dyn MetricsEncoder + Send + Sync> {
    match format.to_lowercase().as_str() {
        "json" => Box::new(json::JsonEncoder),
        _ => Box::new(influx::InfluxEncoder),
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn sample() -> (HashMap<String, String>, HashMap<String, FieldValue>) {
        let tags = HashMap::from([("node".to_string(), "worker-1".to_string())]);
        let fields = HashMap::from([("pressure".to_string(), FieldValue::from(61.5))]);
        (tags, fields)
    }

    #[test]
    fn json_format_is_case_insensitive() {
        let (tags, fields) = sample();
        let line = create_encoder("JSON").encode_metrics("taint_plan", &tags, &fields, 7);

        assert!(line.starts_with('{'), "{line}");
    }

    #[test]
    fn unknown_format_falls_back_to_influx() {
        let (tags, fields) = sample();
        let line = create_encoder("prometheus").encode_metrics("taint_plan", &tags, &fields, 7);

        assert!(line.starts_with("taint_plan,node=worker-1 pressure=61.5"), "{line}");
    }

    #[test]
    fn usize_counts_are_unsigned() {
        assert_eq!(FieldValue::from(3usize), FieldValue::UnsignedInteger(3));
    }
}
