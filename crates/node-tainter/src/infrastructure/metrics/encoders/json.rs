use std::collections::HashMap;

use serde_json::json;
use serde_json::Number;
use serde_json::Value;

use super::FieldValue;
use super::MetricsEncoder;

/// One JSON object per line: `measure`, `ts`, `tag` and `field`.
pub struct JsonEncoder;

impl MetricsEncoder for JsonEncoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        let fields: serde_json::Map<String, Value> = fields
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    FieldValue::UnsignedInteger(u) => Value::Number(Number::from(*u)),
                    FieldValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
                };
                (k.clone(), value)
            })
            .collect();

        let line = json!({
            "measure": measurement,
            "ts": timestamp,
            "tag": tags,
            "field": fields,
        });
        line.to_string() + "\n"
    }
}
