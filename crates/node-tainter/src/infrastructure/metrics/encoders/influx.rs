use std::collections::HashMap;

use influxdb_line_protocol::LineProtocolBuilder;

use super::FieldValue;
use super::MetricsEncoder;

/// InfluxDB line protocol encoder. Tags and fields are written in key order.
pub struct InfluxEncoder;

impl MetricsEncoder for InfluxEncoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        let mut builder = LineProtocolBuilder::new().measurement(measurement);

        let mut tag_entries: Vec<_> = tags.iter().collect();
        tag_entries.sort_by_key(|(k, _)| *k);
        for (key, value) in tag_entries {
            builder = builder.tag(key, value);
        }

        let mut field_entries: Vec<_> = fields.iter().collect();
        field_entries.sort_by_key(|(k, _)| *k);

        let mut field_entries = field_entries.into_iter();
        // the builder only reaches its field state through a first field
        let Some((first_key, first_value)) = field_entries.next() else {
            let bytes = builder
                .field("_empty", true)
                .timestamp(timestamp)
                .close_line()
                .build();
            return String::from_utf8_lossy(&bytes).into_owned();
        };

        let mut line = match first_value {
            FieldValue::UnsignedInteger(u) => builder.field(first_key, *u),
            FieldValue::Float(f) => builder.field(first_key, *f),
        };
        for (key, value) in field_entries {
            line = match value {
                FieldValue::UnsignedInteger(u) => line.field(key, *u),
                FieldValue::Float(f) => line.field(key, *f),
            };
        }

        let bytes = line.timestamp(timestamp).close_line().build();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
