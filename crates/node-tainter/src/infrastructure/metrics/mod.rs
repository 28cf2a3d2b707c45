//! Plan metrics, written as lines on the `metrics` tracing target.

use std::collections::HashMap;

use chrono::Utc;

use crate::domain::reconciler::CycleReport;
use crate::domain::taint::TaintPlan;

pub mod encoders;

use encoders::FieldValue;
use encoders::MetricsEncoder;

pub const PLAN_MEASUREMENT: &str = "taint_plan";
pub const CYCLE_MEASUREMENT: &str = "taint_cycle";

/// One `taint_plan` line per node that ends up tainted, in rank order.
pub fn encode_plan(encoder: &dyn MetricsEncoder, plan: &TaintPlan, timestamp: i64) -> Vec<String> {
    plan.nodes
        .iter()
        .enumerate()
        .filter_map(|(rank, node)| {
            let taint = node.proposed_taint.as_ref()?;
            let tags = HashMap::from([
                ("node".to_string(), node.name.clone()),
                ("effect".to_string(), taint.effect.to_string()),
            ]);
            let fields = HashMap::from([
                ("pressure".to_string(), FieldValue::from(node.cpu_pressure)),
                ("rank".to_string(), FieldValue::from(rank)),
            ]);
            Some(encoder.encode_metrics(PLAN_MEASUREMENT, &tags, &fields, timestamp))
        })
        .collect()
}

pub fn encode_cycle(encoder: &dyn MetricsEncoder, report: &CycleReport, timestamp: i64) -> String {
    let fields = HashMap::from([
        ("nodes".to_string(), FieldValue::from(report.plan.nodes.len())),
        ("hard".to_string(), FieldValue::from(report.plan.counts.hard)),
        ("soft".to_string(), FieldValue::from(report.plan.counts.soft)),
        ("patches".to_string(), FieldValue::from(report.plan.patches.len())),
        ("applied".to_string(), FieldValue::from(report.applied.len())),
        ("failed".to_string(), FieldValue::from(report.failed.len())),
    ]);
    encoder.encode_metrics(CYCLE_MEASUREMENT, &HashMap::new(), &fields, timestamp)
}

/// Writes every line for `report` to the metrics target.
pub fn record_cycle(encoder: &dyn MetricsEncoder, report: &CycleReport) {
    let timestamp = current_time();
    for line in encode_plan(encoder, &report.plan, timestamp) {
        tracing::info!(target: "metrics", msg = %line);
    }
    let line = encode_cycle(encoder, report, timestamp);
    tracing::info!(target: "metrics", msg = %line);
}

/// Milliseconds since the unix epoch.
pub fn current_time() -> i64 {
    Utc::now().timestamp_millis()
}
