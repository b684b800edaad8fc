use shared::metrics_defs::{MetricDef, MetricType};

pub const PUBLISH_OUTCOMES: MetricDef = MetricDef {
    name: "relay.publish",
    metric_type: MetricType::Counter,
    description: "Publish attempts. Tagged with outcome (success/failure).",
};

pub const AUDIT_WRITE_FAILURES: MetricDef = MetricDef {
    name: "relay.audit.write_failures",
    metric_type: MetricType::Counter,
    description: "Batched audit appends that failed and were dropped.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "relay.request.duration",
    metric_type: MetricType::Histogram,
    description: "Send-request duration in seconds. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[PUBLISH_OUTCOMES, AUDIT_WRITE_FAILURES, REQUEST_DURATION];

/// Register a description for every metric this crate emits.
pub fn describe_all() {
    for def in ALL_METRICS {
        def.describe();
    }
}
