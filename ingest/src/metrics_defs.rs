//! Metric definitions for the reply pipeline.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REPLY_WRITTEN: MetricDef = MetricDef {
    name: "replies.written",
    metric_type: MetricType::Counter,
    description: "Replies upserted into the record store",
};

pub const REPLY_FILTERED: MetricDef = MetricDef {
    name: "replies.filtered",
    metric_type: MetricType::Counter,
    description: "Replies dropped by bounce filters",
};

pub const REPLY_UNROUTABLE: MetricDef = MetricDef {
    name: "replies.unroutable",
    metric_type: MetricType::Counter,
    description: "Replies with no resolvable destination",
};

pub const REPLY_FAILED: MetricDef = MetricDef {
    name: "replies.failed",
    metric_type: MetricType::Counter,
    description: "Replies whose record-store write exhausted retries",
};

pub const NOTIFY_FAILED: MetricDef = MetricDef {
    name: "notify.failed",
    metric_type: MetricType::Counter,
    description: "Downstream notifications that failed after bounded retries",
};

pub const RETRY_ATTEMPTED: MetricDef = MetricDef {
    name: "retry.attempted",
    metric_type: MetricType::Counter,
    description: "Error-log entries an operator attempted to replay",
};

pub const RETRY_SUCCEEDED: MetricDef = MetricDef {
    name: "retry.succeeded",
    metric_type: MetricType::Counter,
    description: "Error-log entries replayed successfully and deleted",
};

pub const ALL: &[MetricDef] = &[
    REPLY_WRITTEN,
    REPLY_FILTERED,
    REPLY_UNROUTABLE,
    REPLY_FAILED,
    NOTIFY_FAILED,
    RETRY_ATTEMPTED,
    RETRY_SUCCEEDED,
];
