use shared::{MetricDef, MetricType};

pub const CONFIG_REQUESTS: MetricDef = MetricDef {
    name: "confhub.config.requests",
    metric_type: MetricType::Counter,
    description: "Configuration lookups received",
};

pub const CONFIG_NOT_FOUND: MetricDef = MetricDef {
    name: "confhub.config.not_found",
    metric_type: MetricType::Counter,
    description: "Configuration lookups that resolved zero property sources",
};

pub const AUTH_FAILURES: MetricDef = MetricDef {
    name: "confhub.auth.failures",
    metric_type: MetricType::Counter,
    description: "Requests rejected by the bearer-token check",
};

pub const WEBHOOK_ACCEPTED: MetricDef = MetricDef {
    name: "confhub.webhook.accepted",
    metric_type: MetricType::Counter,
    description: "Webhook deliveries enqueued for synchronization",
};

pub const WEBHOOK_REJECTED: MetricDef = MetricDef {
    name: "confhub.webhook.rejected",
    metric_type: MetricType::Counter,
    description: "Webhook deliveries failing signature verification",
};

pub const QUEUE_FULL: MetricDef = MetricDef {
    name: "confhub.webhook.queue_full",
    metric_type: MetricType::Counter,
    description: "Webhook deliveries shed because the update queue was full",
};

pub const RATE_LIMITED: MetricDef = MetricDef {
    name: "confhub.http.rate_limited",
    metric_type: MetricType::Counter,
    description: "Requests rejected by the sliding-window limiter",
};

pub const SYNC_SUCCESSES: MetricDef = MetricDef {
    name: "confhub.sync.successes",
    metric_type: MetricType::Counter,
    description: "Branch pulls completed by the sync worker",
};

pub const SYNC_FAILURES: MetricDef = MetricDef {
    name: "confhub.sync.failures",
    metric_type: MetricType::Counter,
    description: "Branch pulls that failed in the sync worker",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "confhub.http.request_duration_seconds",
    metric_type: MetricType::Histogram,
    description: "Wall-clock time spent handling a request",
};

pub const ALL: [MetricDef; 10] = [
    CONFIG_REQUESTS,
    CONFIG_NOT_FOUND,
    AUTH_FAILURES,
    WEBHOOK_ACCEPTED,
    WEBHOOK_REJECTED,
    QUEUE_FULL,
    RATE_LIMITED,
    SYNC_SUCCESSES,
    SYNC_FAILURES,
    REQUEST_DURATION,
];
