use shared::metrics_defs::{MetricDef, MetricType};

pub const FETCHES_STARTED: MetricDef = MetricDef {
    name: "bridge_fetches_started_total",
    metric_type: MetricType::Counter,
    description: "Upstream GETs initiated by the fetch scheduler",
};

pub const FETCH_ERRORS: MetricDef = MetricDef {
    name: "bridge_fetch_errors_total",
    metric_type: MetricType::Counter,
    description: "Upstream GETs that returned a non-200 status or a transport error",
};

pub const TRANSFORM_ERRORS: MetricDef = MetricDef {
    name: "bridge_transform_errors_total",
    metric_type: MetricType::Counter,
    description: "Envelopes dropped because serialization failed",
};

pub const SWEEPS_COMPLETED: MetricDef = MetricDef {
    name: "bridge_sweeps_completed_total",
    metric_type: MetricType::Counter,
    description: "Full Regions x ItemTypes sweeps completed by the fetch scheduler",
};

pub const STATION_DIRECTORY_SIZE: MetricDef = MetricDef {
    name: "bridge_station_directory_size",
    metric_type: MetricType::Gauge,
    description: "Number of stationID -> solarSystemID entries held by the station directory",
};

pub const POSTS_SUCCEEDED: MetricDef = MetricDef {
    name: "bridge_posts_succeeded_total",
    metric_type: MetricType::Counter,
    description: "Envelopes successfully POSTed to the sink",
};

pub const POST_ERRORS: MetricDef = MetricDef {
    name: "bridge_post_errors_total",
    metric_type: MetricType::Counter,
    description: "Envelopes dropped because the sink POST failed or returned non-200",
};

pub const POST_LATENCY: MetricDef = MetricDef {
    name: "bridge_post_latency_ms",
    metric_type: MetricType::Histogram,
    description: "Wall-clock time spent POSTing an envelope to the sink",
};

pub const ALL_METRICS: &[MetricDef] = &[
    FETCHES_STARTED,
    FETCH_ERRORS,
    TRANSFORM_ERRORS,
    SWEEPS_COMPLETED,
    STATION_DIRECTORY_SIZE,
    POSTS_SUCCEEDED,
    POST_ERRORS,
    POST_LATENCY,
];
