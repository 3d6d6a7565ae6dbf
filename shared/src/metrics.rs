//! Installs the process-wide metrics recorder.
//!
//! Sibling binaries in this codebase emit through the `metrics` facade crate
//! and export to StatsD; nothing here wraps the facade, it only wires up the
//! global recorder once at startup so `metrics::counter!`/`gauge!`/`histogram!`
//! calls elsewhere have somewhere to go.

use metrics_exporter_statsd::StatsdBuilder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("failed to build statsd recorder: {0}")]
    Build(String),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Installs a StatsD-backed recorder as the global `metrics` recorder.
///
/// Call at most once per process, before any `metrics::counter!`/`gauge!`/
/// `histogram!` call that should actually be exported. If `metrics` config is
/// absent, callers simply skip this and the macros remain no-ops.
pub fn install_statsd_recorder(host: &str, port: u16, prefix: &str) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(host, port)
        .build(Some(prefix))
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)
}

/// Registers the description of every metric in `defs` with the installed
/// recorder so downstream StatsD/Prometheus tooling can surface help text.
pub fn describe_all(defs: &[crate::metrics_defs::MetricDef]) {
    use crate::metrics_defs::MetricType;

    for def in defs {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Gauge => metrics::describe_gauge!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}
