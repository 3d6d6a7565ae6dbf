use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: anything that should abort the process at startup.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read station seed file {path}: {source}")]
    SeedFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed seed file row {line_no} in {path}: {row:?}")]
    SeedFileMalformed {
        path: PathBuf,
        line_no: usize,
        row: String,
    },

    #[error("failed to load catalog from {url}: {source}")]
    Catalog {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("region href carries no numeric id: {href}")]
    RegionHrefMissingId { href: String },

    #[error("admin http server failed: {0}")]
    Admin(#[source] std::io::Error),
}

/// Per-tuple fetch failures: logged and swallowed by the scheduler, never
/// propagated past the task that observed them.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("malformed xml payload from {url}: {source}")]
    Xml {
        url: String,
        #[source]
        source: quick_xml::de::DeError,
    },
}

/// Per-envelope transform failures: logged and swallowed by the scheduler.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Union of the two failure modes a dispatched fetch task can hit before it
/// ever reaches the post permit stage.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Per-envelope post failures: logged by the poster pool, envelope dropped.
#[derive(Error, Debug)]
pub enum PostError {
    #[error("transport error posting to sink: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sink returned {status}: {body_prefix}")]
    NonSuccess {
        status: reqwest::StatusCode,
        body_prefix: String,
    },
}
