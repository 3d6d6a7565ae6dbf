use crate::errors::BridgeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration, deserialized once at startup from the YAML file
/// named by `--config-file-path`. Never mutated afterward; components get
/// owned clones of the sub-sections they need.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub poster: PosterConfig,
    pub station_directory: StationDirectoryConfig,
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub conquerable_stations_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SinkConfig {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_fetch_in_flight: usize,
    pub fetch_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_fetch_in_flight: 25,
            fetch_interval_ms: 33,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    pub pool_size: usize,
    pub stagger_ms: u64,
}

impl Default for PosterConfig {
    fn default() -> Self {
        PosterConfig {
            pool_size: 11,
            stagger_ms: 500,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StationDirectoryConfig {
    pub seed_file_path: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneratorConfig {
    pub name: String,
    pub version: String,
    pub upload_key: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub rust_log_default: String,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, BridgeError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;

        serde_yaml::from_str(&contents).map_err(|source| BridgeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_optional_sections() {
        let yaml = r#"
upstream:
  base_url: "https://crest-tq.eveonline.com"
  conquerable_stations_url: "https://api.eveonline.com/eve/ConquerableStationList.xml.aspx"
sink:
  url: "https://upload.example.com/upload/"
station_directory:
  seed_file_path: "/etc/bridge/stations.tsv"
generator:
  name: "bridge"
  version: "0.1"
  upload_key: "secret"
metrics: null
logging: null
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("valid config");
        assert_eq!(config.scheduler.max_fetch_in_flight, 25);
        assert_eq!(config.scheduler.fetch_interval_ms, 33);
        assert_eq!(config.poster.pool_size, 11);
        assert_eq!(config.poster.stagger_ms, 500);
        assert_eq!(config.admin.host, "0.0.0.0");
        assert_eq!(config.admin.port, 8090);
        assert!(config.metrics.is_none());
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let yaml = r#"
sink:
  url: "https://upload.example.com/upload/"
"#;
        let result: Result<Config, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
