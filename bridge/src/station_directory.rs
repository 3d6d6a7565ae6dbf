//! `stationID -> solarSystemID` lookup table.
//!
//! Populated once at startup from a tab-separated seed file and merged with
//! a one-shot XML fetch of the upstream's conquerable station list. Read-only
//! for the remainder of the process lifetime, so lookups never take a lock.

use crate::errors::{BridgeError, FetchError};
use crate::metrics_defs::STATION_DIRECTORY_SIZE;
use crate::upstream::UpstreamClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct StationDirectory {
    table: HashMap<i64, i64>,
}

impl StationDirectory {
    /// Returns the solar system for a station, or `0` (the "unknown system")
    /// sentinel if the station was never seen in the seed file or upstream.
    pub fn lookup(&self, station_id: i64) -> i64 {
        self.table.get(&station_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_table_for_test(table: HashMap<i64, i64>) -> Self {
        Self { table }
    }

    pub async fn load(
        seed_file_path: &Path,
        upstream: &UpstreamClient,
        conquerable_stations_url: &str,
    ) -> Result<Self, BridgeError> {
        let mut table = Self::parse_seed_file(seed_file_path)?;
        tracing::info!(entries = table.len(), "loaded station seed file");

        match Self::fetch_conquerable_stations(upstream, conquerable_stations_url).await {
            Ok(merged) => {
                tracing::info!(
                    entries = merged.len(),
                    "merged conquerable station list from upstream"
                );
                table.extend(merged);
            }
            Err(err) => {
                tracing::warn!(
                    %err,
                    "conquerable station fetch failed; continuing with seed-only directory"
                );
            }
        }

        metrics::gauge!(STATION_DIRECTORY_SIZE.name).set(table.len() as f64);
        Ok(Self { table })
    }

    fn parse_seed_file(path: &Path) -> Result<HashMap<i64, i64>, BridgeError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| BridgeError::SeedFileRead {
                path: path.to_path_buf(),
                source,
            })?;

        let mut table = HashMap::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let malformed = || BridgeError::SeedFileMalformed {
                path: path.to_path_buf(),
                line_no: idx + 1,
                row: line.to_string(),
            };

            let mut fields = line.splitn(2, '\t');
            let station_id: i64 = fields
                .next()
                .ok_or_else(malformed)?
                .parse()
                .map_err(|_| malformed())?;
            let solar_system_id: i64 = fields
                .next()
                .ok_or_else(malformed)?
                .parse()
                .map_err(|_| malformed())?;

            table.insert(station_id, solar_system_id);
        }

        Ok(table)
    }

    async fn fetch_conquerable_stations(
        upstream: &UpstreamClient,
        url: &str,
    ) -> Result<HashMap<i64, i64>, FetchError> {
        let xml = upstream.get_text(url).await?;
        let doc: ConquerableStationsDoc =
            quick_xml::de::from_str(&xml).map_err(|source| FetchError::Xml {
                url: url.to_string(),
                source,
            })?;

        Ok(doc
            .result
            .rowset
            .row
            .into_iter()
            .map(|row| (row.station_id, row.solar_system_id))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ConquerableStationsDoc {
    result: ResultElement,
}

#[derive(Debug, Deserialize)]
struct ResultElement {
    rowset: RowsetElement,
}

#[derive(Debug, Deserialize)]
struct RowsetElement {
    #[serde(default, rename = "row")]
    row: Vec<StationRow>,
}

#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "@stationID")]
    station_id: i64,
    #[serde(rename = "@solarSystemID")]
    solar_system_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_seed_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp seed file");
        file.write_all(contents.as_bytes())
            .expect("write seed file");
        file
    }

    #[test]
    fn parses_tab_separated_seed_rows() {
        let file = write_seed_file("60003760\t30000142\n60003761\t30000143\n");
        let table = StationDirectory::parse_seed_file(file.path()).expect("parse seed file");
        assert_eq!(table.get(&60003760), Some(&30000142));
        assert_eq!(table.get(&60003761), Some(&30000143));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let file = write_seed_file("60003760\t30000142\n\n\n60003761\t30000143\n");
        let table = StationDirectory::parse_seed_file(file.path()).expect("parse seed file");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn malformed_row_is_an_error() {
        let file = write_seed_file("60003760\tnot-a-number\n");
        let err = StationDirectory::parse_seed_file(file.path()).unwrap_err();
        assert!(matches!(err, BridgeError::SeedFileMalformed { .. }));
    }

    #[test]
    fn missing_seed_file_is_an_error() {
        let err = StationDirectory::parse_seed_file(Path::new("/nonexistent/seed.tsv"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::SeedFileRead { .. }));
    }

    #[test]
    fn unknown_station_resolves_to_zero() {
        let directory = StationDirectory {
            table: HashMap::from([(60003760, 30000142)]),
        };
        assert_eq!(directory.lookup(60003760), 30000142);
        assert_eq!(directory.lookup(99999999), 0);
    }

    #[tokio::test]
    async fn upstream_entries_override_seed_entries_on_conflict() {
        let server = wiremock::MockServer::start().await;
        let xml = r#"<result><rowset><row stationID="60003760" solarSystemID="30000999" /></rowset></result>"#;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/stations.xml"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(xml))
            .mount(&server)
            .await;

        let file = write_seed_file("60003760\t30000142\n");
        let upstream = UpstreamClient::new(server.uri());
        let directory = StationDirectory::load(
            file.path(),
            &upstream,
            &format!("{}/stations.xml", server.uri()),
        )
        .await
        .expect("load station directory");

        assert_eq!(directory.lookup(60003760), 30000999);
    }

    #[tokio::test]
    async fn xml_fetch_failure_is_non_fatal() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/stations.xml"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let file = write_seed_file("60003760\t30000142\n");
        let upstream = UpstreamClient::new(server.uri());
        let directory = StationDirectory::load(
            file.path(),
            &upstream,
            &format!("{}/stations.xml", server.uri()),
        )
        .await
        .expect("seed-only directory still loads");

        assert_eq!(directory.lookup(60003760), 30000142);
        assert_eq!(directory.len(), 1);
    }
}
