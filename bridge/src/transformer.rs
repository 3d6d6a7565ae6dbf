//! Converts a raw upstream history/orders payload into a UUDIF envelope.
//!
//! Rows are positional tuples of mixed scalar types; `RowValue` keeps that
//! dynamism contained to this module instead of leaking `serde_json::Value`
//! into the rest of the pipeline.

use crate::models::{HistoryItem, OrderItem};
use crate::station_directory::StationDirectory;
use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const ENVELOPE_VERSION: &str = "0.1";
const HISTORY_COLUMNS: [&str; 6] = ["date", "orders", "quantity", "low", "high", "average"];
const ORDER_COLUMNS: [&str; 11] = [
    "price",
    "volRemaining",
    "range",
    "orderID",
    "volEntered",
    "minVolume",
    "bid",
    "issueDate",
    "duration",
    "stationID",
    "solarSystemID",
];

#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Serialize for RowValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValue::Str(s) => serializer.serialize_str(s),
            RowValue::Int(i) => serializer.serialize_i64(*i),
            RowValue::Float(f) => serializer.serialize_f64(*f),
            RowValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Generator {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct UploadKey {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct Rowset {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    #[serde(rename = "regionID")]
    pub region_id: i64,
    #[serde(rename = "typeID")]
    pub type_id: i64,
    pub rows: Vec<Vec<RowValue>>,
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    #[serde(rename = "resultType")]
    pub result_type: &'static str,
    pub version: &'static str,
    #[serde(rename = "uploadKeys")]
    pub upload_keys: Vec<UploadKey>,
    pub generator: Generator,
    pub columns: Vec<&'static str>,
    #[serde(rename = "currentTime")]
    pub current_time: String,
    pub rowsets: Vec<Rowset>,
}

/// The operator identity baked into every envelope's header.
#[derive(Debug, Clone)]
pub struct GeneratorIdentity {
    pub name: String,
    pub version: String,
    pub upload_key: String,
}

pub struct Transformer<'a> {
    station_directory: &'a StationDirectory,
    identity: &'a GeneratorIdentity,
}

impl<'a> Transformer<'a> {
    pub fn new(station_directory: &'a StationDirectory, identity: &'a GeneratorIdentity) -> Self {
        Self {
            station_directory,
            identity,
        }
    }

    pub fn transform_history(
        &self,
        region_id: i64,
        type_id: i64,
        items: &[HistoryItem],
    ) -> Envelope {
        let rows = items
            .iter()
            .map(|item| {
                vec![
                    RowValue::Str(format!("{}+00:00", item.date)),
                    RowValue::Int(item.order_count),
                    RowValue::Int(item.volume),
                    RowValue::Float(item.low_price),
                    RowValue::Float(item.high_price),
                    RowValue::Float(item.avg_price),
                ]
            })
            .collect();

        self.envelope("history", &HISTORY_COLUMNS, region_id, type_id, rows)
    }

    pub fn transform_orders(&self, region_id: i64, type_id: i64, items: &[OrderItem]) -> Envelope {
        let rows = items
            .iter()
            .map(|item| {
                let solar_system_id = self.station_directory.lookup(item.location.id);
                vec![
                    RowValue::Float(item.price),
                    RowValue::Int(item.volume),
                    RowValue::Int(encode_range(&item.range)),
                    RowValue::Int(item.id),
                    RowValue::Int(item.volume_entered),
                    RowValue::Int(item.min_volume),
                    RowValue::Bool(item.buy),
                    RowValue::Str(format!("{}+00:00", item.issued)),
                    RowValue::Int(item.duration),
                    RowValue::Int(item.location.id),
                    RowValue::Int(solar_system_id),
                ]
            })
            .collect();

        self.envelope("orders", &ORDER_COLUMNS, region_id, type_id, rows)
    }

    fn envelope(
        &self,
        result_type: &'static str,
        columns: &[&'static str],
        region_id: i64,
        type_id: i64,
        rows: Vec<Vec<RowValue>>,
    ) -> Envelope {
        let now = now_rfc3339();

        Envelope {
            result_type,
            version: ENVELOPE_VERSION,
            upload_keys: vec![UploadKey {
                name: self.identity.name.clone(),
                key: self.identity.upload_key.clone(),
            }],
            generator: Generator {
                name: self.identity.name.clone(),
                version: self.identity.version.clone(),
            },
            columns: columns.to_vec(),
            current_time: now.clone(),
            rowsets: vec![Rowset {
                generated_at: now,
                region_id,
                type_id,
                rows,
            }],
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting of the current time never fails")
}

/// Total function mapping an order's textual range to its numeric encoding.
pub fn encode_range(range: &str) -> i64 {
    match range {
        "station" => -1,
        "solarsystem" => 0,
        "region" => 32767,
        other => other.parse::<i64>().unwrap_or(0),
    }
}
