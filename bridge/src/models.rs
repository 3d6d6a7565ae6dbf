//! Raw upstream wire shapes. These mirror the upstream JSON payloads
//! directly; the processed, pipeline-internal types (`catalog::Region`,
//! `transformer::RowValue`, ...) are kept separate from these.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ItemsPage<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<NextLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextLink {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionLink {
    pub href: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeItem {
    #[serde(rename = "type")]
    pub item_type: TypeRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub date: String,
    #[serde(rename = "orderCount")]
    pub order_count: i64,
    pub volume: i64,
    #[serde(rename = "lowPrice")]
    pub low_price: f64,
    #[serde(rename = "highPrice")]
    pub high_price: f64,
    #[serde(rename = "avgPrice")]
    pub avg_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub buy: bool,
    pub issued: String,
    pub price: f64,
    #[serde(rename = "volumeEntered")]
    pub volume_entered: i64,
    #[serde(rename = "minVolume")]
    pub min_volume: i64,
    pub volume: i64,
    pub duration: i64,
    pub range: String,
    pub location: LocationRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRef {
    pub id: i64,
}
