//! Loads the immutable (Regions x ItemTypes) iteration plan the scheduler
//! sweeps forever. Both sequences are fetched once at startup; any failure
//! here is fatal since the scheduler has nothing to drive without them.

use crate::errors::BridgeError;
use crate::models::{ItemsPage, RegionLink, TypeItem};
use crate::upstream::UpstreamClient;

#[derive(Debug, Clone)]
pub struct Region {
    pub region_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ItemType {
    pub type_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub regions: Vec<Region>,
    pub item_types: Vec<ItemType>,
}

impl Catalog {
    pub async fn load(upstream: &UpstreamClient) -> Result<Self, BridgeError> {
        let regions = Self::load_regions(upstream).await?;
        let item_types = Self::load_item_types(upstream).await?;

        tracing::info!(
            regions = regions.len(),
            item_types = item_types.len(),
            "catalog loaded"
        );

        Ok(Self {
            regions,
            item_types,
        })
    }

    async fn load_regions(upstream: &UpstreamClient) -> Result<Vec<Region>, BridgeError> {
        let url = format!("{}/regions/", upstream.base_url);
        let page: ItemsPage<RegionLink> =
            upstream
                .get_json(&url)
                .await
                .map_err(|source| BridgeError::Catalog {
                    url: url.clone(),
                    source,
                })?;

        page.items
            .into_iter()
            .map(|item| {
                let region_id = first_integer_substring(&item.href).ok_or_else(|| {
                    BridgeError::RegionHrefMissingId {
                        href: item.href.clone(),
                    }
                })?;
                Ok(Region {
                    region_id,
                    name: item.name,
                })
            })
            .collect()
    }

    async fn load_item_types(upstream: &UpstreamClient) -> Result<Vec<ItemType>, BridgeError> {
        let mut url = format!("{}/market/types/", upstream.base_url);
        let mut item_types = Vec::new();

        loop {
            let page: ItemsPage<TypeItem> = upstream.get_json(&url).await.map_err(|source| {
                BridgeError::Catalog {
                    url: url.clone(),
                    source,
                }
            })?;

            item_types.extend(page.items.into_iter().map(|item| ItemType {
                type_id: item.item_type.id,
                name: item.item_type.name,
            }));

            match page.next {
                // The upstream signals "no more pages" by pointing `next`
                // back at the page that was just requested.
                Some(next) if next.href != url => url = next.href,
                _ => break,
            }
        }

        Ok(item_types)
    }
}

/// The region id embedded in a CREST `href` is its first run of ASCII digits
/// (e.g. `https://crest-tq.eveonline.com/regions/10000002/` -> `10000002`).
fn first_integer_substring(href: &str) -> Option<i64> {
    let digits: String = href
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
