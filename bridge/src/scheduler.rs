//! Paces upstream GETs and fans the results out through the transformer into
//! the envelope channel, under the two-stage fetch/post permit scheme
//! described at the module boundary of this crate.

use crate::catalog::Catalog;
use crate::errors::{FetchError, TaskError, TransformError};
use crate::metrics_defs::{FETCHES_STARTED, FETCH_ERRORS, SWEEPS_COMPLETED, TRANSFORM_ERRORS};
use crate::models::{HistoryItem, ItemsPage, OrderItem};
use crate::station_directory::StationDirectory;
use crate::transformer::{GeneratorIdentity, Transformer};
use crate::upstream::UpstreamClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    History,
    Buy,
    Sell,
}

impl TaskKind {
    fn as_str(self) -> &'static str {
        match self {
            TaskKind::History => "history",
            TaskKind::Buy => "buy",
            TaskKind::Sell => "sell",
        }
    }
}

const TASK_KINDS: [TaskKind; 3] = [TaskKind::History, TaskKind::Buy, TaskKind::Sell];

/// Drives the `Regions x ItemTypes` sweep forever, dispatching one task per
/// (region, type, kind) triple under the rate gate and the fetch/post
/// permit pools.
pub struct Scheduler {
    upstream: UpstreamClient,
    catalog: Arc<Catalog>,
    station_directory: Arc<StationDirectory>,
    identity: Arc<GeneratorIdentity>,
    fetch_permits: Arc<Semaphore>,
    post_permits: Arc<Semaphore>,
    fetch_interval: Duration,
    envelope_tx: mpsc::Sender<Vec<u8>>,
}

impl Scheduler {
    pub fn new(
        upstream: UpstreamClient,
        catalog: Arc<Catalog>,
        station_directory: Arc<StationDirectory>,
        identity: Arc<GeneratorIdentity>,
        max_fetch_in_flight: usize,
        fetch_interval: Duration,
        envelope_tx: mpsc::Sender<Vec<u8>>,
    ) -> Self {
        Self {
            upstream,
            catalog,
            station_directory,
            identity,
            fetch_permits: Arc::new(Semaphore::new(max_fetch_in_flight)),
            post_permits: Arc::new(Semaphore::new(max_fetch_in_flight)),
            fetch_interval,
            envelope_tx,
        }
    }

    /// Runs the outer sweep loop. Never returns in steady state; the process
    /// is expected to be supervised externally.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.fetch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            for region in &self.catalog.regions {
                for item_type in &self.catalog.item_types {
                    for kind in TASK_KINDS {
                        ticker.tick().await;

                        // Acquired here, in the sweep loop itself, so the
                        // loop blocks on concurrency the same way it blocks
                        // on the rate gate above. A permit acquired inside
                        // the spawned task would let the loop keep spawning
                        // at the ticker rate forever, regardless of how many
                        // fetches are actually in flight.
                        let Ok(fetch_permit) = self.fetch_permits.clone().acquire_owned().await
                        else {
                            return;
                        };
                        self.dispatch(fetch_permit, region.region_id, item_type.type_id, kind);
                    }
                }
            }

            metrics::counter!(SWEEPS_COMPLETED.name).increment(1);
            tracing::info!("completed catalog sweep");
        }
    }

    /// Spawns one independent task for a single (region, type, kind) triple.
    /// `fetch_permit` is already held by the caller; the task keeps it until
    /// either the tuple is abandoned (no envelope produced) or a post permit
    /// has been acquired for the resulting envelope — this is the
    /// load-shaping handoff described in the scheduler's contract.
    fn dispatch(
        &self,
        fetch_permit: OwnedSemaphorePermit,
        region_id: i64,
        type_id: i64,
        kind: TaskKind,
    ) {
        let post_permits = self.post_permits.clone();
        let upstream = self.upstream.clone();
        let station_directory = self.station_directory.clone();
        let identity = self.identity.clone();
        let envelope_tx = self.envelope_tx.clone();

        tokio::spawn(async move {
            metrics::counter!(FETCHES_STARTED.name).increment(1);

            let outcome = fetch_and_transform(
                &upstream,
                &station_directory,
                &identity,
                region_id,
                type_id,
                kind,
            )
            .await;

            let envelope_bytes = match outcome {
                Ok(bytes) => bytes,
                Err(TaskError::Fetch(err)) => {
                    metrics::counter!(FETCH_ERRORS.name).increment(1);
                    tracing::warn!(
                        region_id,
                        type_id,
                        task_kind = kind.as_str(),
                        %err,
                        "upstream fetch failed"
                    );
                    drop(fetch_permit);
                    return;
                }
                Err(TaskError::Transform(err)) => {
                    metrics::counter!(TRANSFORM_ERRORS.name).increment(1);
                    tracing::warn!(
                        region_id,
                        type_id,
                        task_kind = kind.as_str(),
                        %err,
                        "envelope serialization failed"
                    );
                    drop(fetch_permit);
                    return;
                }
            };

            let Ok(post_permit) = post_permits.acquire_owned().await else {
                drop(fetch_permit);
                return;
            };
            // The GET is done; only the envelope's journey to the poster
            // pool remains, which is gated by the post permit from here on.
            drop(fetch_permit);

            if envelope_tx.send(envelope_bytes).await.is_err() {
                tracing::warn!(
                    region_id,
                    type_id,
                    task_kind = kind.as_str(),
                    "envelope channel closed; dropping envelope"
                );
            }
            drop(post_permit);
        });
    }
}

enum FetchedPayload {
    History(Vec<HistoryItem>),
    Orders(Vec<OrderItem>),
}

fn history_url(upstream: &UpstreamClient, region_id: i64, type_id: i64) -> String {
    format!(
        "{}/market/{region_id}/types/{type_id}/history/",
        upstream.base_url
    )
}

fn buy_url(upstream: &UpstreamClient, region_id: i64, type_id: i64) -> String {
    format!(
        "{base}/market/{region_id}/orders/buy/?type={base}/types/{type_id}/",
        base = upstream.base_url
    )
}

fn sell_url(upstream: &UpstreamClient, region_id: i64, type_id: i64) -> String {
    format!(
        "{base}/market/{region_id}/orders/sell/?type={base}/types/{type_id}/",
        base = upstream.base_url
    )
}

async fn fetch(
    upstream: &UpstreamClient,
    region_id: i64,
    type_id: i64,
    kind: TaskKind,
) -> Result<FetchedPayload, FetchError> {
    match kind {
        TaskKind::History => {
            let url = history_url(upstream, region_id, type_id);
            let page: ItemsPage<HistoryItem> = upstream.get_json(&url).await?;
            Ok(FetchedPayload::History(page.items))
        }
        TaskKind::Buy => {
            let url = buy_url(upstream, region_id, type_id);
            let page: ItemsPage<OrderItem> = upstream.get_json(&url).await?;
            Ok(FetchedPayload::Orders(page.items))
        }
        TaskKind::Sell => {
            let url = sell_url(upstream, region_id, type_id);
            let page: ItemsPage<OrderItem> = upstream.get_json(&url).await?;
            Ok(FetchedPayload::Orders(page.items))
        }
    }
}

async fn fetch_and_transform(
    upstream: &UpstreamClient,
    station_directory: &StationDirectory,
    identity: &GeneratorIdentity,
    region_id: i64,
    type_id: i64,
    kind: TaskKind,
) -> Result<Vec<u8>, TaskError> {
    let fetched = fetch(upstream, region_id, type_id, kind).await?;

    let transformer = Transformer::new(station_directory, identity);
    let envelope = match fetched {
        FetchedPayload::History(items) => transformer.transform_history(region_id, type_id, &items),
        FetchedPayload::Orders(items) => transformer.transform_orders(region_id, type_id, &items),
    };

    let bytes = serde_json::to_vec(&envelope).map_err(TransformError::from)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ItemType, Region};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn url_templates_match_the_documented_shape() {
        let upstream = UpstreamClient::new("https://crest-tq.eveonline.com".to_string());
        assert_eq!(
            history_url(&upstream, 10000002, 34),
            "https://crest-tq.eveonline.com/market/10000002/types/34/history/"
        );
        assert_eq!(
            buy_url(&upstream, 10000002, 34),
            "https://crest-tq.eveonline.com/market/10000002/orders/buy/?type=https://crest-tq.eveonline.com/types/34/"
        );
        assert_eq!(
            sell_url(&upstream, 10000002, 34),
            "https://crest-tq.eveonline.com/market/10000002/orders/sell/?type=https://crest-tq.eveonline.com/types/34/"
        );
    }

    #[tokio::test]
    async fn non_200_response_releases_the_permit_without_an_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let upstream = UpstreamClient::new(server.uri());
        let station_directory = StationDirectory::from_table_for_test(HashMap::new());
        let identity = GeneratorIdentity {
            name: "bridge".to_string(),
            version: "0.1".to_string(),
            upload_key: "secret".to_string(),
        };

        let result = fetch_and_transform(
            &upstream,
            &station_directory,
            &identity,
            10000002,
            34,
            TaskKind::History,
        )
        .await;

        assert!(matches!(result, Err(TaskError::Fetch(_))));
    }

    #[tokio::test]
    async fn rate_gate_bounds_gets_in_the_first_window() {
        let server = MockServer::start().await;
        let hit_count = Arc::new(AtomicUsize::new(0));
        {
            let hit_count = hit_count.clone();
            Mock::given(method("GET"))
                .respond_with(move |_: &wiremock::Request| {
                    hit_count.fetch_add(1, Ordering::SeqCst);
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []}))
                })
                .mount(&server)
                .await;
        }

        let upstream = UpstreamClient::new(server.uri());
        let regions: Vec<Region> = (0..1000)
            .map(|id| Region {
                region_id: id,
                name: format!("region-{id}"),
            })
            .collect();
        let item_types = vec![ItemType {
            type_id: 1,
            name: "item".to_string(),
        }];
        let catalog = Arc::new(Catalog {
            regions,
            item_types,
        });

        let station_directory = Arc::new(StationDirectory::from_table_for_test(HashMap::new()));
        let identity = Arc::new(GeneratorIdentity {
            name: "bridge".to_string(),
            version: "0.1".to_string(),
            upload_key: "secret".to_string(),
        });
        let (tx, mut rx) = mpsc::channel(64);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let scheduler = Scheduler::new(
            upstream,
            catalog,
            station_directory,
            identity,
            25,
            Duration::from_millis(10),
            tx,
        );

        tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_secs(1)).await;

        // FetchInterval = 10ms -> ceil(1000ms / 10ms) + 1 = 101 admissions max.
        assert!(
            hit_count.load(Ordering::SeqCst) <= 101,
            "observed {} GETs in the first second",
            hit_count.load(Ordering::SeqCst)
        );
    }
}
