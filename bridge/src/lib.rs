pub mod catalog;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod models;
pub mod poster;
pub mod scheduler;
pub mod station_directory;
pub mod transformer;
pub mod upstream;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::errors::BridgeError;
use crate::poster::PosterPool;
use crate::scheduler::Scheduler;
use crate::station_directory::StationDirectory;
use crate::transformer::GeneratorIdentity;
use crate::upstream::UpstreamClient;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Wires the five pipeline components together and runs the service forever.
/// Returns only on a fatal startup failure or if every spawned task exits,
/// which is not expected in steady state.
pub async fn run(config: Config) -> Result<(), BridgeError> {
    let upstream = UpstreamClient::new(config.upstream.base_url.clone());

    let station_directory = StationDirectory::load(
        &config.station_directory.seed_file_path,
        &upstream,
        &config.upstream.conquerable_stations_url,
    )
    .await?;
    let station_directory = Arc::new(station_directory);

    let catalog = Arc::new(Catalog::load(&upstream).await?);

    let identity = Arc::new(GeneratorIdentity {
        name: config.generator.name.clone(),
        version: config.generator.version.clone(),
        upload_key: config.generator.upload_key.clone(),
    });

    // Unbuffered: a produced envelope sits with the producing task (holding
    // its post permit) until a poster worker is free to take it.
    let (envelope_tx, envelope_rx) = mpsc::channel(1);

    let scheduler = Scheduler::new(
        upstream,
        catalog,
        station_directory,
        identity,
        config.scheduler.max_fetch_in_flight,
        Duration::from_millis(config.scheduler.fetch_interval_ms),
        envelope_tx,
    );

    let poster_pool = PosterPool::new(config.sink.url.clone(), &config.poster);

    let admin_host = config.admin.host.clone();
    let admin_port = config.admin.port;
    let admin_task = tokio::spawn(async move {
        // By the time this task is spawned, the station directory and
        // catalog have already finished loading above, so readiness is
        // unconditional for the lifetime of the admin listener.
        let service = AdminService::new(|| true);
        run_http_service(&admin_host, admin_port, service).await
    });

    let scheduler_task = tokio::spawn(scheduler.run());
    let poster_task = tokio::spawn(poster_pool.run(envelope_rx));

    tokio::select! {
        result = admin_task => {
            match result {
                Ok(Err(err)) => return Err(BridgeError::Admin(err)),
                Ok(Ok(())) => {}
                Err(err) => tracing::error!(%err, "admin task panicked"),
            }
        }
        result = scheduler_task => {
            if let Err(err) = result {
                tracing::error!(%err, "scheduler task panicked");
            }
        }
        result = poster_task => {
            if let Err(err) = result {
                tracing::error!(%err, "poster pool task panicked");
            }
        }
    }

    Ok(())
}
