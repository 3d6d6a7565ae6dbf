//! Fixed pool of workers draining the envelope channel and POSTing each
//! envelope to the sink, with connection reuse per worker and a staggered
//! startup to avoid a thundering herd.

use crate::config::PosterConfig;
use crate::errors::PostError;
use crate::metrics_defs::{POST_ERRORS, POST_LATENCY, POSTS_SUCCEEDED};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};

const BODY_PREFIX_LEN: usize = 200;

pub struct PosterPool {
    sink_url: String,
    pool_size: usize,
    stagger: Duration,
}

impl PosterPool {
    pub fn new(sink_url: String, config: &PosterConfig) -> Self {
        Self {
            sink_url,
            pool_size: config.pool_size,
            stagger: Duration::from_millis(config.stagger_ms),
        }
    }

    /// Spawns `pool_size` workers sharing a single receiver and waits on all
    /// of them. Workers run forever in steady state; this only returns once
    /// the envelope channel is closed and every worker has drained it.
    pub async fn run(self, envelope_rx: mpsc::Receiver<Vec<u8>>) {
        let receiver = Arc::new(Mutex::new(envelope_rx));
        let mut handles = Vec::with_capacity(self.pool_size);

        for worker_id in 0..self.pool_size {
            let receiver = receiver.clone();
            let sink_url = self.sink_url.clone();
            let startup_delay = self.stagger * worker_id as u32;

            handles.push(tokio::spawn(async move {
                tokio::time::sleep(startup_delay).await;
                let client = reqwest::Client::new();
                worker_loop(worker_id, &client, &sink_url, receiver).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    client: &reqwest::Client,
    sink_url: &str,
    receiver: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
) {
    loop {
        let envelope = {
            let mut guard = receiver.lock().await;
            guard.recv().await
        };

        let Some(envelope) = envelope else {
            tracing::info!(worker_id, "envelope channel closed; poster worker exiting");
            return;
        };

        let started_at = Instant::now();
        match post(client, sink_url, envelope).await {
            Ok(()) => {
                metrics::counter!(POSTS_SUCCEEDED.name).increment(1);
            }
            Err(err) => {
                metrics::counter!(POST_ERRORS.name).increment(1);
                tracing::warn!(worker_id, %err, "failed to post envelope to sink");
            }
        }
        metrics::histogram!(POST_LATENCY.name).record(started_at.elapsed().as_millis() as f64);
    }
}

async fn post(client: &reqwest::Client, sink_url: &str, body: Vec<u8>) -> Result<(), PostError> {
    let response = client
        .post(sink_url)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let body_bytes = response.bytes().await.unwrap_or_default();

    if status == reqwest::StatusCode::OK {
        return Ok(());
    }

    let body_prefix = String::from_utf8_lossy(&body_bytes)
        .chars()
        .take(BODY_PREFIX_LEN)
        .collect();

    Err(PostError::NonSuccess {
        status,
        body_prefix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn successful_post_uses_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({"resultType": "history"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let body = serde_json::to_vec(&serde_json::json!({"resultType": "history"})).unwrap();
        post(&client, &server.uri(), body).await.expect("post succeeds");
    }

    #[tokio::test]
    async fn non_200_response_is_reported_with_body_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad envelope"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = post(&client, &server.uri(), b"{}".to_vec())
            .await
            .unwrap_err();

        match err {
            PostError::NonSuccess {
                status,
                body_prefix,
            } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert_eq!(body_prefix, "bad envelope");
            }
            other => panic!("expected NonSuccess, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_post_error() {
        let client = reqwest::Client::new();
        let err = post(&client, "http://127.0.0.1:1", b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::Transport(_)));
    }

    #[tokio::test]
    async fn pool_drains_every_envelope_across_workers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (tx, rx) = mpsc::channel(1);
        let pool = PosterPool::new(
            server.uri(),
            &PosterConfig {
                pool_size: 3,
                stagger_ms: 0,
            },
        );

        let pool_handle = tokio::spawn(pool.run(rx));

        for i in 0..10 {
            tx.send(format!("{{\"n\":{i}}}").into_bytes()).await.unwrap();
        }
        drop(tx);

        let _ = pool_handle.await;
    }
}
