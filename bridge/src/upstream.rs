use crate::errors::FetchError;
use serde::de::DeserializeOwned;

/// Thin wrapper around a reused `reqwest::Client`. Every GET against the
/// upstream goes through here so the status-code/transport-error split stays
/// in one place instead of being re-derived at each call site.
#[derive(Clone)]
pub struct UpstreamClient {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}
