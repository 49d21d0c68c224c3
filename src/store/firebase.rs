//! realtime database REST backend
//!
//! every read is a GET of `{url}{path}.json`. last-N queries ask the server
//! for `orderBy="$key"&limitToLast=N`, shallow reads for `shallow=true`.
//! a json `null` body means the path is
//! empty. transport errors and 5xx responses are retried with a linear
//! backoff; 4xx responses are final.

use super::{last_n_children, segments, StoreError, TreeStore};
use crate::config::DatabaseConfig;
use crate::domain::ReadingCollection;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

pub struct FirebaseStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    retry_attempts: u32,
}

impl FirebaseStore {
    pub fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.connection_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            retry_attempts: config.retry_attempts,
        })
    }

    /// REST url for a tree path
    pub fn endpoint(&self, path: &str) -> Result<String, StoreError> {
        Ok(format!("{}/{}.json", self.base_url, segments(path)?.join("/")))
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Value>, StoreError> {
        let url = self.endpoint(path)?;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let mut request = self.client.get(&url).query(query);
            if let Some(token) = &self.auth_token {
                request = request.query(&[("auth", token)]);
            }

            let retryable = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let body = response.bytes().await?;
                    let value: Value = serde_json::from_slice(&body)?;
                    return Ok(if value.is_null() { None } else { Some(value) });
                }
                Ok(response) => {
                    let status = response.status();
                    if !status.is_server_error() || attempt > self.retry_attempts {
                        return Err(StoreError::Status { status: status.as_u16(), path: path.to_string() });
                    }
                    format!("status {}", status)
                }
                Err(e) => {
                    if !(e.is_timeout() || e.is_connect()) || attempt > self.retry_attempts {
                        return Err(e.into());
                    }
                    e.to_string()
                }
            };

            tracing::debug!("[FIREBASE] retrying {} after {} (attempt {})", path, retryable, attempt);
            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        }
    }
}

#[async_trait]
impl TreeStore for FirebaseStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        tracing::debug!("[FIREBASE] read {}", path);
        self.get_json(path, &[]).await
    }

    async fn read_last_n(&self, path: &str, n: usize) -> Result<ReadingCollection, StoreError> {
        tracing::debug!("[FIREBASE] read last {} of {}", n, path);
        let query = [("orderBy", "\"$key\"".to_string()), ("limitToLast", n.to_string())];
        let value = self.get_json(path, &query).await?;
        // the REST api does not promise key order in the response body
        Ok(last_n_children(value, n))
    }

    async fn read_shallow(&self, path: &str) -> Result<Option<Value>, StoreError> {
        tracing::debug!("[FIREBASE] shallow read {}", path);
        self.get_json(path, &[("shallow", "true".to_string())]).await
    }
}
