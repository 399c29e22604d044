//! HTTP/JSON remote source.

use super::{SourceError, UserSource};
use async_trait::async_trait;
use mirror_types::UserRecord;
use std::time::Duration;

/// Reads the user directory from `GET {base_url}/users`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// Create a source for the directory at `base_url`.
    ///
    /// `timeout` bounds each whole request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("usermirror/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: users_url(base_url),
        })
    }

    /// The endpoint this source reads from.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn users_url(base_url: &str) -> String {
    format!("{}/users", base_url.trim_end_matches('/'))
}

#[async_trait]
impl UserSource for HttpSource {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, SourceError> {
        tracing::debug!("GET {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.bytes().await?;
        let users: Vec<UserRecord> = serde_json::from_slice(&body)?;

        tracing::debug!("Fetched {} users from {}", users.len(), self.url);
        Ok(users)
    }
}
