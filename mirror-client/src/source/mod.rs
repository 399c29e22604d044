//! Remote directory abstraction.
//!
//! The remote side of a sync is a single operation: fetch the complete
//! current set of user records, or fail. There is no server-side paging and
//! no delta protocol.
//!
//! - [`HttpSource`] reads `GET {base_url}/users` as a JSON array
//! - [`MockSource`] serves an in-process set for tests and offline demos

mod http;
mod mock;

pub use http::HttpSource;
pub use mock::{sample_directory, MockSource};

use async_trait::async_trait;
use mirror_types::UserRecord;
use thiserror::Error;

/// Remote source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be sent or the response not received.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body was not a list of user records.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The source is unavailable (used by non-HTTP sources).
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// A remote directory of user records.
#[async_trait]
pub trait UserSource: Send + Sync {
    /// Fetch the complete current set of user records.
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, SourceError>;
}
