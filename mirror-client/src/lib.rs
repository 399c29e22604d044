//! # mirror-client
//!
//! Offline-first mirror of a remote user directory.
//!
//! This is the library applications embed to present the directory.
//!
//! ## Features
//!
//! - **Full-replace sync**: [`SyncEngine`] fetches the complete remote set and
//!   swaps it into the local store atomically
//! - **Reactive list**: [`UsersController`] publishes a [`ViewState`] stream
//!   covering filtering, pagination and refresh
//! - **Failure classification**: a failed refresh is fatal only when there is
//!   nothing cached to show
//! - **Source abstraction**: pluggable remote sources (HTTP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use mirror_client::{HttpSource, SyncEngine, UsersController};
//! use mirror_store::SqliteUserStore;
//!
//! let store = Arc::new(SqliteUserStore::open(path).await?);
//! let source = HttpSource::new("https://jsonplaceholder.typicode.com", timeout)?;
//! let controller = UsersController::start(SyncEngine::new(source, store), 20, Default::default());
//!
//! controller.set_query(Some("ali"));
//! controller.load_more();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod engine;
pub mod source;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError, PaginationConfig, RemoteConfig, StoreConfig};
pub use controller::UsersController;
pub use engine::{SyncEngine, SyncError, SyncReport};
pub use mirror_core::ViewState;
pub use source::{sample_directory, HttpSource, MockSource, SourceError, UserSource};
