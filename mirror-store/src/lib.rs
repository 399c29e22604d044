//! # mirror-store
//!
//! Persistent store of mirrored user records.
//!
//! The store is the only durable state in usermirror. Its mutation contract
//! is exactly "replace all": the sync engine is its single writer, and every
//! other component reads, pages or observes.
//!
//! ## Reads
//!
//! All reads share one predicate and one order:
//! - a record matches when the [`SearchQuery`] occurs in its `name` or
//!   `email` (ASCII case-insensitive); no query matches everything
//! - matches are ordered by `name`, then `id`
//!
//! A page `(limit, offset)` is therefore always the same slice of the full
//! filtered read.
//!
//! ## Observation
//!
//! [`UserStore::observe_filtered`] returns a [`UserFeed`] holding the current
//! matching set. After every [`UserStore::replace_all`] the store pushes the
//! new matching set to every live feed, once, after the replace has been
//! committed.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod feed;
mod sqlite;

pub use error::StoreError;
pub use feed::UserFeed;
pub use sqlite::SqliteUserStore;

use async_trait::async_trait;
use mirror_types::{SearchQuery, UserId, UserRecord};

/// Trait for user record storage backends.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Atomically discard every stored record and insert `records`.
    ///
    /// On error the previous contents are left untouched.
    async fn replace_all(&self, records: &[UserRecord]) -> Result<(), StoreError>;

    /// Subscribe to the records matching `query`.
    ///
    /// The returned feed holds the current matching set immediately.
    async fn observe_filtered(&self, query: Option<&SearchQuery>)
        -> Result<UserFeed, StoreError>;

    /// Read up to `limit` matching records after skipping `offset` matches.
    async fn page(
        &self,
        query: Option<&SearchQuery>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UserRecord>, StoreError>;

    /// Get a single record by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Most recent persistence timestamp (unix millis), if any record is stored.
    async fn last_synced_at(&self) -> Result<Option<i64>, StoreError>;
}
