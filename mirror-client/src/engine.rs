//! Sync engine: remote fetch followed by a full local replace.
//!
//! The engine is the only writer of the store. A refresh either replaces
//! the whole local set with the remote one or leaves it untouched.
//!
//! Commits are serialized. A caller that may be overtaken by a newer
//! refresh passes a currency check to [`SyncEngine::refresh_if_current`];
//! the check runs under the commit lock, so a stale fetch never lands
//! after a newer one.

use crate::source::{SourceError, UserSource};
use mirror_store::{StoreError, UserStore};
use mirror_types::UserRecord;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote directory could not be read.
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    /// The fetched set could not be stored.
    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    /// A newer refresh was requested before this one could commit.
    #[error("refresh superseded")]
    Superseded,
}

/// Outcome of a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of records now stored.
    pub users: usize,
    /// Timestamp stamped on every stored record (unix millis).
    pub synced_at: i64,
}

/// Reconciles the local store against a remote source.
pub struct SyncEngine<S, St> {
    source: S,
    store: Arc<St>,
    commit: Mutex<()>,
}

impl<S: UserSource, St: UserStore> SyncEngine<S, St> {
    /// Create an engine writing into `store`.
    pub fn new(source: S, store: Arc<St>) -> Self {
        Self {
            source,
            store,
            commit: Mutex::new(()),
        }
    }

    /// Fetch the remote set and replace the local set with it.
    ///
    /// Always fetches; the stored freshness timestamp never short-circuits
    /// a refresh. On error the store is unchanged.
    pub async fn refresh(&self) -> Result<SyncReport, SyncError> {
        self.refresh_if_current(|| true).await
    }

    /// Like [`SyncEngine::refresh`], but only commits while `is_current`
    /// holds.
    ///
    /// `is_current` is evaluated after the fetch, with the commit lock
    /// held. When it returns false the store is untouched and
    /// [`SyncError::Superseded`] is returned.
    pub async fn refresh_if_current<F>(&self, is_current: F) -> Result<SyncReport, SyncError>
    where
        F: Fn() -> bool + Send,
    {
        let records = self.fetch().await?;

        let _commit = self.commit.lock().await;
        if !is_current() {
            tracing::debug!("Dropping {} fetched users from a superseded refresh", records.len());
            return Err(SyncError::Superseded);
        }
        self.apply(records).await
    }

    async fn fetch(&self) -> Result<Vec<UserRecord>, SyncError> {
        let fetched = match self.source.fetch_all().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!("Remote fetch failed: {}", e);
                return Err(e.into());
            }
        };

        Ok(fetched)
    }

    async fn apply(&self, fetched: Vec<UserRecord>) -> Result<SyncReport, SyncError> {
        let synced_at = now_millis();
        let records: Vec<_> = fetched
            .into_iter()
            .map(|user| user.stamped(synced_at))
            .collect();

        if let Err(e) = self.store.replace_all(&records).await {
            tracing::warn!("Failed to store {} fetched users: {}", records.len(), e);
            return Err(e.into());
        }

        tracing::info!("Synced {} users", records.len());
        Ok(SyncReport {
            users: records.len(),
            synced_at,
        })
    }

    /// The store this engine writes into.
    pub fn store(&self) -> &Arc<St> {
        &self.store
    }
}

impl<S, St> std::fmt::Debug for SyncEngine<S, St> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}

/// Current time as unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
