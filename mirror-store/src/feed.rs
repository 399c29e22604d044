//! Subscriber registry for filtered reads.
//!
//! One watch channel per distinct filter. Subscribers to the same filter
//! share the channel; channels whose receivers have all been dropped are
//! pruned on the next publish.

use crate::error::StoreError;
use mirror_types::{SearchQuery, UserRecord};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::{watch, Mutex};

/// A live view of the records matching one filter.
///
/// `borrow()` yields the current matching set; `changed().await` resolves
/// after the next replace.
pub type UserFeed = watch::Receiver<Vec<UserRecord>>;

/// Registry key: the case-folded filter, `None` for unfiltered.
type FeedKey = Option<String>;

struct FeedEntry {
    query: Option<SearchQuery>,
    sender: watch::Sender<Vec<UserRecord>>,
}

#[derive(Default)]
pub(crate) struct FeedRegistry {
    feeds: Mutex<HashMap<FeedKey, FeedEntry>>,
}

impl FeedRegistry {
    /// Join the feed for `query`, creating it with `load` if none is live.
    pub(crate) async fn subscribe<F, Fut>(
        &self,
        query: Option<&SearchQuery>,
        load: F,
    ) -> Result<UserFeed, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<UserRecord>, StoreError>>,
    {
        let key = query.map(|q| q.key().to_string());
        let mut feeds = self.feeds.lock().await;

        if let Some(entry) = feeds.get(&key) {
            if !entry.sender.is_closed() {
                return Ok(entry.sender.subscribe());
            }
        }

        let (sender, receiver) = watch::channel(load().await?);
        feeds.insert(
            key,
            FeedEntry {
                query: query.cloned(),
                sender,
            },
        );
        tracing::debug!("Feed opened for {:?} ({} live)", query, feeds.len());
        Ok(receiver)
    }

    /// Push a fresh matching set to every live feed.
    ///
    /// A feed whose reload fails keeps its previous value.
    pub(crate) async fn publish<F, Fut>(&self, load: F)
    where
        F: Fn(Option<SearchQuery>) -> Fut,
        Fut: Future<Output = Result<Vec<UserRecord>, StoreError>>,
    {
        let mut feeds = self.feeds.lock().await;
        feeds.retain(|_, entry| !entry.sender.is_closed());

        for entry in feeds.values() {
            match load(entry.query.clone()).await {
                Ok(users) => {
                    entry.sender.send_replace(users);
                }
                Err(e) => {
                    tracing::warn!("Failed to reload feed {:?}: {}", entry.query, e);
                }
            }
        }
    }

    /// Number of feeds currently registered (live or awaiting pruning).
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.feeds.lock().await.len()
    }
}

impl std::fmt::Debug for FeedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedRegistry").finish_non_exhaustive()
    }
}
