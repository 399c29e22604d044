//! Store wrapper with fault injection, shared by the client test suites.

use async_trait::async_trait;
use mirror_store::{StoreError, UserFeed, UserStore};
use mirror_types::{SearchQuery, UserId, UserRecord};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Delegates to an inner store, failing or pausing on request.
pub(crate) struct FlakyStore<St> {
    inner: St,
    fail_replace: AtomicBool,
    fail_page: AtomicBool,
    page_calls: AtomicUsize,
    page_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl<St: UserStore> FlakyStore<St> {
    pub(crate) fn new(inner: St) -> Self {
        Self {
            inner,
            fail_replace: AtomicBool::new(false),
            fail_page: AtomicBool::new(false),
            page_calls: AtomicUsize::new(0),
            page_gate: Mutex::new(None),
        }
    }

    pub(crate) fn fail_next_replace(&self) {
        self.fail_replace.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_page(&self) {
        self.fail_page.store(true, Ordering::SeqCst);
    }

    pub(crate) fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    /// Hold every page read until [`FlakyStore::release_pages`].
    pub(crate) fn pause_pages(&self) {
        *self.page_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release_pages(&self) {
        if let Some(gate) = self.page_gate.lock().unwrap().take() {
            gate.close();
        }
    }
}

fn injected() -> StoreError {
    StoreError::Database(sqlx::Error::PoolClosed)
}

#[async_trait]
impl<St: UserStore> UserStore for FlakyStore<St> {
    async fn replace_all(&self, records: &[UserRecord]) -> Result<(), StoreError> {
        if self.fail_replace.swap(false, Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.replace_all(records).await
    }

    async fn observe_filtered(
        &self,
        query: Option<&SearchQuery>,
    ) -> Result<UserFeed, StoreError> {
        self.inner.observe_filtered(query).await
    }

    async fn page(
        &self,
        query: Option<&SearchQuery>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<UserRecord>, StoreError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.page_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            // Closing the semaphore releases every waiter
            let _ = gate.acquire().await;
        }

        if self.fail_page.swap(false, Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.page(query, limit, offset).await
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.inner.get_by_id(id).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    async fn last_synced_at(&self) -> Result<Option<i64>, StoreError> {
        self.inner.last_synced_at().await
    }
}
