//! UsersController - the presentation-facing driver of the user list.
//!
//! # Architecture
//!
//! The controller owns a pure [`UsersView`] (from mirror-core) and
//! interprets the actions it returns by spawning tokio tasks, one per
//! logical axis:
//!
//! ```text
//! Presentation → UsersController → UsersView (pure state machine)
//!                      ↓
//!        feed task / page task / refresh task
//!                      ↓
//!            UserStore · SyncEngine → UserSource
//! ```
//!
//! Task outcomes are fed back into the view as events. Every resulting
//! [`ViewState`] is published on a `watch` channel.
//!
//! # Example
//!
//! ```ignore
//! let engine = SyncEngine::new(source, store);
//! let controller = UsersController::start(engine, 20, OffsetAdvance::PageSize);
//!
//! let mut states = controller.subscribe();
//! controller.set_query(Some("ali"));
//! controller.load_more();
//! ```

use crate::engine::{SyncEngine, SyncError};
use crate::source::UserSource;
use mirror_core::{Action, Event, OffsetAdvance, PageRequest, UsersView, ViewState};
use mirror_store::{StoreError, UserStore};
use mirror_types::{Generation, SearchQuery, UserId, UserRecord};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handles of the tasks currently working for the view.
#[derive(Default)]
struct Tasks {
    feed: Option<JoinHandle<()>>,
    page: Option<JoinHandle<()>>,
    refresh: Option<JoinHandle<()>>,
}

impl Tasks {
    fn abort_all(&mut self) {
        for handle in [self.feed.take(), self.page.take(), self.refresh.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

struct Shared<S, St> {
    view: Mutex<UsersView>,
    tasks: Mutex<Tasks>,
    state_tx: watch::Sender<ViewState>,
    /// Whether the current subscription has delivered its first emission.
    feed_ready: watch::Sender<bool>,
    engine: SyncEngine<S, St>,
    store: Arc<St>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drives the user list: query, pagination and refresh.
///
/// Dropping the controller aborts its tasks.
pub struct UsersController<S, St> {
    shared: Arc<Shared<S, St>>,
}

impl<S, St> UsersController<S, St>
where
    S: UserSource + 'static,
    St: UserStore + 'static,
{
    /// Create a controller and run the entry behavior: an unfiltered
    /// subscription and one refresh, started together.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(engine: SyncEngine<S, St>, page_size: usize, advance: OffsetAdvance) -> Self {
        let view = UsersView::new(page_size, advance);
        let (state_tx, _) = watch::channel(view.state().clone());
        let store = Arc::clone(engine.store());

        let shared = Arc::new(Shared {
            view: Mutex::new(view),
            tasks: Mutex::new(Tasks::default()),
            state_tx,
            feed_ready: watch::channel(false).0,
            engine,
            store,
        });

        {
            let mut tasks = lock(&shared.tasks);
            let actions = shared.apply(|view| view.start());
            shared.execute(&mut tasks, actions);
        }

        Self { shared }
    }

    /// Change the filter. Blank input shows every user.
    ///
    /// Cancels any page load in flight and restarts pagination.
    pub fn set_query(&self, input: Option<&str>) {
        let query = SearchQuery::parse(input);
        self.shared.dispatch(Event::QueryChanged { query });
    }

    /// Request the next page.
    ///
    /// Returns `false` if the request was dropped because a load is already
    /// in flight or the end has been reached.
    pub fn load_more(&self) -> bool {
        self.shared.dispatch(Event::LoadMoreRequested)
    }

    /// Fetch from the remote directory and replace the local set.
    pub fn refresh(&self) {
        self.shared.dispatch(Event::RefreshRequested);
    }

    /// Look up a single user in the local store.
    pub async fn detail(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.shared.store.get_by_id(id).await
    }

    /// Snapshot of the current view state.
    pub fn state(&self) -> ViewState {
        self.shared.state_tx.borrow().clone()
    }

    /// Subscribe to view state changes.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.state_tx.subscribe()
    }
}

impl<S, St> Shared<S, St>
where
    S: UserSource + 'static,
    St: UserStore + 'static,
{
    /// Feed an event to the view and run its actions.
    ///
    /// Returns whether a page fetch was issued.
    fn dispatch(self: &Arc<Self>, event: Event) -> bool {
        // Tasks are locked first so actions execute in the order the view
        // produced them, even with concurrent callers.
        let mut tasks = lock(&self.tasks);
        let actions = self.apply(|view| view.handle(event));
        let fetches = actions
            .iter()
            .any(|action| matches!(action, Action::FetchPage(_)));
        self.execute(&mut tasks, actions);
        fetches
    }

    fn apply(&self, f: impl FnOnce(&mut UsersView) -> Vec<Action>) -> Vec<Action> {
        let mut view = lock(&self.view);
        let actions = f(&mut view);
        let next = view.state().clone();
        self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        actions
    }

    fn execute(self: &Arc<Self>, tasks: &mut Tasks, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Subscribe { generation, query } => {
                    if let Some(old) = tasks.feed.take() {
                        old.abort();
                    }
                    self.feed_ready.send_replace(false);
                    tasks.feed = Some(self.spawn_feed(generation, query));
                }
                Action::CancelPageLoad => {
                    if let Some(old) = tasks.page.take() {
                        old.abort();
                    }
                }
                Action::FetchPage(request) => {
                    tasks.page = Some(self.spawn_page(request));
                }
                Action::Refresh { generation } => {
                    // A superseded refresh may still be fetching. It checks its
                    // generation before committing and drops out if stale.
                    tasks.refresh = Some(self.spawn_refresh(generation));
                }
            }
        }
    }

    fn spawn_feed(
        self: &Arc<Self>,
        generation: Generation,
        query: Option<SearchQuery>,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let mut feed = match shared.store.observe_filtered(query.as_ref()).await {
                Ok(feed) => feed,
                Err(e) => {
                    tracing::warn!("Failed to subscribe to {:?}: {}", query, e);
                    shared.feed_ready.send_replace(true);
                    return;
                }
            };
            tracing::debug!("Subscribed to {:?} (generation {})", query, generation);

            loop {
                let users = feed.borrow_and_update().clone();
                tracing::debug!("Feed {:?} emitted {} users", query, users.len());
                shared.dispatch(Event::FeedEmitted { generation, users });
                shared.feed_ready.send_replace(true);

                if feed.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn spawn_page(self: &Arc<Self>, request: PageRequest) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let PageRequest {
                generation,
                query,
                limit,
                offset,
            } = request;

            let event = match shared.store.page(query.as_ref(), limit, offset).await {
                Ok(users) => {
                    tracing::debug!(
                        "Page {:?} at offset {} returned {} users",
                        query,
                        offset,
                        users.len()
                    );
                    Event::PageLoaded { generation, users }
                }
                Err(e) => {
                    tracing::warn!("Page load at offset {} failed: {}", offset, e);
                    Event::PageFailed {
                        generation,
                        error: e.to_string(),
                    }
                }
            };
            shared.dispatch(event);
        })
    }

    fn spawn_refresh(self: &Arc<Self>, generation: Generation) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let is_current = {
                let shared = Arc::clone(&shared);
                move || lock(&shared.view).refresh_generation() == generation
            };
            let event = match shared.engine.refresh_if_current(is_current).await {
                Ok(_) => Event::RefreshSucceeded { generation },
                Err(SyncError::Superseded) => {
                    tracing::debug!("Refresh {} superseded before commit", generation);
                    return;
                }
                Err(e) => {
                    // Failures are classified against the presented users, so
                    // let the subscription deliver what is cached first.
                    let mut ready = shared.feed_ready.subscribe();
                    let _ = ready.wait_for(|ready| *ready).await;
                    Event::RefreshFailed {
                        generation,
                        error: e.to_string(),
                    }
                }
            };
            shared.dispatch(event);
        })
    }
}

impl<S, St> Drop for UsersController<S, St> {
    fn drop(&mut self) {
        lock(&self.shared.tasks).abort_all();
    }
}

impl<S, St> std::fmt::Debug for UsersController<S, St> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersController")
            .field("state", &*self.shared.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{sample_directory, MockSource};
    use crate::testing::FlakyStore;
    use mirror_core::DEGRADED_SYNC_MESSAGE;
    use mirror_store::SqliteUserStore;
    use std::time::Duration;

    type TestController = UsersController<MockSource, FlakyStore<SqliteUserStore>>;

    async fn setup(source: MockSource) -> (TestController, Arc<FlakyStore<SqliteUserStore>>) {
        let store = Arc::new(FlakyStore::new(SqliteUserStore::in_memory().await.unwrap()));
        let engine = SyncEngine::new(source, Arc::clone(&store));
        let controller = UsersController::start(engine, 20, OffsetAdvance::PageSize);
        (controller, store)
    }

    async fn wait_for(
        controller: &TestController,
        mut predicate: impl FnMut(&ViewState) -> bool,
    ) -> ViewState {
        let mut rx = controller.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| predicate(s)))
            .await
            .expect("timed out waiting for view state")
            .unwrap();
        state.clone()
    }

    async fn loaded(controller: &TestController, users: usize) -> ViewState {
        wait_for(controller, |s| !s.is_loading && s.users.len() == users).await
    }

    fn make_user(id: i64, name: &str) -> UserRecord {
        let mut user = sample_directory()[0].clone();
        user.id = UserId::new(id);
        user.name = name.to_string();
        user.email = format!("{}@example.com", name.to_ascii_lowercase());
        user
    }

    fn without_stamps(users: &[UserRecord]) -> Vec<UserRecord> {
        users
            .iter()
            .cloned()
            .map(|mut u| {
                u.synced_at = None;
                u
            })
            .collect()
    }

    // ===== Entry Behavior Tests =====

    #[tokio::test]
    async fn start_subscribes_and_refreshes() {
        let source = MockSource::sample();
        let (controller, _store) = setup(source.clone()).await;

        assert!(controller.state().is_loading);

        let state = loaded(&controller, 25).await;
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(state.users[0].name, "Adah Kautzer");
        assert!(state.fatal_error.is_none());
        assert!(state.degraded_error.is_none());
    }

    // ===== Refresh Tests =====

    #[tokio::test]
    async fn refresh_failure_with_empty_store_is_fatal() {
        let source = MockSource::sample();
        source.fail_next_fetch("network down");
        let (controller, _store) = setup(source).await;

        let state = wait_for(&controller, |s| !s.is_loading).await;

        assert_eq!(
            state.fatal_error.as_deref(),
            Some("fetch failed: source unavailable: network down")
        );
        assert!(state.degraded_error.is_none());
        assert!(state.users.is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_with_cached_users_is_degraded() {
        let source = MockSource::sample();
        let (controller, _store) = setup(source.clone()).await;
        let before = loaded(&controller, 25).await;

        source.fail_next_fetch("network down");
        controller.refresh();
        let state = wait_for(&controller, |s| !s.is_loading).await;

        assert_eq!(state.degraded_error.as_deref(), Some(DEGRADED_SYNC_MESSAGE));
        assert!(state.fatal_error.is_none());
        assert_eq!(state.users, before.users);
    }

    #[tokio::test]
    async fn startup_failure_with_cached_store_is_degraded() {
        let store = Arc::new(FlakyStore::new(SqliteUserStore::in_memory().await.unwrap()));
        store.replace_all(&sample_directory()).await.unwrap();
        let source = MockSource::sample();
        source.fail_next_fetch("offline");

        let engine = SyncEngine::new(source, Arc::clone(&store));
        let controller = UsersController::start(engine, 20, OffsetAdvance::PageSize);
        let state = wait_for(&controller, |s| !s.is_loading).await;

        assert_eq!(state.degraded_error.as_deref(), Some(DEGRADED_SYNC_MESSAGE));
        assert!(state.fatal_error.is_none());
        assert_eq!(state.users.len(), 25);
    }

    #[tokio::test]
    async fn successful_refresh_clears_fatal_error() {
        let source = MockSource::sample();
        source.fail_next_fetch("network down");
        let (controller, _store) = setup(source).await;
        wait_for(&controller, |s| s.fatal_error.is_some()).await;

        controller.refresh();
        let state = loaded(&controller, 25).await;

        assert!(state.fatal_error.is_none());
    }

    #[tokio::test]
    async fn failed_replace_keeps_cached_users() {
        let source = MockSource::sample();
        let (controller, store) = setup(source.clone()).await;
        loaded(&controller, 25).await;

        source.set_users(sample_directory()[..3].to_vec());
        store.fail_next_replace();
        controller.refresh();
        let state = wait_for(&controller, |s| !s.is_loading).await;

        assert_eq!(state.degraded_error.as_deref(), Some(DEGRADED_SYNC_MESSAGE));
        assert_eq!(state.users.len(), 25);
        assert_eq!(store.count().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn repeated_refresh_with_same_remote_is_stable() {
        let source = MockSource::sample();
        let (controller, _store) = setup(source.clone()).await;
        let first = loaded(&controller, 25).await;

        controller.refresh();
        let second = loaded(&controller, 25).await;

        assert_eq!(without_stamps(&first.users), without_stamps(&second.users));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn overlapping_refresh_keeps_latest_set() {
        let source = MockSource::with_users(sample_directory()[..3].to_vec());
        source.delay_next_fetch(Duration::from_millis(300));
        let (controller, store) = setup(source.clone()).await;
        while source.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }

        source.set_users(sample_directory());
        controller.refresh();
        loaded(&controller, 25).await;

        // Let the slow first fetch finish
        tokio::time::sleep(Duration::from_millis(600)).await;

        let state = controller.state();
        assert_eq!(store.count().await.unwrap(), 25);
        assert_eq!(state.users.len(), 25);
        assert!(!state.is_loading);
        assert!(state.fatal_error.is_none());
        assert!(state.degraded_error.is_none());
        assert_eq!(source.fetch_count(), 2);
    }

    // ===== Query Tests =====

    #[tokio::test]
    async fn query_narrows_presented_users() {
        let source = MockSource::with_users(vec![make_user(1, "Alice"), make_user(2, "Bob")]);
        let (controller, _store) = setup(source).await;
        loaded(&controller, 2).await;

        controller.set_query(Some("ali"));
        let state = wait_for(&controller, |s| s.users.len() == 1).await;

        assert_eq!(state.users[0].name, "Alice");
        assert_eq!(state.query.as_ref().map(|q| q.as_str()), Some("ali"));
    }

    #[tokio::test]
    async fn blank_query_shows_everyone() {
        let source = MockSource::with_users(vec![make_user(1, "Alice"), make_user(2, "Bob")]);
        let (controller, _store) = setup(source).await;
        loaded(&controller, 2).await;
        controller.set_query(Some("bob"));
        wait_for(&controller, |s| s.users.len() == 1).await;

        controller.set_query(Some("   "));
        let state = wait_for(&controller, |s| s.users.len() == 2).await;

        assert!(state.query.is_none());
    }

    #[tokio::test]
    async fn set_query_clears_errors() {
        let source = MockSource::sample();
        let (controller, _store) = setup(source.clone()).await;
        loaded(&controller, 25).await;
        source.fail_next_fetch("network down");
        controller.refresh();
        wait_for(&controller, |s| s.degraded_error.is_some()).await;

        controller.set_query(Some("leanne"));

        let state = controller.state();
        assert!(state.degraded_error.is_none());
        assert!(state.fatal_error.is_none());
    }

    // ===== Pagination Tests =====

    #[tokio::test]
    async fn pages_grow_until_end() {
        let (controller, _store) = setup(MockSource::sample()).await;
        loaded(&controller, 25).await;

        assert!(controller.load_more());
        let state = wait_for(&controller, |s| !s.is_loading_more).await;
        assert_eq!(state.users.len(), 20);
        assert!(!state.end_reached);

        assert!(controller.load_more());
        let state = wait_for(&controller, |s| !s.is_loading_more).await;
        assert_eq!(state.users.len(), 25);
        assert!(!state.end_reached);

        assert!(controller.load_more());
        let state = wait_for(&controller, |s| !s.is_loading_more).await;
        assert_eq!(state.users.len(), 25);
        assert!(state.end_reached);

        assert!(!controller.load_more());
    }

    #[tokio::test]
    async fn concurrent_load_more_fetches_once() {
        let (controller, store) = setup(MockSource::sample()).await;
        loaded(&controller, 25).await;

        assert!(controller.load_more());
        assert!(!controller.load_more());
        wait_for(&controller, |s| !s.is_loading_more).await;

        assert_eq!(store.page_calls(), 1);
    }

    #[tokio::test]
    async fn set_query_cancels_page_in_flight() {
        let (controller, store) = setup(MockSource::sample()).await;
        loaded(&controller, 25).await;

        store.pause_pages();
        assert!(controller.load_more());
        assert!(controller.state().is_loading_more);

        controller.set_query(Some("leanne"));
        assert!(!controller.state().is_loading_more);
        store.release_pages();

        let state = wait_for(&controller, |s| s.users.len() == 1).await;
        assert_eq!(state.users[0].name, "Leanne Graham");

        // The window restarted for the new query
        assert!(controller.load_more());
        let state = wait_for(&controller, |s| !s.is_loading_more).await;
        assert_eq!(state.users.len(), 1);
    }

    #[tokio::test]
    async fn failed_page_is_recoverable() {
        let (controller, store) = setup(MockSource::sample()).await;
        let before = loaded(&controller, 25).await;

        store.fail_next_page();
        assert!(controller.load_more());
        let state = wait_for(&controller, |s| !s.is_loading_more).await;
        assert_eq!(state.users, before.users);
        assert!(!state.end_reached);

        assert!(controller.load_more());
        let state = wait_for(&controller, |s| !s.is_loading_more).await;
        assert_eq!(state.users.len(), 20);
    }

    // ===== Detail Tests =====

    #[tokio::test]
    async fn detail_reads_from_store() {
        let (controller, _store) = setup(MockSource::sample()).await;
        loaded(&controller, 25).await;

        let user = controller.detail(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(user.name, "Leanne Graham");

        assert!(controller.detail(UserId::new(99)).await.unwrap().is_none());
    }
}
