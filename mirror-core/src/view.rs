//! View-state machine for the user list.
//!
//! This module provides a pure, side-effect-free state machine that composes
//! the query subscription, pagination and refresh axes into one [`ViewState`].
//! The machine takes events as input, updates the state, and returns a list
//! of actions to execute.
//!
//! The actual I/O (subscribing to the store, reading pages, syncing with the
//! remote directory) is performed by mirror-client, not by this module.
//!
//! Every piece of asynchronous work is tagged with a [`Generation`]. Results
//! from a superseded subscription, page load or refresh are ignored, so a
//! slow completion can never overwrite the effects of newer work.

use crate::window::{OffsetAdvance, PageRequest, PageStep, PageWindow, DEFAULT_PAGE_SIZE};
use mirror_types::{Generation, SearchQuery, UserRecord};

/// Banner text shown when a refresh fails while cached data is presented.
///
/// Deliberately opaque: the underlying cause is logged, not shown.
pub const DEGRADED_SYNC_MESSAGE: &str = "sync failed";

/// Everything presentation needs to render the user list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// A refresh is in flight.
    pub is_loading: bool,
    /// A page load is in flight.
    pub is_loading_more: bool,
    /// Current filter; `None` shows every user.
    pub query: Option<SearchQuery>,
    /// Presented users, in filtered order.
    pub users: Vec<UserRecord>,
    /// The last page load for the current query came back empty.
    pub end_reached: bool,
    /// A refresh failed and there was nothing to show. Full-screen error.
    pub fatal_error: Option<String>,
    /// A refresh failed but cached users are presented. Banner only.
    pub degraded_error: Option<String>,
}

/// Inputs to the view-state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Presentation changed the filter.
    QueryChanged {
        /// The new filter.
        query: Option<SearchQuery>,
    },
    /// The store subscription delivered the full filtered set.
    FeedEmitted {
        /// Query generation of the subscription.
        generation: Generation,
        /// Matching users in filtered order.
        users: Vec<UserRecord>,
    },
    /// Presentation asked for the next page.
    LoadMoreRequested,
    /// A page read completed.
    PageLoaded {
        /// Generation of the request.
        generation: Generation,
        /// The page contents.
        users: Vec<UserRecord>,
    },
    /// A page read failed.
    PageFailed {
        /// Generation of the request.
        generation: Generation,
        /// Error message describing the failure.
        error: String,
    },
    /// Presentation asked for a refresh from the remote directory.
    RefreshRequested,
    /// A refresh replaced the local set.
    RefreshSucceeded {
        /// Refresh generation.
        generation: Generation,
    },
    /// A refresh failed; the local set is untouched.
    RefreshFailed {
        /// Refresh generation.
        generation: Generation,
        /// Error message describing the failure.
        error: String,
    },
}

/// Actions to be executed by mirror-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Drop the current store subscription and subscribe to `query`.
    Subscribe {
        /// Generation to tag emissions with.
        generation: Generation,
        /// Filter to subscribe to.
        query: Option<SearchQuery>,
    },
    /// Abort the page load in flight, if any.
    CancelPageLoad,
    /// Read a page from the store.
    FetchPage(PageRequest),
    /// Run one sync against the remote directory.
    Refresh {
        /// Generation to report the outcome with.
        generation: Generation,
    },
}

/// The user-list state machine - NO I/O, just state transitions.
#[derive(Debug, Clone)]
pub struct UsersView {
    state: ViewState,
    window: PageWindow,
    query_generation: Generation,
    refresh_generation: Generation,
}

impl UsersView {
    /// Create a view with the given page size and offset policy.
    pub fn new(page_size: usize, advance: OffsetAdvance) -> Self {
        Self {
            state: ViewState::default(),
            window: PageWindow::new(page_size, advance),
            query_generation: Generation::zero(),
            refresh_generation: Generation::zero(),
        }
    }

    /// Entry behavior: subscribe unfiltered and refresh at the same time.
    pub fn start(&mut self) -> Vec<Action> {
        let mut actions = self.handle(Event::QueryChanged { query: None });
        actions.extend(self.handle(Event::RefreshRequested));
        actions
    }

    /// Process an event and return the actions to execute.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::QueryChanged { query } => self.on_query_changed(query),
            Event::FeedEmitted { generation, users } => {
                self.on_feed(generation, users);
                vec![]
            }
            Event::LoadMoreRequested => self.on_load_more(),
            Event::PageLoaded { generation, users } => {
                self.on_page(generation, users);
                vec![]
            }
            Event::PageFailed { generation, .. } => {
                if self.window.fail(generation) {
                    self.state.is_loading_more = false;
                }
                vec![]
            }
            Event::RefreshRequested => self.on_refresh_requested(),
            Event::RefreshSucceeded { generation } => {
                if generation == self.refresh_generation {
                    self.state.is_loading = false;
                    self.state.fatal_error = None;
                    self.state.degraded_error = None;
                }
                vec![]
            }
            Event::RefreshFailed { generation, error } => {
                if generation == self.refresh_generation {
                    self.on_refresh_failed(error);
                }
                vec![]
            }
        }
    }

    fn on_query_changed(&mut self, query: Option<SearchQuery>) -> Vec<Action> {
        self.query_generation = self.query_generation.next();
        self.window.reset();

        self.state.query = query.clone();
        self.state.end_reached = false;
        self.state.is_loading_more = false;
        self.state.fatal_error = None;
        self.state.degraded_error = None;

        vec![
            Action::CancelPageLoad,
            Action::Subscribe {
                generation: self.query_generation,
                query,
            },
        ]
    }

    fn on_feed(&mut self, generation: Generation, mut users: Vec<UserRecord>) {
        if generation != self.query_generation {
            return;
        }
        // A replace is authoritative over accumulated pages for the extent
        // it covers.
        users.truncate(self.window.visible(users.len()));
        self.state.users = users;
        if !self.state.users.is_empty() {
            self.state.fatal_error = None;
        }
    }

    fn on_load_more(&mut self) -> Vec<Action> {
        match self
            .window
            .begin(self.query_generation, self.state.query.clone())
        {
            Some(request) => {
                self.state.is_loading_more = true;
                vec![Action::FetchPage(request)]
            }
            None => vec![],
        }
    }

    fn on_page(&mut self, generation: Generation, page: Vec<UserRecord>) {
        match self.window.complete(generation, page.len()) {
            PageStep::Stale => {}
            PageStep::EndReached => {
                self.state.is_loading_more = false;
                self.state.end_reached = true;
            }
            PageStep::Append { at } => {
                self.state.is_loading_more = false;
                self.state.users.truncate(at);
                self.state.users.extend(page);
                self.state.fatal_error = None;
            }
        }
    }

    fn on_refresh_requested(&mut self) -> Vec<Action> {
        self.refresh_generation = self.refresh_generation.next();
        self.window.clear_end();

        self.state.is_loading = true;
        self.state.end_reached = false;
        self.state.fatal_error = None;
        self.state.degraded_error = None;

        vec![Action::Refresh {
            generation: self.refresh_generation,
        }]
    }

    fn on_refresh_failed(&mut self, error: String) {
        self.state.is_loading = false;
        if self.state.users.is_empty() {
            self.state.fatal_error = Some(error);
            self.state.degraded_error = None;
        } else {
            self.state.fatal_error = None;
            self.state.degraded_error = Some(DEGRADED_SYNC_MESSAGE.to_string());
        }
    }

    /// Current view state.
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Generation of the current query subscription.
    pub fn query_generation(&self) -> Generation {
        self.query_generation
    }

    /// Generation of the most recent refresh.
    pub fn refresh_generation(&self) -> Generation {
        self.refresh_generation
    }

    /// Pagination progress for the current query.
    pub fn window(&self) -> &PageWindow {
        &self.window
    }
}

impl Default for UsersView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, OffsetAdvance::default())
    }
}
