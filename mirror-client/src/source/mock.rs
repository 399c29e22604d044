//! Mock remote source for testing.
//!
//! Serves a configurable user set and allows queueing failures.

use super::{SourceError, UserSource};
use async_trait::async_trait;
use mirror_types::{Address, Company, Geo, UserId, UserRecord};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mock remote source.
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockSource {
    inner: Arc<Mutex<MockSourceInner>>,
}

#[derive(Debug, Default)]
struct MockSourceInner {
    users: Vec<UserRecord>,
    failures: VecDeque<String>,
    delays: VecDeque<Duration>,
    fetch_count: usize,
}

impl MockSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source serving `users`.
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        let source = Self::new();
        source.set_users(users);
        source
    }

    /// Create a mock source serving [`sample_directory`].
    pub fn sample() -> Self {
        Self::with_users(sample_directory())
    }

    fn lock(&self) -> MutexGuard<'_, MockSourceInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the set served by subsequent fetches.
    pub fn set_users(&self, users: Vec<UserRecord>) {
        self.lock().users = users;
    }

    /// Cause the next fetch to fail with the given error.
    ///
    /// Calls queue: each fetch consumes one failure.
    pub fn fail_next_fetch(&self, error: &str) {
        self.lock().failures.push_back(error.to_string());
    }

    /// Hold the next fetch in flight for `delay` before it answers.
    ///
    /// Calls queue like [`MockSource::fail_next_fetch`]. The answer is the
    /// state at the moment the fetch started.
    pub fn delay_next_fetch(&self, delay: Duration) {
        self.lock().delays.push_back(delay);
    }

    /// Number of fetches performed so far (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_count
    }
}

#[async_trait]
impl UserSource for MockSource {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, SourceError> {
        let (delay, answer) = {
            let mut inner = self.lock();
            inner.fetch_count += 1;
            let answer = match inner.failures.pop_front() {
                Some(error) => Err(SourceError::Unavailable(error)),
                None => Ok(inner.users.clone()),
            };
            (inner.delays.pop_front(), answer)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

const SAMPLE_NAMES: [&str; 25] = [
    "Leanne Graham",
    "Ervin Howell",
    "Clementine Bauch",
    "Patricia Lebsack",
    "Chelsey Dietrich",
    "Dennis Schulist",
    "Kurtis Weissnat",
    "Nicholas Runolfsdottir",
    "Glenna Reichert",
    "Clementina DuBuque",
    "Adah Kautzer",
    "Bernard Olson",
    "Cassie Marvin",
    "Darius Hegmann",
    "Elsie Ferry",
    "Floyd Renner",
    "Gideon Bauch",
    "Hattie Schmitt",
    "Ignacio Frami",
    "Joanie Runte",
    "Karianne Lind",
    "Lonnie Cruickshank",
    "Maud Kessler",
    "Noe Stanton",
    "Ola Witting",
];

/// A deterministic directory of 25 users, enough for two pages at the
/// default page size.
pub fn sample_directory() -> Vec<UserRecord> {
    SAMPLE_NAMES
        .iter()
        .zip(1i64..)
        .map(|(name, id)| {
            let (first, last) = name.split_once(' ').unwrap_or((name, ""));
            let handle = format!("{}.{}", first, last).to_ascii_lowercase();
            UserRecord {
                id: UserId::new(id),
                name: name.to_string(),
                username: format!("{}{}", first, id),
                email: format!("{}@example.com", handle),
                address: Address {
                    street: format!("{} Main Street", 100 + id),
                    suite: format!("Apt. {}", 10 * id),
                    city: "Gwenborough".to_string(),
                    zipcode: format!("{:05}", 92_000 + id),
                    geo: Geo {
                        lat: format!("{:.4}", -37.0 + id as f64 / 10.0),
                        lng: format!("{:.4}", 81.0 + id as f64 / 10.0),
                    },
                },
                phone: format!("1-770-736-{:04}", 8000 + id),
                website: format!("{}.example.org", first.to_ascii_lowercase()),
                company: Company {
                    name: format!("{} Group", last),
                    catch_phrase: "Multi-layered client-server neural-net".to_string(),
                    bs: "harness real-time e-markets".to_string(),
                },
                synced_at: None,
            }
        })
        .collect()
}
