//! Identity and supersession types for usermirror.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a user in the remote directory.
///
/// Assigned by the remote source; primary key of the local store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create a new UserId with the given value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this UserId.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// A monotonically increasing marker for superseded asynchronous work.
///
/// Every query subscription, page load and refresh is tagged with the
/// generation current when it was issued. Results carrying an older
/// generation are discarded instead of being applied.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Create a new Generation with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Create the generation that precedes any issued work.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the numeric value of this Generation.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The generation following this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generation({})", self.0)
    }
}
