//! # mirror-types
//!
//! Record and identity types for usermirror, the offline mirror of a remote
//! user directory.
//!
//! This crate provides the foundational types used across all usermirror crates:
//! - [`UserRecord`], [`Address`], [`Geo`], [`Company`] - The mirrored record
//! - [`UserId`], [`Generation`] - Identity and supersession markers
//! - [`SearchQuery`] - The normalized filter applied to every read

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ids;
mod query;
mod user;

pub use ids::{Generation, UserId};
pub use query::SearchQuery;
pub use user::{Address, Company, Geo, UserRecord};
