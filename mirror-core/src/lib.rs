//! # mirror-core
//!
//! Pure logic for usermirror (no I/O, instant tests).
//!
//! This crate implements the pagination window and the view-state machine
//! that drives the user list, without any database or network I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`UsersView`] consumes [`Event`]s (query changes, store emissions, page
//!   results, refresh outcomes) and returns [`Action`]s to perform.
//! - [`PageWindow`] tracks how much of the filtered order has been
//!   materialized and guards against duplicate page loads.
//!
//! The actual I/O (store reads, remote fetches) is performed by
//! `mirror-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod view;
pub mod window;

pub use view::{Action, Event, UsersView, ViewState, DEGRADED_SYNC_MESSAGE};
pub use window::{OffsetAdvance, PageRequest, PageStep, PageWindow, DEFAULT_PAGE_SIZE};
