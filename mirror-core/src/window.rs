//! Pagination window over the filtered order.
//!
//! The remote directory returns its complete set, so pagination is purely a
//! local convenience: each page is a `LIMIT/OFFSET` slice of the store's
//! `name`-ordered, filtered read. This module tracks:
//! - The offset of the next page to request
//! - Whether a page load is in flight (at most one per query generation)
//! - Whether the end of the filtered order has been reached
//! - Whether the presented sequence is windowed to the materialized extent

use mirror_types::{Generation, SearchQuery};
use serde::Deserialize;

/// Number of records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// How the window's offset moves after a non-empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetAdvance {
    /// Advance by the page size, whatever the page actually returned.
    ///
    /// If a replace shrinks the filtered set between two pages, the next
    /// request may skip or repeat records.
    #[default]
    PageSize,
    /// Advance by the number of records the page returned.
    Returned,
}

/// A page read to perform against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Query generation the request was issued for.
    pub generation: Generation,
    /// Filter in effect when the request was issued.
    pub query: Option<SearchQuery>,
    /// Maximum number of records to return.
    pub limit: usize,
    /// Number of matching records to skip.
    pub offset: usize,
}

/// What a completed page does to the presented sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    /// Append the page after the first `at` presented records.
    Append {
        /// Position the page starts at.
        at: usize,
    },
    /// The page was empty; no more records for this query.
    EndReached,
    /// The page belongs to a superseded load and must be dropped.
    Stale,
}

/// Tracks incremental page growth for the current query.
#[derive(Debug, Clone)]
pub struct PageWindow {
    page_size: usize,
    advance: OffsetAdvance,
    /// Offset of the next page to request.
    offset: usize,
    end_reached: bool,
    /// Generation and offset of the load in flight.
    pending: Option<(Generation, usize)>,
    /// Set once a page has completed for the current query.
    windowed: bool,
}

impl PageWindow {
    /// Create a window with the given page size and offset policy.
    ///
    /// A page size of zero is raised to one.
    pub fn new(page_size: usize, advance: OffsetAdvance) -> Self {
        Self {
            page_size: page_size.max(1),
            advance,
            offset: 0,
            end_reached: false,
            pending: None,
            windowed: false,
        }
    }

    /// Discard all progress. Any load in flight becomes stale.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.end_reached = false;
        self.pending = None;
        self.windowed = false;
    }

    /// Start loading the next page.
    ///
    /// Returns `None` when a load is already in flight or the end has been
    /// reached; duplicate triggers are dropped, not queued.
    pub fn begin(
        &mut self,
        generation: Generation,
        query: Option<SearchQuery>,
    ) -> Option<PageRequest> {
        if self.pending.is_some() || self.end_reached {
            return None;
        }
        self.pending = Some((generation, self.offset));
        Some(PageRequest {
            generation,
            query,
            limit: self.page_size,
            offset: self.offset,
        })
    }

    /// Record the result of the load issued for `generation`.
    pub fn complete(&mut self, generation: Generation, returned: usize) -> PageStep {
        let at = match self.pending {
            Some((pending, at)) if pending == generation => at,
            _ => return PageStep::Stale,
        };
        self.pending = None;

        if returned == 0 {
            self.end_reached = true;
            return PageStep::EndReached;
        }

        let step = match self.advance {
            OffsetAdvance::PageSize => self.page_size,
            OffsetAdvance::Returned => returned,
        };
        self.offset = at.saturating_add(step);
        self.windowed = true;
        PageStep::Append { at }
    }

    /// Abandon the load issued for `generation` after a failed read.
    ///
    /// Returns `false` if that load was already superseded.
    pub fn fail(&mut self, generation: Generation) -> bool {
        match self.pending {
            Some((pending, _)) if pending == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Allow loading past a previously reached end (the data may have grown).
    pub fn clear_end(&mut self) {
        self.end_reached = false;
    }

    /// Number of records of a full filtered emission of `available` records
    /// that should be presented.
    pub fn visible(&self, available: usize) -> usize {
        if self.windowed {
            available.min(self.offset)
        } else {
            available
        }
    }

    /// Offset of the next page to request.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Configured page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether an empty page has been seen for the current query.
    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    /// Whether a page load is in flight.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the presented sequence is limited to the materialized extent.
    pub fn is_windowed(&self) -> bool {
        self.windowed
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, OffsetAdvance::default())
    }
}
