//! Paginated collection retrieval
//!
//! # Overview
//!
//! The paging module provides:
//! - `CollectionPage` - one fetched page plus its continuation link
//! - `PageIterator` - the {Emitting, Fetching, Done} state machine
//! - `RowBudget` / `RowLimit` - cooperative early termination

mod iterator;
mod types;

pub use iterator::PageIterator;
pub use types::{CollectionPage, PageSource, PagerState, RowBudget, RowLimit, Unlimited};

#[cfg(test)]
mod tests;
