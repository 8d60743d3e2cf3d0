//! Page iterator implementation
//!
//! Drives page-by-page retrieval over a cursor chain, streaming items to a
//! visitor and honoring the caller's row budget. Fetches are strictly
//! sequential; the cursor only ever advances.

use super::types::{CollectionPage, PageSource, PagerState, RowBudget};
use crate::error::Result;
use serde_json::Value;
use tracing::debug;

/// State machine over an already-fetched first page and its continuations
pub struct PageIterator<'a> {
    source: &'a dyn PageSource,
    page: CollectionPage,
    index: usize,
    pending: Option<String>,
    state: PagerState,
}

impl<'a> PageIterator<'a> {
    /// Create an iterator positioned on the first page
    pub fn new(source: &'a dyn PageSource, first_page: CollectionPage) -> Self {
        Self {
            source,
            page: first_page,
            index: 0,
            pending: None,
            state: PagerState::Emitting,
        }
    }

    /// Current state
    pub fn state(&self) -> PagerState {
        self.state
    }

    /// Stream every item to the visitor, returning the emitted count
    ///
    /// Terminates when the budget reaches zero, the cursor chain ends, or a
    /// fetch fails. A zero budget after an item means Done immediately; the
    /// next page is never requested. Fetch failures propagate without any
    /// partial-page retry.
    pub async fn for_each<F>(&mut self, budget: &dyn RowBudget, mut visit: F) -> Result<u64>
    where
        F: FnMut(&Value),
    {
        let mut emitted = 0u64;

        loop {
            match self.state {
                PagerState::Done => return Ok(emitted),

                PagerState::Emitting => {
                    while self.index < self.page.items.len() {
                        visit(&self.page.items[self.index]);
                        self.index += 1;
                        emitted += 1;

                        if budget.remaining() == 0 {
                            debug!(emitted, "row budget exhausted");
                            self.state = PagerState::Done;
                            return Ok(emitted);
                        }
                    }

                    // Page exhausted; follow the cursor or finish
                    match self.page.next_link.take() {
                        Some(link) => {
                            self.pending = Some(link);
                            self.state = PagerState::Fetching;
                        }
                        None => self.state = PagerState::Done,
                    }
                }

                PagerState::Fetching => {
                    let link = self.pending.take().unwrap_or_default();
                    debug!(%link, "fetching next page");
                    match self.source.fetch(&link).await {
                        Ok(page) => {
                            self.page = page;
                            self.index = 0;
                            self.state = PagerState::Emitting;
                        }
                        Err(e) => {
                            self.state = PagerState::Done;
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}
