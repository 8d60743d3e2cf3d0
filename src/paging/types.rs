//! Pagination types and traits

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// One fetched page of a remote collection
#[derive(Debug, Clone, Default)]
pub struct CollectionPage {
    /// Items on this page
    pub items: Vec<Value>,
    /// Continuation link for the next page, if any
    pub next_link: Option<String>,
}

impl CollectionPage {
    /// Build a page from a Graph collection response body
    ///
    /// Items come from the `value` array; a bare object response becomes a
    /// single-item page. The cursor is `@odata.nextLink`.
    pub fn from_response(body: Value) -> Self {
        let next_link = body
            .get("@odata.nextLink")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let items = match body.get("value") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => match body {
                Value::Null => Vec::new(),
                other => vec![other],
            },
        };

        Self { items, next_link }
    }

    /// Check if the page has a continuation cursor
    pub fn has_next(&self) -> bool {
        self.next_link.is_some()
    }
}

/// Capability seam for fetching continuation pages
///
/// `GraphClient` implements this for real transports; tests use fakes.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page behind a continuation link
    async fn fetch(&self, next_link: &str) -> Result<CollectionPage>;
}

/// Caller-owned row budget, consulted once per emitted item
///
/// The iterator only reads the budget; decrementing is the caller's job
/// (typically inside the visitor).
pub trait RowBudget: Send + Sync {
    /// Rows still wanted; zero stops the iteration
    fn remaining(&self) -> u64;
}

/// Countdown budget backed by an atomic counter
#[derive(Debug)]
pub struct RowLimit(AtomicU64);

impl RowLimit {
    /// Create a budget for `rows` rows
    pub fn new(rows: u64) -> Self {
        Self(AtomicU64::new(rows))
    }

    /// Consume one row from the budget
    pub fn decrement(&self) {
        // Saturating at zero; a raced extra decrement must not wrap around
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl RowBudget for RowLimit {
    fn remaining(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Budget that never runs out
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RowBudget for Unlimited {
    fn remaining(&self) -> u64 {
        u64::MAX
    }
}

/// Iterator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    /// Emitting items from the current page
    Emitting,
    /// Retrieving the next page
    Fetching,
    /// Terminated, normally or on error
    Done,
}
