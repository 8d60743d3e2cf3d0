//! Tests for the paging module

use super::*;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Page source serving a scripted sequence of pages
struct FakeSource {
    pages: Mutex<Vec<Result<CollectionPage>>>,
    fetches: AtomicUsize,
}

impl FakeSource {
    fn new(pages: Vec<Result<CollectionPage>>) -> Self {
        Self {
            pages: Mutex::new(pages),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch(&self, _next_link: &str) -> Result<CollectionPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.pages.lock().await;
        if pages.is_empty() {
            panic!("fetch called after cursor chain ended");
        }
        pages.remove(0)
    }
}

fn page(ids: &[i64], next: Option<&str>) -> CollectionPage {
    CollectionPage {
        items: ids.iter().map(|id| json!({ "id": id })).collect(),
        next_link: next.map(ToString::to_string),
    }
}

// ============================================================================
// CollectionPage Tests
// ============================================================================

#[test]
fn test_page_from_response_with_next_link() {
    let body = json!({
        "value": [{"id": "a"}, {"id": "b"}],
        "@odata.nextLink": "https://graph.microsoft.com/v1.0/auditLogs/directoryAudits?$skiptoken=x"
    });
    let page = CollectionPage::from_response(body);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_next());
}

#[test]
fn test_page_from_response_last_page() {
    let body = json!({ "value": [{"id": "a"}] });
    let page = CollectionPage::from_response(body);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_next());
}

#[test]
fn test_page_from_bare_object() {
    let body = json!({ "id": "a", "displayName": "thing" });
    let page = CollectionPage::from_response(body);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_next());
}

// ============================================================================
// RowBudget Tests
// ============================================================================

#[test]
fn test_row_limit_counts_down_and_saturates() {
    let limit = RowLimit::new(2);
    assert_eq!(limit.remaining(), 2);
    limit.decrement();
    limit.decrement();
    assert_eq!(limit.remaining(), 0);
    limit.decrement();
    assert_eq!(limit.remaining(), 0);
}

#[test]
fn test_unlimited_never_runs_out() {
    assert_eq!(Unlimited.remaining(), u64::MAX);
}

// ============================================================================
// PageIterator Tests
// ============================================================================

#[tokio::test]
async fn test_iterates_to_natural_exhaustion() {
    let source = FakeSource::new(vec![Ok(page(&[4, 5], None))]);
    let first = page(&[1, 2, 3], Some("next"));

    let mut seen = Vec::new();
    let mut iter = PageIterator::new(&source, first);
    let emitted = iter
        .for_each(&Unlimited, |item| seen.push(item["id"].as_i64().unwrap()))
        .await
        .unwrap();

    assert_eq!(emitted, 5);
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(iter.state(), PagerState::Done);
}

#[tokio::test]
async fn test_budget_exhausted_mid_page_never_fetches() {
    // Budget reaches zero on the 3rd item of page one; page two must never
    // be requested.
    let source = FakeSource::new(vec![Ok(page(&[6, 7, 8], None))]);
    let first = page(&[1, 2, 3, 4, 5], Some("next"));

    let budget = RowLimit::new(3);
    let mut seen = 0;
    let mut iter = PageIterator::new(&source, first);
    let emitted = iter
        .for_each(&budget, |_| {
            seen += 1;
            budget.decrement();
        })
        .await
        .unwrap();

    assert_eq!(emitted, 3);
    assert_eq!(seen, 3);
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(iter.state(), PagerState::Done);
}

#[tokio::test]
async fn test_budget_exhausted_on_page_boundary_never_fetches() {
    let source = FakeSource::new(vec![Ok(page(&[3, 4], None))]);
    let first = page(&[1, 2], Some("next"));

    let budget = RowLimit::new(2);
    let mut iter = PageIterator::new(&source, first);
    let emitted = iter.for_each(&budget, |_| budget.decrement()).await.unwrap();

    assert_eq!(emitted, 2);
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_fetch_failure_propagates_after_first_page() {
    let source = FakeSource::new(vec![Err(Error::http_status(503, "unavailable"))]);
    let first = page(&[1, 2], Some("next"));

    let mut seen = 0;
    let mut iter = PageIterator::new(&source, first);
    let err = iter.for_each(&Unlimited, |_| seen += 1).await.unwrap_err();

    // First page was emitted in full before the failing fetch
    assert_eq!(seen, 2);
    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert_eq!(iter.state(), PagerState::Done);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_empty_first_page_terminates() {
    let source = FakeSource::new(vec![]);
    let first = page(&[], None);

    let mut iter = PageIterator::new(&source, first);
    let emitted = iter
        .for_each(&Unlimited, |_: &Value| panic!("no items expected"))
        .await
        .unwrap();

    assert_eq!(emitted, 0);
    assert_eq!(iter.state(), PagerState::Done);
}

#[tokio::test]
async fn test_three_page_chain() {
    let source = FakeSource::new(vec![
        Ok(page(&[3, 4], Some("next-2"))),
        Ok(page(&[5], None)),
    ]);
    let first = page(&[1, 2], Some("next-1"));

    let mut iter = PageIterator::new(&source, first);
    let emitted = iter.for_each(&Unlimited, |_| {}).await.unwrap();

    assert_eq!(emitted, 5);
    assert_eq!(source.fetch_count(), 2);
}
