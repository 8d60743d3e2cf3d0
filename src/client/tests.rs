//! Tests for the Graph client

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::auth::{CliToken, CliTokenProvider};
use crate::config::ConnectionConfig;
use crate::error::Error;
use crate::filter::Qual;
use crate::paging::{RowLimit, Unlimited};
use crate::session::Session;

struct FakeCli;

#[async_trait]
impl CliTokenProvider for FakeCli {
    async fn access_token(&self) -> crate::error::Result<CliToken> {
        Ok(CliToken {
            access_token: "cli-token".to_string(),
            expires_on: None,
            tenant: "tenant-a".to_string(),
            token_type: Some("Bearer".to_string()),
        })
    }
}

/// Client backed by a CLI-delegate session, pointed at a mock endpoint
async fn mock_client(server: &MockServer) -> GraphClient {
    let config = ConnectionConfig::default().merged_with(|_| None);
    let session = Session::connect(&config, Arc::new(FakeCli)).await.unwrap();
    GraphClient::new(&session).with_base_url(server.uri())
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_sends_filter_and_clamped_top() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("$filter", "userType eq 'Guest'"))
        .and(query_param("$top", "999"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "u1"}, {"id": "u2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let request = ListRequest::default()
        .with_filter(Some("userType eq 'Guest'".to_string()))
        .with_top(5000);
    let page = client.list("users", &request).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_list_with_qual_built_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auditLogs/directoryAudits"))
        .and(query_param("$filter", "category eq 'UserManagement'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let request = ListRequest::from_quals(&[Qual::eq("category", "UserManagement")], None);
    client
        .list("auditLogs/directoryAudits", &request)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_raises_zero_top_to_minimum() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(query_param("$top", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let page = client
        .list("groups", &ListRequest::default().with_top(0))
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_list_omits_absent_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    client.list("users", &ListRequest::default()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_list_each_follows_next_link() {
    let server = MockServer::start().await;
    let next = format!("{}/users?$skiptoken=page2", server.uri());
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "u3"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "u1"}, {"id": "u2"}],
            "@odata.nextLink": next
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let mut ids = Vec::new();
    let emitted = client
        .list_each("users", &ListRequest::default(), &Unlimited, |item| {
            ids.push(item["id"].as_str().unwrap().to_string());
        })
        .await
        .unwrap();

    assert_eq!(emitted, 3);
    assert_eq!(ids, vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn test_list_each_stops_at_budget_without_fetching_next_page() {
    let server = MockServer::start().await;
    let next = format!("{}/users?$skiptoken=page2", server.uri());
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "u4"}]
        })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "u1"}, {"id": "u2"}, {"id": "u3"}],
            "@odata.nextLink": next
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let budget = RowLimit::new(2);
    let emitted = client
        .list_each("users", &ListRequest::default(), &budget, |_| {
            budget.decrement();
        })
        .await
        .unwrap();

    assert_eq!(emitted, 2);
}

// ============================================================================
// Single-Object Tests
// ============================================================================

#[tokio::test]
async fn test_get_returns_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "displayName": "Test User"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let user = client.get("users", "u1").await.unwrap();
    assert_eq!(user["displayName"], "Test User");
}

#[tokio::test]
async fn test_get_surfaces_odata_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "Request_ResourceNotFound",
                "message": "Resource 'missing' does not exist."
            }
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let err = client.get("users", "missing").await.unwrap_err();
    match err {
        Error::Remote { code, .. } => assert_eq!(code, "Request_ResourceNotFound"),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_falls_back_to_status_for_opaque_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let err = client.get("users", "u1").await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_get_or_ignore_matching_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "Request_ResourceNotFound",
                "message": "Resource 'missing' does not exist."
            }
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let ignore = IgnoreConfig::new(vec!["Request_ResourceNotFound".to_string()]);
    let result = client.get_or_ignore("users", "missing", &ignore).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_get_or_ignore_unmatched_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "Authorization_RequestDenied",
                "message": "Insufficient privileges."
            }
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server).await;
    let ignore = IgnoreConfig::new(vec!["Request_ResourceNotFound".to_string()]);
    let err = client.get_or_ignore("users", "u1", &ignore).await.unwrap_err();
    assert!(err.is_remote());
}

// ============================================================================
// Classification Tests
// ============================================================================

#[test]
fn test_parse_odata_error_extracts_code_and_message() {
    let body = r#"{"error":{"code":"Request_BadRequest","message":"Invalid filter clause."}}"#;
    match parse_odata_error(400, body) {
        Error::Remote { code, message } => {
            assert_eq!(code, "Request_BadRequest");
            assert_eq!(message, "Invalid filter clause.");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn test_parse_odata_error_opaque_body() {
    let err = parse_odata_error(500, "<html>oops</html>");
    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[test]
fn test_normalize_transport_error_has_empty_code() {
    let err = Error::http_status(500, "oops");
    let normalized = RequestError::normalize(&err);
    assert_eq!(normalized.code, "");
    assert!(normalized.message.contains("500"));
}

#[test]
fn test_should_ignore_exact_code() {
    let ignore = IgnoreConfig::new(vec!["Request_ResourceNotFound".to_string()]);
    let err = Error::remote("Request_ResourceNotFound", "gone");
    assert!(ignore.should_ignore(&err));
}

#[test]
fn test_should_ignore_message_substring() {
    let ignore = IgnoreConfig::new(vec!["does not exist".to_string()]);
    let err = Error::remote("Request_ResourceNotFound", "Resource 'x' does not exist.");
    assert!(ignore.should_ignore(&err));
}

#[test]
fn test_should_ignore_rejects_partial_code_match() {
    let ignore = IgnoreConfig::new(vec!["Request_Resource".to_string()]);
    let err = Error::remote("Request_ResourceNotFound", "gone");
    assert!(!ignore.should_ignore(&err));
}

#[test]
fn test_should_ignore_never_matches_transport_errors() {
    let ignore = IgnoreConfig::new(vec!["not found".to_string()]);
    let err = Error::http_status(404, "not found");
    assert!(!ignore.should_ignore(&err));
}
