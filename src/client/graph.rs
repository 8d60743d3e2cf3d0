//! Graph API client
//!
//! Thin resource-oriented client over the Microsoft Graph v1.0 surface.
//! Requests carry a bearer token obtained from the session's [`Authorizer`];
//! list responses are exposed as [`CollectionPage`]s so callers can stream
//! them through a [`PageIterator`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::Authorizer;
use crate::client::errors::{parse_odata_error, IgnoreConfig};
use crate::error::{Error, Result};
use crate::filter::{build_filter, Qual};
use crate::paging::{CollectionPage, PageIterator, PageSource, RowBudget};
use crate::session::Session;

/// Smallest page size the Graph API accepts for `$top`
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest page size the Graph API accepts for `$top`
pub const MAX_PAGE_SIZE: u32 = 999;

/// Parameters for a collection listing
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// OData `$filter` expression
    pub filter: Option<String>,
    /// Requested page size, clamped to the accepted range
    pub top: Option<u32>,
}

impl ListRequest {
    /// Build a request whose filter is synthesized from quals, with an
    /// optional raw override
    pub fn from_quals(quals: &[Qual], raw: Option<&str>) -> Self {
        Self {
            filter: build_filter(quals, raw),
            top: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }
}

/// Authenticated client bound to one tenant and one Graph endpoint
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: Client,
    authorizer: Arc<Authorizer>,
    tenant_id: String,
    base_url: String,
}

impl GraphClient {
    /// Build a client from a resolved session
    pub fn new(session: &Session) -> Self {
        let base_url = format!("{}/v1.0", session.environment().graph_endpoint());
        Self {
            http: Client::new(),
            authorizer: Arc::clone(session.authorizer()),
            tenant_id: session.tenant_id().to_string(),
            base_url,
        }
    }

    /// Override the base URL (mock Graph endpoints)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Tenant this client is scoped to
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Fetch the first page of a collection resource
    pub async fn list(&self, resource: &str, request: &ListRequest) -> Result<CollectionPage> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, resource))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(filter) = request.filter.as_deref() {
                query.append_pair("$filter", filter);
            }
            if let Some(top) = request.top {
                let top = top.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
                query.append_pair("$top", &top.to_string());
            }
        }
        debug!(resource, url = %url, "listing collection");
        let body = self.get_json(url).await?;
        Ok(CollectionPage::from_response(body))
    }

    /// Stream every item of a collection through `visit`, following
    /// `@odata.nextLink` cursors until the collection or the row budget is
    /// exhausted. Returns the number of items emitted.
    pub async fn list_each<F>(
        &self,
        resource: &str,
        request: &ListRequest,
        budget: &dyn RowBudget,
        visit: F,
    ) -> Result<u64>
    where
        F: FnMut(&Value),
    {
        let first = self.list(resource, request).await?;
        let mut iter = PageIterator::new(self, first);
        iter.for_each(budget, visit).await
    }

    /// Fetch a single object by id
    pub async fn get(&self, resource: &str, id: &str) -> Result<Value> {
        let url = Url::parse(&format!("{}/{}/{}", self.base_url, resource, id))?;
        debug!(resource, id, "fetching object");
        self.get_json(url).await
    }

    /// Fetch a single object, converting tolerated remote errors to `None`.
    ///
    /// A remote error matching the ignore configuration yields `Ok(None)`;
    /// everything else propagates unchanged.
    pub async fn get_or_ignore(
        &self,
        resource: &str,
        id: &str,
        ignore: &IgnoreConfig,
    ) -> Result<Option<Value>> {
        match self.get(resource, id).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if ignore.should_ignore(&err) => {
                debug!(resource, id, error = %err, "ignoring remote error");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        let token = self.authorizer.bearer_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("ConsistencyLevel", "eventual")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_odata_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(Error::from)
    }
}

#[async_trait]
impl PageSource for GraphClient {
    async fn fetch(&self, next_link: &str) -> Result<CollectionPage> {
        let url = Url::parse(next_link)?;
        debug!(url = %url, "following next link");
        let body = self.get_json(url).await?;
        Ok(CollectionPage::from_response(body))
    }
}
