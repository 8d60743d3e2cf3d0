//! Session cache
//!
//! Clients are cached process-wide under a single fixed key. The lock is
//! held across the build future so concurrent first callers resolve exactly
//! one session between them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::GraphClient;
use crate::error::Result;

/// Key under which the resolved session's client is stored
pub const SESSION_CACHE_KEY: &str = "session";

/// Process-wide cache of built Graph clients
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<String, Arc<GraphClient>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached client for `key`, building it if absent.
    ///
    /// The build runs at most once per key; a failed build leaves the cache
    /// empty so the next caller retries.
    pub async fn get_or_create<F, Fut>(&self, key: &str, build: F) -> Result<Arc<GraphClient>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<GraphClient>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(client) = entries.get(key) {
            return Ok(Arc::clone(client));
        }

        debug!(key, "building new session");
        let client = Arc::new(build().await?);
        entries.insert(key.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Get the cached client without building one
    pub async fn get(&self, key: &str) -> Option<Arc<GraphClient>> {
        self.entries.lock().await.get(key).map(Arc::clone)
    }

    /// Drop all cached clients
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
