//! Session resolution and caching
//!
//! A [`Session`] binds a resolved credential to a tenant and cloud
//! environment. [`ConnectionContext`] owns the connection configuration and
//! hands out a cached [`GraphClient`] built from it.

mod cache;

pub use cache::{SessionCache, SESSION_CACHE_KEY};

use std::sync::Arc;

use tracing::debug;

use crate::auth::{Authorizer, AzureCli, CliTokenProvider, Credential};
use crate::client::GraphClient;
use crate::config::{CloudEnvironment, ConnectionConfig, MergedConfig};
use crate::error::Result;

/// A resolved authentication session for one tenant
#[derive(Debug)]
pub struct Session {
    tenant_id: String,
    environment: CloudEnvironment,
    authorizer: Arc<Authorizer>,
}

impl Session {
    /// Resolve a credential from the merged configuration and build the
    /// session around it.
    ///
    /// When the CLI delegate is selected and no tenant is configured, the
    /// tenant is taken from the CLI token itself.
    pub async fn connect(config: &MergedConfig, cli: Arc<dyn CliTokenProvider>) -> Result<Self> {
        let credential = Credential::resolve(config);
        let environment = config.environment;
        debug!(environment = ?environment, "connecting session");

        let tenant_id = if config.tenant_id.is_empty() {
            match &credential {
                Credential::CliDelegate => cli.access_token().await?.tenant,
                _ => String::new(),
            }
        } else {
            config.tenant_id.clone()
        };

        let authorizer = Arc::new(Authorizer::new(credential, environment, cli));
        Ok(Self {
            tenant_id,
            environment,
            authorizer,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn environment(&self) -> CloudEnvironment {
        self.environment
    }

    pub fn authorizer(&self) -> &Arc<Authorizer> {
        &self.authorizer
    }
}

/// Per-connection state: configuration plus the cached client built from it
pub struct ConnectionContext {
    config: ConnectionConfig,
    cache: SessionCache,
    cli: Arc<dyn CliTokenProvider>,
}

impl ConnectionContext {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            cache: SessionCache::new(),
            cli: Arc::new(AzureCli),
        }
    }

    /// Substitute the CLI delegate (fake providers in tests)
    #[must_use]
    pub fn with_cli_provider(mut self, cli: Arc<dyn CliTokenProvider>) -> Self {
        self.cli = cli;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// An already-cached client keeps serving until the cache is cleared;
    /// the new configuration only affects the next session build.
    pub fn replace_config(&mut self, config: ConnectionConfig) {
        self.config = config;
    }

    /// Get the Graph client for this connection, resolving the session on
    /// first use and reusing it afterwards.
    pub async fn client(&self) -> Result<Arc<GraphClient>> {
        let merged = self.config.merged();
        let cli = Arc::clone(&self.cli);
        self.cache
            .get_or_create(SESSION_CACHE_KEY, || async move {
                let session = Session::connect(&merged, cli).await?;
                Ok(GraphClient::new(&session))
            })
            .await
    }

    /// Drop the cached session so the next call re-resolves
    pub async fn reset(&self) {
        self.cache.clear().await;
    }
}
