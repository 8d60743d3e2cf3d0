//! Authorizer implementation
//!
//! Turns a resolved [`Credential`] into bearer tokens for Graph requests,
//! caching the token and refreshing it when expired. Token refresh is this
//! component's own responsibility; sessions built on top are never
//! invalidated.

use super::cli::CliTokenProvider;
use super::resolver::Credential;
use crate::config::CloudEnvironment;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Authorizer produces bearer tokens for one selected credential
pub struct Authorizer {
    /// Selected credential
    credential: Credential,
    /// Cloud environment (token endpoints, Graph scope)
    environment: CloudEnvironment,
    /// Login authority, overridable for sovereign or test endpoints
    authority: String,
    /// CLI delegate capability
    cli: Arc<dyn CliTokenProvider>,
    /// Cached token
    cached_token: RwLock<Option<CachedToken>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authorizer {
    /// Create a new authorizer for the given credential
    pub fn new(
        credential: Credential,
        environment: CloudEnvironment,
        cli: Arc<dyn CliTokenProvider>,
    ) -> Self {
        Self {
            credential,
            environment,
            authority: environment.authority().to_string(),
            cli,
            cached_token: RwLock::new(None),
            http_client: Client::new(),
        }
    }

    /// Override the login authority (custom or mock token endpoints)
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Get the selected credential
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Get a valid bearer token, refreshing if necessary
    pub async fn bearer_token(&self) -> Result<String> {
        // Check if we have a valid cached token
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        // Need to refresh - acquire write lock
        let mut cached = self.cached_token.write().await;

        // Double-check after acquiring write lock (another task might have refreshed)
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_new_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Clear the cached token (forced refresh)
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, tenant_id)
    }

    /// Fetch a new token for the selected credential
    async fn fetch_new_token(&self) -> Result<CachedToken> {
        match &self.credential {
            Credential::Secret {
                tenant_id,
                client_id,
                client_secret,
            } => {
                self.fetch_secret_token(tenant_id, client_id, client_secret)
                    .await
            }

            Credential::Certificate {
                tenant_id,
                client_id,
                certificate_path,
                certificate_password,
            } => {
                self.fetch_certificate_token(
                    tenant_id,
                    client_id,
                    certificate_path,
                    certificate_password.as_deref(),
                )
                .await
            }

            Credential::ManagedIdentity {
                endpoint,
                client_id,
            } => self.fetch_msi_token(endpoint, client_id.as_deref()).await,

            Credential::CliDelegate => self.fetch_cli_token().await,
        }
    }

    /// OAuth2 client-credentials flow with a shared secret
    async fn fetch_secret_token(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<CachedToken> {
        let form = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
            ("scope", self.environment.graph_scope()),
        ];

        self.post_token_form(&self.token_url(tenant_id), &form).await
    }

    /// OAuth2 client-credentials flow with a signed client assertion
    async fn fetch_certificate_token(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate_path: &str,
        certificate_password: Option<&str>,
    ) -> Result<CachedToken> {
        if certificate_password.is_some() {
            return Err(Error::auth(
                "encrypted certificate keys are not supported; provide an unencrypted PEM",
            ));
        }

        let pem = tokio::fs::read(certificate_path).await.map_err(|e| {
            Error::auth(format!("error reading certificate from {certificate_path}: {e}"))
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(&pem).map_err(|e| {
            Error::auth(format!("error parsing certificate from {certificate_path}: {e}"))
        })?;

        let token_url = self.token_url(tenant_id);
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: token_url.clone(),
            jti: format!("{client_id}-{}", Utc::now().timestamp_nanos_opt().unwrap_or(now)),
            iat: now,
            nbf: now,
            exp: now + 600,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| Error::auth(format!("failed to sign client assertion: {e}")))?;

        let form = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", client_id.to_string()),
            ("scope", self.environment.graph_scope()),
            (
                "client_assertion_type",
                "urn:ietf:params:oauth:client-assertion-type:jwt-bearer".to_string(),
            ),
            ("client_assertion", assertion),
        ];

        self.post_token_form(&token_url, &form).await
    }

    /// Token from the instance-metadata endpoint
    async fn fetch_msi_token(
        &self,
        endpoint: &str,
        client_id: Option<&str>,
    ) -> Result<CachedToken> {
        let mut query = vec![
            ("api-version", "2018-02-01".to_string()),
            ("resource", self.environment.graph_endpoint().to_string()),
        ];
        if let Some(client_id) = client_id {
            query.push(("client_id", client_id.to_string()));
        }

        let response = self
            .http_client
            .get(endpoint)
            .header("Metadata", "true")
            .query(&query)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "managed identity token request failed with status {status}: {body}"
            )));
        }

        let token_response: MsiTokenResponse = response.json().await.map_err(Error::Http)?;
        Ok(token_response.into_cached_token())
    }

    /// Token from the CLI delegate
    async fn fetch_cli_token(&self) -> Result<CachedToken> {
        let cli_token = self.cli.access_token().await?;
        let expires_at = cli_token.expires_on.as_deref().and_then(parse_cli_expiry);
        Ok(CachedToken::new(cli_token.access_token, expires_at))
    }

    async fn post_token_form(&self, url: &str, form: &[(&str, String)]) -> Result<CachedToken> {
        let response = self
            .http_client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        Ok(token_response.into_cached_token())
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("method", &self.credential.method_name())
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}

/// Instance-metadata token response; `expires_in` arrives as a string
#[derive(Debug, Deserialize)]
struct MsiTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl MsiTokenResponse {
    fn into_cached_token(self) -> CachedToken {
        let secs = self.expires_in.and_then(|v| match v {
            serde_json::Value::String(s) => s.parse::<i64>().ok(),
            serde_json::Value::Number(n) => n.as_i64(),
            _ => None,
        });
        match secs {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}

/// Client-assertion claims for certificate auth
#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    jti: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

/// Parse the helper's `expiresOn` timestamp
///
/// `az` emits local time without an offset; parsed as UTC.
fn parse_cli_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod token_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_parse_cli_expiry() {
        assert!(parse_cli_expiry("2023-06-01 12:00:00.000000").is_some());
        assert!(parse_cli_expiry("2023-06-01T12:00:00+00:00").is_some());
        assert!(parse_cli_expiry("not a timestamp").is_none());
    }
}
