//! Connection configuration
//!
//! Declared settings merged with `AZURE_*` environment variables. The merged
//! view is read-only for the rest of the process; credential selection only
//! ever sees `MergedConfig`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable prefix for config overrides
pub const ENV_PREFIX: &str = "AZURE_";

/// Default instance-metadata endpoint for managed identity tokens
pub const DEFAULT_MSI_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

// ============================================================================
// Declared Config
// ============================================================================

/// Connection configuration as declared (YAML or built in code)
///
/// Every field is optional; anything left unset falls back to the
/// same-named `AZURE_*` environment variable when merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Azure AD tenant (directory) ID
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Application (client) ID
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for secret-based auth
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Path to a PEM certificate/key file for certificate-based auth
    #[serde(default)]
    pub certificate_path: Option<String>,

    /// Password for the certificate key, if encrypted
    #[serde(default)]
    pub certificate_password: Option<String>,

    /// Cloud environment name (e.g. "AZUREPUBLICCLOUD", "AZURECHINACLOUD")
    #[serde(default)]
    pub environment: Option<String>,

    /// Enable managed-identity authentication
    #[serde(default)]
    pub enable_msi: Option<bool>,

    /// Managed-identity token endpoint override
    #[serde(default)]
    pub msi_endpoint: Option<String>,
}

impl ConnectionConfig {
    /// Parse a connection config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Merge declared values with the process environment
    ///
    /// A declared value always wins over its environment variable, even when
    /// declared empty.
    pub fn merged(&self) -> MergedConfig {
        self.merged_with(|var| env::var(var).ok())
    }

    /// Merge with an explicit environment lookup (tests inject fakes here)
    pub fn merged_with<F>(&self, lookup: F) -> MergedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |declared: &Option<String>, name: &str| -> String {
            declared
                .clone()
                .or_else(|| lookup(&format!("{ENV_PREFIX}{name}")))
                .unwrap_or_default()
        };

        let enable_msi = self.enable_msi.unwrap_or_else(|| {
            lookup(&format!("{ENV_PREFIX}ENABLE_MSI"))
                .map(|v| matches!(v.as_str(), "true" | "1"))
                .unwrap_or(false)
        });

        let msi_endpoint = {
            let endpoint = get(&self.msi_endpoint, "MSI_ENDPOINT");
            if endpoint.is_empty() {
                DEFAULT_MSI_ENDPOINT.to_string()
            } else {
                endpoint
            }
        };

        MergedConfig {
            tenant_id: get(&self.tenant_id, "TENANT_ID"),
            client_id: get(&self.client_id, "CLIENT_ID"),
            client_secret: get(&self.client_secret, "CLIENT_SECRET"),
            certificate_path: get(&self.certificate_path, "CERTIFICATE_PATH"),
            certificate_password: get(&self.certificate_password, "CERTIFICATE_PASSWORD"),
            environment: CloudEnvironment::from_name(&get(&self.environment, "ENVIRONMENT")),
            enable_msi,
            msi_endpoint,
        }
    }
}

// ============================================================================
// Merged Config
// ============================================================================

/// Configuration after environment overlay, immutable per resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub certificate_path: String,
    pub certificate_password: String,
    pub environment: CloudEnvironment,
    pub enable_msi: bool,
    pub msi_endpoint: String,
}

// ============================================================================
// Cloud Environment
// ============================================================================

/// Azure cloud environment, selecting login and Graph endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudEnvironment {
    #[default]
    Public,
    China,
    UsGovernment,
    Germany,
}

impl CloudEnvironment {
    /// Parse the original environment names; anything unknown maps to Public
    pub fn from_name(name: &str) -> Self {
        match name {
            "AZURECHINACLOUD" => Self::China,
            "AZUREUSGOVERNMENTCLOUD" => Self::UsGovernment,
            "AZUREGERMANCLOUD" => Self::Germany,
            _ => Self::Public,
        }
    }

    /// Login authority host
    pub fn authority(&self) -> &'static str {
        match self {
            Self::Public => "https://login.microsoftonline.com",
            Self::China => "https://login.chinacloudapi.cn",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::Germany => "https://login.microsoftonline.de",
        }
    }

    /// Graph API endpoint
    pub fn graph_endpoint(&self) -> &'static str {
        match self {
            Self::Public => "https://graph.microsoft.com",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::Germany => "https://graph.microsoft.de",
        }
    }

    /// OAuth2 scope for Graph client-credential tokens
    pub fn graph_scope(&self) -> String {
        format!("{}/.default", self.graph_endpoint())
    }

    /// Token endpoint for a tenant
    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority(), tenant_id)
    }
}
