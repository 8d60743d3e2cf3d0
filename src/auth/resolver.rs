//! Credential resolution
//!
//! Selects exactly one authentication method from the merged configuration
//! using a fixed precedence. Partially specified tiers fall through to the
//! next tier instead of erroring.

use crate::config::MergedConfig;
use tracing::debug;

/// The selected authentication method, immutable once chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Client secret (tenant + client id + secret)
    Secret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },

    /// Client certificate (tenant + client id + PEM path, optional password)
    Certificate {
        tenant_id: String,
        client_id: String,
        certificate_path: String,
        certificate_password: Option<String>,
    },

    /// Managed identity via the instance-metadata endpoint
    ManagedIdentity {
        endpoint: String,
        client_id: Option<String>,
    },

    /// Delegate to the local `az` helper process
    CliDelegate,
}

impl Credential {
    /// Resolve a credential from merged config + environment
    ///
    /// Precedence: secret, certificate, managed identity, CLI delegate.
    /// An empty tenant short-circuits to the CLI delegate regardless of any
    /// other populated fields, matching the upstream behavior.
    pub fn resolve(config: &MergedConfig) -> Credential {
        let credential = if config.tenant_id.is_empty() {
            Credential::CliDelegate
        } else if !config.client_id.is_empty() && !config.client_secret.is_empty() {
            Credential::Secret {
                tenant_id: config.tenant_id.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }
        } else if !config.client_id.is_empty() && !config.certificate_path.is_empty() {
            Credential::Certificate {
                tenant_id: config.tenant_id.clone(),
                client_id: config.client_id.clone(),
                certificate_path: config.certificate_path.clone(),
                certificate_password: (!config.certificate_password.is_empty())
                    .then(|| config.certificate_password.clone()),
            }
        } else if config.enable_msi {
            Credential::ManagedIdentity {
                endpoint: config.msi_endpoint.clone(),
                client_id: (!config.client_id.is_empty()).then(|| config.client_id.clone()),
            }
        } else {
            Credential::CliDelegate
        };

        debug!(method = credential.method_name(), "resolved credential");
        credential
    }

    /// Short name of the selected method, for logging
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Secret { .. } => "client_secret",
            Self::Certificate { .. } => "client_certificate",
            Self::ManagedIdentity { .. } => "managed_identity",
            Self::CliDelegate => "cli",
        }
    }
}
