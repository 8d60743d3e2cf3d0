//! CLI delegate invocation
//!
//! Obtains a Graph token and tenant id from the local `az` helper when no
//! static credential is configured. The helper is invoked with a PATH built
//! only from a fixed default location list plus one operator-overridable
//! variable; the ambient process PATH is never searched, so a planted `az`
//! binary earlier on the caller's PATH cannot be executed.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

/// Env var naming the helper's install directory, consulted ahead of the
/// default location list
pub const CLI_PATH_OVERRIDE: &str = "AzureCLIPath";

#[cfg(not(windows))]
const DEFAULT_CLI_PATH: &str = "/bin:/sbin:/usr/bin:/usr/local/bin";

/// Token response parsed from `az account get-access-token -o json`
#[derive(Debug, Clone, Deserialize)]
pub struct CliToken {
    #[serde(rename = "accessToken")]
    pub access_token: String,

    #[serde(rename = "expiresOn", default)]
    pub expires_on: Option<String>,

    #[serde(default)]
    pub tenant: String,

    #[serde(rename = "tokenType", default)]
    pub token_type: Option<String>,
}

/// Capability seam for CLI token acquisition
///
/// Production uses [`AzureCli`]; tests substitute a fake so no process is
/// ever spawned.
#[async_trait]
pub trait CliTokenProvider: Send + Sync {
    /// Obtain a Graph access token and tenant id from the helper
    async fn access_token(&self) -> Result<CliToken>;
}

/// Invokes the real `az` binary
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureCli;

impl AzureCli {
    /// PATH handed to the helper process
    pub fn restricted_path() -> String {
        Self::restricted_path_from(std::env::var(CLI_PATH_OVERRIDE).ok())
    }

    #[cfg(not(windows))]
    fn restricted_path_from(override_dir: Option<String>) -> String {
        match override_dir {
            Some(dir) if !dir.is_empty() => format!("{dir}:{DEFAULT_CLI_PATH}"),
            _ => DEFAULT_CLI_PATH.to_string(),
        }
    }

    #[cfg(windows)]
    fn restricted_path_from(override_dir: Option<String>) -> String {
        let program_files = std::env::var("ProgramFiles").unwrap_or_default();
        let program_files_x86 = std::env::var("ProgramFiles(x86)").unwrap_or_default();
        let defaults = format!(
            "{program_files_x86}\\Microsoft SDKs\\Azure\\CLI2\\wbin;{program_files}\\Microsoft SDKs\\Azure\\CLI2\\wbin"
        );
        match override_dir {
            Some(dir) if !dir.is_empty() => format!("{dir};{defaults}"),
            _ => defaults,
        }
    }

    #[cfg(not(windows))]
    fn command() -> Command {
        let mut cmd = Command::new("az");
        cmd.env("PATH", Self::restricted_path());
        cmd
    }

    #[cfg(windows)]
    fn command() -> Command {
        let windir = std::env::var("windir").unwrap_or_default();
        let mut cmd = Command::new(format!("{windir}\\system32\\cmd.exe"));
        cmd.args(["/c", "az"]);
        cmd.env("PATH", Self::restricted_path());
        cmd
    }
}

#[async_trait]
impl CliTokenProvider for AzureCli {
    async fn access_token(&self) -> Result<CliToken> {
        let output = Self::command()
            .args([
                "account",
                "get-access-token",
                "--resource-type=ms-graph",
                "-o",
                "json",
            ])
            .output()
            .await
            .map_err(|e| Error::cli_helper(format!("failed to invoke az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::cli_helper(format!(
                "az exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::cli_helper(format!("unparsable az output: {e}")))
    }
}
