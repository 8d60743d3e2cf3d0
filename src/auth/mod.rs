//! Authentication module
//!
//! Supports: client secret, client certificate, managed identity, CLI delegate
//!
//! [`Credential::resolve`] picks exactly one method by fixed precedence;
//! [`Authorizer`] turns the selection into cached bearer tokens.

mod authorizer;
mod cli;
mod resolver;

pub use authorizer::{Authorizer, CachedToken};
pub use cli::{AzureCli, CliToken, CliTokenProvider, CLI_PATH_OVERRIDE};
pub use resolver::Credential;

#[cfg(test)]
mod tests;
