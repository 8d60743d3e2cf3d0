// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # adgraph
//!
//! An async client core for Microsoft Entra ID (Azure AD) over the Microsoft
//! Graph API: credential resolution, token acquisition, cached sessions, and
//! filtered, budget-aware collection paging.
//!
//! ## Features
//!
//! - **Credential Resolution**: Client secret, client certificate, managed
//!   identity, and Azure CLI delegation, selected from one configuration
//! - **Sovereign Clouds**: Public, China, US Government, and Germany endpoints
//! - **Cached Sessions**: One resolved session per connection, shared safely
//!   across concurrent callers
//! - **OData Paging**: `@odata.nextLink` cursors streamed under a caller-owned
//!   row budget that stops fetching the moment it is spent
//! - **Filter Building**: Typed qualifiers rendered into deterministic OData
//!   `$filter` expressions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use adgraph::{ConnectionConfig, ConnectionContext, ListRequest, Result, Unlimited};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Environment variables fill in anything the YAML leaves out
//!     let config = ConnectionConfig::from_yaml("tenant_id: \"...\"")?;
//!     let ctx = ConnectionContext::new(config);
//!
//!     // Resolves the credential once, then reuses the session
//!     let client = ctx.client().await?;
//!     client
//!         .list_each("users", &ListRequest::default(), &Unlimited, |user| {
//!             println!("{}", user["displayName"]);
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Connection configuration and cloud environments
pub mod config;

/// Credential resolution and token acquisition
pub mod auth;

/// OData filter construction
pub mod filter;

/// Graph API client and error classification
pub mod client;

/// Cursor paging under a row budget
pub mod paging;

/// Session resolution and caching
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result, ResultExt};

// Re-export commonly used types
pub use client::{GraphClient, IgnoreConfig, ListRequest};
pub use config::{CloudEnvironment, ConnectionConfig};
pub use filter::{build_filter, Qual, QualValue, QueryOperator};
pub use paging::{PageIterator, RowBudget, RowLimit, Unlimited};
pub use session::{ConnectionContext, Session};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
