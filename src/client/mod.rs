//! Graph API client layer
//!
//! [`GraphClient`] issues authenticated requests; `errors` classifies the
//! remote failures that come back.

mod errors;
mod graph;

pub use errors::{parse_odata_error, IgnoreConfig, RequestError};
pub use graph::{GraphClient, ListRequest, MAX_PAGE_SIZE, MIN_PAGE_SIZE};

#[cfg(test)]
mod tests;
