//! Graph error classification
//!
//! Error payloads from the Graph API carry a structured `error` object with
//! a `code` and `message`. Responses are normalized into [`RequestError`]
//! so callers can decide which remote failures to tolerate.

use serde::Deserialize;

use crate::error::Error;

/// Normalized remote failure from a Graph API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    /// Stable error code, e.g. `Request_ResourceNotFound`
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl RequestError {
    /// Extract the remote error from a normalized error, if it is one
    pub fn from_error(err: &Error) -> Option<Self> {
        match err {
            Error::Remote { code, message } => Some(Self {
                code: code.clone(),
                message: message.clone(),
            }),
            _ => None,
        }
    }

    /// Normalize any error into a code and message pair.
    ///
    /// Errors without a structured remote body get an empty code and the
    /// error's display text as the message.
    pub fn normalize(err: &Error) -> Self {
        Self::from_error(err).unwrap_or_else(|| Self {
            code: String::new(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    error: ODataError,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Normalize a non-success Graph response into an error.
///
/// Bodies carrying a well-formed OData error object become [`Error::Remote`]
/// with the remote code and message preserved. Anything else falls back to
/// [`Error::HttpStatus`] with the raw body attached.
pub fn parse_odata_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ODataErrorBody>(body) {
        Ok(parsed) if !parsed.error.code.is_empty() || !parsed.error.message.is_empty() => {
            Error::remote(parsed.error.code, parsed.error.message)
        }
        _ => Error::http_status(status, body),
    }
}

/// Patterns of remote errors a caller has chosen to tolerate
#[derive(Debug, Clone, Default)]
pub struct IgnoreConfig {
    patterns: Vec<String>,
}

impl IgnoreConfig {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Whether this error matches a configured pattern.
    ///
    /// Only remote errors are eligible. A pattern matches when it equals the
    /// error code exactly or appears as a substring of the message. Transport
    /// and authentication failures never match.
    pub fn should_ignore(&self, err: &Error) -> bool {
        let Some(remote) = RequestError::from_error(err) else {
            return false;
        };
        self.patterns
            .iter()
            .any(|p| remote.code == *p || remote.message.contains(p.as_str()))
    }
}
