use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Every failure surfaced by the clients, the factory and the parser.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials were rejected or no session could be established.
    /// Only the network client produces this kind.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("not authenticated, call login() first")]
    NotAuthenticated,

    #[error("invalid {field} `{value}`: expected a YYYY-MM-DD date")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid client mode `{0}`: must be 'real' or 'mock'")]
    InvalidMode(String),

    #[error("{context}: {source}")]
    Request {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {endpoint}: {detail}")]
    UnexpectedResponse {
        endpoint: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ClientError {
    pub(crate) fn request(context: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Request { context, source }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// A single reason a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Field name on the wire, or `$` when the failure is not tied to one.
    pub location: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Raised by the parser when a raw record does not validate against a model.
#[derive(Debug, Clone, Error)]
#[error(
    "failed to parse {model}{}: {} validation error(s)",
    .index.map(|idx| format!(" at index {idx}")).unwrap_or_default(),
    .issues.len()
)]
pub struct ParseError {
    model: &'static str,
    index: Option<usize>,
    raw: Value,
    issues: Vec<ValidationIssue>,
}

impl ParseError {
    pub(crate) fn new(model: &'static str, raw: Value, issues: Vec<ValidationIssue>) -> Self {
        Self {
            model,
            index: None,
            raw,
            issues,
        }
    }

    pub(crate) fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn model(&self) -> &'static str {
        self.model
    }

    /// Position of the offending record when it came from a list.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The record exactly as it was received.
    pub fn raw_data(&self) -> &Value {
        &self.raw
    }

    pub fn validation_errors(&self) -> &[ValidationIssue] {
        &self.issues
    }
}
