//! Error handling for the dashboard core

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// PostgREST error code for "JSON object requested, multiple (or no) rows returned"
pub const NO_ROWS_CODE: &str = "PGRST116";

/// PostgreSQL error code for a unique constraint violation
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Error body returned by the record store
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreFault {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
    /// HTTP status of the failed request, when the fault came over the wire
    #[serde(skip)]
    pub status: Option<u16>,
}

impl StoreFault {
    /// Create a fault with a code and message
    pub fn new<T: fmt::Display>(code: &str, message: T) -> Self {
        Self {
            code: Some(code.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Create a fault that only carries the raw message
    pub fn raw<T: fmt::Display>(message: T) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// The fault a single-object request reports when no row matched
    pub fn no_rows() -> Self {
        Self {
            code: Some(NO_ROWS_CODE.to_string()),
            message: Some("JSON object requested, multiple (or no) rows returned".to_string()),
            details: Some("The result contains 0 rows".to_string()),
            hint: None,
            status: Some(406),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether the store reported that a single-row request matched nothing
    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS_CODE)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
    }
}

// The store's own message is surfaced verbatim.
impl fmt::Display for StoreFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.code) {
            (Some(message), _) => write!(f, "{}", message),
            (None, Some(code)) => write!(f, "store error {}", code),
            (None, None) => write!(f, "unknown store error"),
        }
    }
}

/// Unified error type for the dashboard core
#[derive(Error, Debug)]
pub enum Error {
    /// No caller identity could be resolved
    #[error("Unauthorized")]
    Unauthorized,

    /// A form field failed validation before any store call was made
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The record store rejected the operation
    #[error("{0}")]
    Store(StoreFault),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Session token errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity provider failed to answer
    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl From<StoreFault> for Error {
    fn from(fault: StoreFault) -> Self {
        Error::Store(fault)
    }
}

impl Error {
    /// Create a new validation error for a field
    pub fn validation<T: fmt::Display>(field: &'static str, msg: T) -> Self {
        Error::Validation {
            field,
            message: msg.to_string(),
        }
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new identity provider error
    pub fn provider<T: fmt::Display>(msg: T) -> Self {
        Error::Provider(msg.to_string())
    }

    /// The store fault behind this error, if any
    pub fn store_fault(&self) -> Option<&StoreFault> {
        match self {
            Error::Store(fault) => Some(fault),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
