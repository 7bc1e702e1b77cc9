// src/error.rs
//! Item-level error taxonomy for a sync run.
//!
//! Both enums are local to one catalog item: the scheduler turns them into a
//! `Failure` via `Display` and moves on. Only a `RepositoryError` raised while
//! listing the catalog escapes `run_price_sync`.

use thiserror::Error;

/// Failure to obtain a valid quote from the pricing provider.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("sku must not be blank")]
    InvalidSku,

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("provider response is not valid JSON: {0}")]
    Decode(String),

    #[error("provider field `{field}` is invalid: {detail}")]
    InvalidField { field: &'static str, detail: String },
}

impl LookupError {
    pub(crate) fn invalid(field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Failure to read from or write to the catalog store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog row {id} does not exist")]
    NotFound { id: String },

    #[error("catalog rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RepositoryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
