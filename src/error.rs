//! Typed failures for the generation pipeline.
//!
//! Every stage returns `anyhow::Result`; failures that callers need to branch
//! on carry a [`SiteGenError`] so the kind can be recovered with
//! [`error_kind`] instead of inspecting message text.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credentials, input files or directories. Fatal.
    Setup,
    /// Request failures and unusable model output. Retryable.
    Transient,
    /// Model output that parsed but has no usable shape (empty page list, no hub).
    Structural,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Setup => write!(f, "setup"),
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::Structural => write!(f, "structural"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct SiteGenError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SiteGenError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Setup, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural, message)
    }
}

/// Non-success HTTP response from a model provider.
#[derive(Debug, Clone, Error)]
#[error("{provider} API error {status}: {body}")]
pub struct LlmHttpError {
    pub provider: &'static str,
    pub status: u16,
    pub body: String,
}

/// Find the [`ErrorKind`] attached anywhere in an error chain.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SiteGenError>())
        .map(|e| e.kind)
}

/// True for "service overloaded" class failures: rate limits and
/// temporarily unavailable backends.
pub fn is_overloaded(err: &anyhow::Error) -> bool {
    if let Some(http) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<LlmHttpError>())
    {
        return matches!(http.status, 429 | 503 | 529);
    }
    let text = format!("{:#}", err).to_lowercase();
    text.contains("overloaded") || text.contains("unavailable") || text.contains("resource_exhausted")
}
