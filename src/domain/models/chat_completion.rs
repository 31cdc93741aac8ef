use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Why a backend call did not produce a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendFailure {
    Timeout,
    Unreachable,
    HttpStatus { status: u16 },
    MalformedResponse,
}

impl BackendFailure {
    /// Lift the failure into the error taxonomy, keeping the detail text.
    pub fn into_error(self, detail: &str) -> DomainError {
        match self {
            Self::Timeout | Self::Unreachable => DomainError::unreachable(detail),
            Self::HttpStatus { .. } => DomainError::rejected(detail),
            Self::MalformedResponse => DomainError::malformed(detail),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::HttpStatus { status } => write!(f, "http {}", status),
            Self::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// Outcome of one chat-completion call. Failures are carried as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResult {
    raw_text: String,
    success: bool,
    error_detail: Option<String>,
    failure: Option<BackendFailure>,
}

impl ChatCompletionResult {
    pub fn success(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            success: true,
            error_detail: None,
            failure: None,
        }
    }

    pub fn failure(failure: BackendFailure, detail: impl Into<String>) -> Self {
        Self {
            raw_text: String::new(),
            success: false,
            error_detail: Some(detail.into()),
            failure: Some(failure),
        }
    }

    /// A timed-out call. The detail is always exactly `timeout`.
    pub fn timeout() -> Self {
        Self::failure(BackendFailure::Timeout, "timeout")
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn failure_kind(&self) -> Option<&BackendFailure> {
        self.failure.as_ref()
    }

    /// Unwrap into the raw text or the mapped domain error.
    pub fn into_result(self) -> Result<String, DomainError> {
        if self.success {
            return Ok(self.raw_text);
        }
        let detail = self
            .error_detail
            .unwrap_or_else(|| "chat backend failed".to_string());
        Err(self
            .failure
            .unwrap_or(BackendFailure::Unreachable)
            .into_error(&detail))
    }
}

/// Result of a connectivity probe against the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub endpoint: String,
    pub reachable: bool,
    pub models: Vec<String>,
    pub detail: Option<String>,
}

impl BackendStatus {
    pub fn up(endpoint: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reachable: true,
            models,
            detail: None,
        }
    }

    pub fn down(endpoint: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reachable: false,
            models: Vec::new(),
            detail: Some(detail.into()),
        }
    }
}
