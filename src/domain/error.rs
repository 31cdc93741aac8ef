use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Backend error: {0}")]
    BackendRejected(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Preview disabled: {0}")]
    PreviewDisabled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::BackendUnreachable(msg.into())
    }

    /// A reachable backend answered with a non-success status.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::BackendRejected(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    pub fn preview_disabled(msg: impl Into<String>) -> Self {
        Self::PreviewDisabled(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The message without the variant prefix, e.g. `timeout`.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidInput(msg)
            | Self::BackendUnreachable(msg)
            | Self::BackendRejected(msg)
            | Self::MalformedResponse(msg)
            | Self::Busy(msg)
            | Self::NotReady(msg)
            | Self::PreviewDisabled(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::IoError(e) => e.to_string(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// True for failures that originate in a backend call rather than in
    /// the caller's input or the session state.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::BackendUnreachable(_) | Self::BackendRejected(_) | Self::MalformedResponse(_)
        )
    }
}
