use std::fmt;

use serde::Serialize;

use super::{NormalizationWarning, NormalizedPrompt, PreviewResult};

/// Which entry point a session error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Generate,
    Preview,
}

/// Orchestrator lifecycle.
///
/// `Idle -> Building -> AwaitingCompletion -> Normalizing -> Ready`
/// then optionally `Ready -> AwaitingPreview -> PreviewReady`.
/// `Error` is reachable from every in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Building,
    AwaitingCompletion,
    Normalizing,
    Ready,
    AwaitingPreview,
    PreviewReady,
    Error(FailureStage),
}

impl SessionState {
    /// A backend call (or the work around it) is pending.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Building | Self::AwaitingCompletion | Self::Normalizing | Self::AwaitingPreview
        )
    }

    pub fn accepts_preview(&self) -> bool {
        matches!(self, Self::Ready | Self::PreviewReady)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::AwaitingCompletion => "awaiting_completion",
            Self::Normalizing => "normalizing",
            Self::Ready => "ready",
            Self::AwaitingPreview => "awaiting_preview",
            Self::PreviewReady => "preview_ready",
            Self::Error(FailureStage::Generate) => "error",
            Self::Error(FailureStage::Preview) => "preview_error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable failure held by the session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
    pub stage: FailureStage,
    pub message: String,
    pub detail: String,
}

/// Read-only copy of the session handed to presentation layers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub prompt: Option<NormalizedPrompt>,
    pub warning: Option<NormalizationWarning>,
    pub last_error: Option<SessionError>,
    pub preview: Option<PreviewResult>,
}

impl SessionSnapshot {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            prompt: None,
            warning: None,
            last_error: None,
            preview: None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.detail.as_str())
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
