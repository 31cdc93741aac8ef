use async_trait::async_trait;

use crate::domain::{BackendStatus, CaptionRequest, ChatCompletionResult, GenerationRequest};

/// Sends chat requests to a language-model server.
///
/// Implementors own transport, serialization and timeout handling. Every
/// failure (timeout, refused connection, bad status, unexpected body) comes
/// back as a failed [`ChatCompletionResult`]; nothing is raised across this
/// boundary. One call issues at most one outbound request and never retries.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> ChatCompletionResult;

    /// Describe an image. Needs a vision-capable model on the server; a text
    /// only model typically answers with an HTTP error.
    async fn caption(&self, request: &CaptionRequest) -> ChatCompletionResult;

    /// Cheap reachability check, used by `check` and at startup.
    async fn probe(&self) -> BackendStatus;

    /// Endpoint description for logs and status lines.
    fn endpoint(&self) -> &str;
}
