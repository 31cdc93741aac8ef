use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ChatBackend;
use crate::domain::{
    BackendFailure, BackendStatus, CaptionRequest, ChatCompletionResult, GenerationRequest,
};

/// Echo reply to `caption`.
pub const MOCK_CAPTION: &str =
    "a woman in a long dark coat standing in neon-lit rain, short silver hair, determined expression";

enum Reply {
    /// A chatty answer built around the character name.
    Echo,
    /// Replies in order; the last one repeats once the script runs out.
    Scripted(Vec<ChatCompletionResult>),
}

/// Deterministic in-process chat backend for tests and `--mock-backends`.
pub struct MockChatBackend {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
    last_caption: Mutex<Option<CaptionRequest>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::with_reply(Reply::Echo)
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::scripted(vec![ChatCompletionResult::success(text)])
    }

    pub fn failing(failure: BackendFailure, detail: impl Into<String>) -> Self {
        Self::scripted(vec![ChatCompletionResult::failure(failure, detail)])
    }

    pub fn scripted(results: Vec<ChatCompletionResult>) -> Self {
        if results.is_empty() {
            return Self::new();
        }
        Self::with_reply(Reply::Scripted(results))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            last_caption: Mutex::new(None),
        }
    }

    /// Sleep before answering, to hold a call in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` and `caption` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().clone()
    }

    pub fn last_caption(&self) -> Option<CaptionRequest> {
        self.last_caption.lock().clone()
    }

    /// Count the call, wait out the delay, and return the script index.
    async fn enter(&self) -> usize {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        index
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn complete(&self, request: &GenerationRequest) -> ChatCompletionResult {
        *self.last_request.lock() = Some(request.clone());
        let index = self.enter().await;

        match &self.reply {
            Reply::Echo => ChatCompletionResult::success(format!(
                "Sure! Here's your prompt: {}, cinematic portrait, dramatic lighting, shallow depth of field",
                request.character_name()
            )),
            Reply::Scripted(results) => results[index.min(results.len() - 1)].clone(),
        }
    }

    async fn caption(&self, request: &CaptionRequest) -> ChatCompletionResult {
        *self.last_caption.lock() = Some(request.clone());
        let index = self.enter().await;

        match &self.reply {
            Reply::Echo => {
                ChatCompletionResult::success(format!("Here is a description: {}", MOCK_CAPTION))
            }
            Reply::Scripted(results) => results[index.min(results.len() - 1)].clone(),
        }
    }

    async fn probe(&self) -> BackendStatus {
        BackendStatus::up(self.endpoint(), vec!["mock-model".to_string()])
    }

    fn endpoint(&self) -> &str {
        "mock://chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequestBuilder, StyleOptions};

    fn request() -> GenerationRequest {
        RequestBuilder::default()
            .build("Kaito", &StyleOptions::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_script_repeats_last_reply() {
        let backend = MockChatBackend::scripted(vec![
            ChatCompletionResult::timeout(),
            ChatCompletionResult::success("ninja, rooftops"),
        ]);

        assert!(!backend.complete(&request()).await.is_success());
        assert_eq!(backend.complete(&request()).await.raw_text(), "ninja, rooftops");
        assert_eq!(backend.complete(&request()).await.raw_text(), "ninja, rooftops");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_caption_records_request() {
        let backend = MockChatBackend::new();
        let request = RequestBuilder::default()
            .caption(vec![0x89, b'P', b'N', b'G'], None)
            .unwrap();

        let result = backend.caption(&request).await;

        assert!(result.raw_text().ends_with(MOCK_CAPTION));
        assert_eq!(
            backend.last_caption().map(|r| r.mime_type().to_string()),
            Some("image/png".to_string())
        );
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_echo_mentions_character() {
        let backend = MockChatBackend::new();
        let result = backend.complete(&request()).await;

        assert!(result.raw_text().contains("Kaito"));
        assert_eq!(
            backend.last_request().map(|r| r.character_name().to_string()),
            Some("Kaito".to_string())
        );
    }
}
