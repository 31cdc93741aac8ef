use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::PreviewBackend;
use crate::domain::{BackendFailure, ImageRef, NormalizedPrompt, PreviewResult};

/// 1x1 transparent PNG.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// In-process preview backend. Succeeds with a placeholder image unless
/// built with [`MockPreviewBackend::failing`].
pub struct MockPreviewBackend {
    result: PreviewResult,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockPreviewBackend {
    pub fn new() -> Self {
        Self::returning(PreviewResult::success(ImageRef::png(PLACEHOLDER_PNG.to_vec())))
    }

    pub fn failing(failure: BackendFailure, detail: impl Into<String>) -> Self {
        Self::returning(PreviewResult::failure(failure, detail))
    }

    pub fn returning(result: PreviewResult) -> Self {
        Self {
            result,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPreviewBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreviewBackend for MockPreviewBackend {
    async fn render_preview(&self, _prompt: &NormalizedPrompt) -> PreviewResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
