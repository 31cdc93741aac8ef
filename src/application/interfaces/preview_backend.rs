use async_trait::async_trait;

use crate::domain::{NormalizedPrompt, PreviewResult};

/// Renders a preview image for a finished prompt on a local image server.
///
/// Generation parameters are fixed by the implementation. Failures are
/// returned as a failed [`PreviewResult`], never raised.
#[async_trait]
pub trait PreviewBackend: Send + Sync {
    async fn render_preview(&self, prompt: &NormalizedPrompt) -> PreviewResult;

    fn name(&self) -> &str;
}
