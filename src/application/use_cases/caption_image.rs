use std::sync::Arc;

use tracing::{debug, info};

use crate::application::ChatBackend;
use crate::domain::{DomainError, PromptNormalizer, RequestBuilder};

/// Turns an image into description text that can seed a generation.
///
/// The description comes from the chat server's vision model. Boilerplate is
/// stripped the same way facet answers are, and only the first paragraph is
/// kept.
pub struct ImageCaptioner {
    chat_backend: Arc<dyn ChatBackend>,
    builder: RequestBuilder,
    normalizer: PromptNormalizer,
}

impl ImageCaptioner {
    pub fn new(
        chat_backend: Arc<dyn ChatBackend>,
        builder: RequestBuilder,
        normalizer: PromptNormalizer,
    ) -> Self {
        Self {
            chat_backend,
            builder,
            normalizer,
        }
    }

    pub async fn caption(
        &self,
        image: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<String, DomainError> {
        let request = self.builder.caption(image, mime_type)?;
        info!(
            "Captioning {} image ({} bytes) via {}",
            request.mime_type(),
            request.image().len(),
            self.chat_backend.endpoint()
        );

        let raw_text = self.chat_backend.caption(&request).await.into_result()?;
        let caption = self.normalizer.clean_text(&raw_text);
        if caption.is_empty() {
            return Err(DomainError::malformed("empty caption"));
        }

        debug!("Caption: {}", caption);
        Ok(caption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{MockChatBackend, MOCK_CAPTION};
    use crate::domain::BackendFailure;

    const PNG: [u8; 4] = [0x89, b'P', b'N', b'G'];

    fn captioner(backend: Arc<MockChatBackend>) -> ImageCaptioner {
        ImageCaptioner::new(backend, RequestBuilder::default(), PromptNormalizer::new())
    }

    #[tokio::test]
    async fn test_caption_strips_lead_in() {
        let backend = Arc::new(MockChatBackend::new());

        let caption = captioner(backend.clone())
            .caption(PNG.to_vec(), None)
            .await
            .unwrap();

        assert_eq!(caption, MOCK_CAPTION);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_image_skips_backend() {
        let backend = Arc::new(MockChatBackend::new());

        let err = captioner(backend.clone())
            .caption(b"plain text".to_vec(), None)
            .await
            .unwrap_err();

        assert!(err.is_invalid_input());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_mapped() {
        let backend = Arc::new(MockChatBackend::failing(
            BackendFailure::HttpStatus { status: 400 },
            "http 400",
        ));

        let err = captioner(backend)
            .caption(PNG.to_vec(), Some("image/png"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::BackendRejected(ref d) if d == "http 400"));
    }

    #[tokio::test]
    async fn test_blank_answer_is_malformed() {
        let backend = Arc::new(MockChatBackend::replying("Sure!"));

        let err = captioner(backend)
            .caption(PNG.to_vec(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::MalformedResponse(_)));
    }
}
