use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::application::{ChatBackend, PreviewBackend, PromptOrchestrator};
use crate::connector::adapter::{
    Automatic1111PreviewClient, ComfyUiPreviewClient, MockChatBackend, MockPreviewBackend,
    OpenAiChatClient, PreviewParams,
};
use crate::domain::{BackendConfig, PreviewBackendKind, RequestBuilder};

pub struct ContainerConfig {
    pub backends: BackendConfig,
    /// Swap both backends for deterministic in-process mocks.
    pub mock_backends: bool,
    /// Draw an indicatif progress bar during multi-step composition.
    pub show_progress: bool,
}

/// Wires backends and the orchestrator from configuration.
pub struct Container {
    chat_backend: Arc<dyn ChatBackend>,
    preview_backend: Option<Arc<dyn PreviewBackend>>,
    orchestrator: Arc<PromptOrchestrator>,
    config: ContainerConfig,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self> {
        config.backends.validate()?;

        let chat_backend: Arc<dyn ChatBackend> = if config.mock_backends {
            debug!("Using mock chat backend");
            Arc::new(MockChatBackend::new())
        } else {
            debug!(
                "Using chat backend at {}",
                config.backends.chat_completions_url()
            );
            Arc::new(OpenAiChatClient::from_config(&config.backends))
        };

        let preview_backend = Self::preview_backend(&config);

        let mut orchestrator = PromptOrchestrator::new(Arc::clone(&chat_backend))
            .with_builder(RequestBuilder::new(&config.backends.chat_model))
            .with_progress(config.show_progress);
        if let Some(backend) = preview_backend.clone() {
            orchestrator = orchestrator.with_preview_backend(backend);
        }

        Ok(Self {
            chat_backend,
            preview_backend,
            orchestrator: Arc::new(orchestrator),
            config,
        })
    }

    fn preview_backend(config: &ContainerConfig) -> Option<Arc<dyn PreviewBackend>> {
        let backends = &config.backends;
        if !backends.enable_preview {
            return None;
        }
        if config.mock_backends {
            debug!("Using mock preview backend");
            return Some(Arc::new(MockPreviewBackend::new()));
        }
        let url = backends
            .preview_base_url
            .as_deref()
            .filter(|_| backends.preview_available());
        let Some(url) = url else {
            warn!("Preview is enabled but no preview URL is configured; previews are disabled");
            return None;
        };

        let params = PreviewParams::from_config(backends);
        let timeout = backends.request_timeout();
        debug!("Using {} preview backend at {}", backends.preview_backend, url);
        let backend: Arc<dyn PreviewBackend> = match backends.preview_backend {
            PreviewBackendKind::ComfyUi => {
                Arc::new(ComfyUiPreviewClient::new(url, params, timeout))
            }
            PreviewBackendKind::Automatic1111 => {
                Arc::new(Automatic1111PreviewClient::new(url, params, timeout))
            }
        };
        Some(backend)
    }

    pub fn orchestrator(&self) -> Arc<PromptOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn chat_backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.chat_backend)
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview_backend.is_some()
    }

    pub fn preview_backend_name(&self) -> Option<&str> {
        self.preview_backend.as_deref().map(|backend| backend.name())
    }

    pub fn backends(&self) -> &BackendConfig {
        &self.config.backends
    }

    pub fn mock_backends(&self) -> bool {
        self.config.mock_backends
    }
}
