use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::{ChatBackend, CinematicComposer, ImageCaptioner, PreviewBackend};
use crate::domain::{
    CinematicPrompt, DomainError, FailureStage, NormalizationWarning, NormalizedPrompt,
    PreviewResult, PromptNormalizer, RequestBuilder, SessionError, SessionSnapshot, SessionState,
    StyleOptions,
};

/// What a finished `generate` or `compose` hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub prompt: NormalizedPrompt,
    pub warning: Option<NormalizationWarning>,
    /// Text as the model returned it (or the rendered structure for `compose`).
    pub raw_text: String,
    pub fingerprint: Option<String>,
    pub structure: Option<CinematicPrompt>,
}

impl GenerationOutcome {
    pub fn is_fallback(&self) -> bool {
        self.warning == Some(NormalizationWarning::Fallback)
    }
}

/// Single owner of session state.
///
/// Runs `build -> complete -> normalize` for `generate`, the facet chain for
/// `compose`, and `render_preview` for `preview`. Every backend failure ends
/// in an `Error` state with a message and detail recorded on the session.
/// Only one call may be in flight at a time; a second one is rejected with
/// [`DomainError::Busy`] before any backend is contacted.
pub struct PromptOrchestrator {
    builder: RequestBuilder,
    normalizer: PromptNormalizer,
    chat_backend: Arc<dyn ChatBackend>,
    preview_backend: Option<Arc<dyn PreviewBackend>>,
    show_progress: bool,
    session: RwLock<SessionSnapshot>,
}

impl PromptOrchestrator {
    pub fn new(chat_backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            builder: RequestBuilder::default(),
            normalizer: PromptNormalizer::new(),
            chat_backend,
            preview_backend: None,
            show_progress: false,
            session: RwLock::new(SessionSnapshot::idle()),
        }
    }

    pub fn with_builder(mut self, builder: RequestBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_normalizer(mut self, normalizer: PromptNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Enable previews. Without a preview backend `preview()` is rejected.
    pub fn with_preview_backend(mut self, preview_backend: Arc<dyn PreviewBackend>) -> Self {
        self.preview_backend = Some(preview_backend);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview_backend.is_some()
    }

    pub fn chat_backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.chat_backend)
    }

    pub fn state(&self) -> SessionState {
        self.session.read().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.read().clone()
    }

    /// Drop the held prompt, preview and error and return to `Idle`.
    pub fn clear(&self) -> Result<(), DomainError> {
        let mut session = self.session.write();
        if session.state.is_in_flight() {
            return Err(busy(session.state));
        }
        *session = SessionSnapshot::idle();
        info!("Session cleared");
        Ok(())
    }

    /// Produce a normalized prompt for a character in a single chat call.
    pub async fn generate(
        &self,
        character_name: &str,
        style_options: &StyleOptions,
    ) -> Result<GenerationOutcome, DomainError> {
        self.begin_generation()?;
        let mut guard = FlightGuard::new(&self.session, FailureStage::Generate);

        let request = match self.builder.build(character_name, style_options) {
            Ok(request) => request,
            Err(e) => {
                guard.disarm();
                return Err(self.fail(FailureStage::Generate, e));
            }
        };
        let fingerprint = request.fingerprint();
        info!(
            "Generating prompt for '{}' ({} style options, request {}) via {}",
            request.character_name(),
            request.style_options().len(),
            &fingerprint[..12],
            self.chat_backend.endpoint()
        );

        self.transition(SessionState::AwaitingCompletion);
        let completion = self.chat_backend.complete(&request).await;
        guard.disarm();

        let raw_text = match completion.into_result() {
            Ok(text) => text,
            Err(e) => return Err(self.fail(FailureStage::Generate, e)),
        };

        self.transition(SessionState::Normalizing);
        let normalization = self.normalizer.normalize(&raw_text);
        Ok(self.finish_generation(GenerationOutcome {
            prompt: normalization.prompt,
            warning: normalization.warning,
            raw_text,
            fingerprint: Some(fingerprint),
            structure: None,
        }))
    }

    /// Build a structured cinematic prompt through the multi-step facet chain.
    pub async fn compose(&self, character_name: &str) -> Result<GenerationOutcome, DomainError> {
        self.begin_generation()?;
        let mut guard = FlightGuard::new(&self.session, FailureStage::Generate);

        if character_name.trim().is_empty() {
            guard.disarm();
            return Err(self.fail(
                FailureStage::Generate,
                DomainError::invalid_input("character name cannot be empty"),
            ));
        }

        self.transition(SessionState::AwaitingCompletion);
        let composer = CinematicComposer::new(
            Arc::clone(&self.chat_backend),
            self.builder.clone(),
            self.normalizer.clone(),
        )
        .with_progress(self.show_progress);
        let composed = composer.compose(character_name).await;
        guard.disarm();

        let structure = match composed {
            Ok(structure) => structure,
            Err(e) => return Err(self.fail(FailureStage::Generate, e)),
        };

        self.transition(SessionState::Normalizing);
        let rendered = structure.render();
        let normalization = self.normalizer.normalize(&rendered);
        Ok(self.finish_generation(GenerationOutcome {
            prompt: normalization.prompt,
            warning: normalization.warning,
            raw_text: rendered,
            fingerprint: None,
            structure: Some(structure),
        }))
    }

    /// Describe an image so the text can seed a later `generate`.
    ///
    /// Stateless: the session is neither read nor changed, so a caption can
    /// be requested while a prompt or preview is held.
    pub async fn caption(
        &self,
        image: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<String, DomainError> {
        ImageCaptioner::new(
            Arc::clone(&self.chat_backend),
            self.builder.clone(),
            self.normalizer.clone(),
        )
        .caption(image, mime_type)
        .await
    }

    /// Render a preview for the prompt held by the session.
    ///
    /// Valid from `Ready` or `PreviewReady`. A failed preview moves the
    /// session to the preview error state but keeps the prompt.
    pub async fn preview(&self) -> Result<PreviewResult, DomainError> {
        let backend = self
            .preview_backend
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| DomainError::preview_disabled("no preview backend is configured"))?;

        let prompt = {
            let mut session = self.session.write();
            if session.state.is_in_flight() {
                return Err(busy(session.state));
            }
            let prompt = match (&session.prompt, session.state.accepts_preview()) {
                (Some(prompt), true) => prompt.clone(),
                _ => {
                    return Err(DomainError::not_ready(format!(
                        "no prompt to preview (state: {})",
                        session.state
                    )))
                }
            };
            session.state = SessionState::AwaitingPreview;
            session.preview = None;
            session.last_error = None;
            prompt
        };
        let mut guard = FlightGuard::new(&self.session, FailureStage::Preview);

        info!("Rendering preview with {}", backend.name());
        let result = backend.render_preview(&prompt).await;
        guard.disarm();

        let mut session = self.session.write();
        session.preview = Some(result.clone());
        if result.is_success() {
            session.state = SessionState::PreviewReady;
            return Ok(result);
        }

        let detail = result
            .error_detail()
            .unwrap_or("preview backend failed")
            .to_string();
        let error = result
            .failure_kind()
            .cloned()
            .map(|kind| kind.into_error(&detail))
            .unwrap_or_else(|| DomainError::unreachable(detail.clone()));
        warn!("Preview failed: {}", detail);
        session.state = SessionState::Error(FailureStage::Preview);
        session.last_error = Some(SessionError {
            stage: FailureStage::Preview,
            message: failure_message(FailureStage::Preview, &error),
            detail,
        });
        Err(error)
    }

    /// Check for an in-flight call and leave the previous cycle in one step.
    fn begin_generation(&self) -> Result<(), DomainError> {
        let mut session = self.session.write();
        if session.state.is_in_flight() {
            return Err(busy(session.state));
        }
        *session = SessionSnapshot::idle();
        session.state = SessionState::Building;
        Ok(())
    }

    fn transition(&self, state: SessionState) {
        debug!("Session -> {}", state);
        self.session.write().state = state;
    }

    fn finish_generation(&self, outcome: GenerationOutcome) -> GenerationOutcome {
        if let Some(warning) = outcome.warning {
            warn!("{}", warning);
        }
        info!("Prompt ready ({} tags)", outcome.prompt.tag_count());

        let mut session = self.session.write();
        session.state = SessionState::Ready;
        session.prompt = Some(outcome.prompt.clone());
        session.warning = outcome.warning;
        session.last_error = None;
        outcome
    }

    fn fail(&self, stage: FailureStage, error: DomainError) -> DomainError {
        warn!("{} failed: {}", stage_label(stage), error);

        let mut session = self.session.write();
        session.state = SessionState::Error(stage);
        if stage == FailureStage::Generate {
            session.prompt = None;
            session.warning = None;
        }
        session.last_error = Some(SessionError {
            stage,
            message: failure_message(stage, &error),
            detail: error.detail(),
        });
        error
    }
}

/// Puts the session into its error state if an in-flight call is dropped
/// before it completes, so an abandoned request never leaves it Busy.
struct FlightGuard<'a> {
    session: &'a RwLock<SessionSnapshot>,
    stage: FailureStage,
    armed: bool,
}

impl<'a> FlightGuard<'a> {
    fn new(session: &'a RwLock<SessionSnapshot>, stage: FailureStage) -> Self {
        Self {
            session,
            stage,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.session.write();
        if !session.state.is_in_flight() {
            return;
        }
        warn!("{} abandoned before completion", stage_label(self.stage));
        session.state = SessionState::Error(self.stage);
        if self.stage == FailureStage::Generate {
            session.prompt = None;
            session.warning = None;
        }
        session.last_error = Some(SessionError {
            stage: self.stage,
            message: format!("{} was cancelled", stage_label(self.stage)),
            detail: "cancelled".to_string(),
        });
    }
}

fn busy(state: SessionState) -> DomainError {
    DomainError::busy(format!("a request is already in progress (state: {})", state))
}

fn stage_label(stage: FailureStage) -> &'static str {
    match stage {
        FailureStage::Generate => "Prompt generation",
        FailureStage::Preview => "Preview",
    }
}

fn failure_message(stage: FailureStage, error: &DomainError) -> String {
    let backend = match stage {
        FailureStage::Generate => "chat backend",
        FailureStage::Preview => "preview backend",
    };
    match error {
        DomainError::InvalidInput(msg) => format!("Invalid input: {}", msg),
        DomainError::BackendUnreachable(detail) if detail == "timeout" => {
            format!("The {} did not answer in time", backend)
        }
        DomainError::BackendUnreachable(_) => format!("Could not reach the {}", backend),
        DomainError::BackendRejected(detail) => format!("The {} returned {}", backend, detail),
        DomainError::MalformedResponse(_) => {
            format!("The {} returned an unexpected response", backend)
        }
        other => format!("{} failed: {}", stage_label(stage), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{MockChatBackend, MockPreviewBackend};
    use crate::domain::BackendFailure;

    #[tokio::test]
    async fn test_generate_reaches_ready() {
        let orchestrator =
            PromptOrchestrator::new(Arc::new(MockChatBackend::replying("knight, armor, sunset")));

        let outcome = orchestrator.generate("Sir Roland", &StyleOptions::new()).await.unwrap();

        assert_eq!(outcome.prompt.text(), "knight, armor, sunset");
        assert_eq!(outcome.fingerprint.as_ref().map(String::len), Some(64));
        assert_eq!(orchestrator.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_invalid_name_skips_backend() {
        let backend = Arc::new(MockChatBackend::new());
        let orchestrator = PromptOrchestrator::new(backend.clone());

        let err = orchestrator.generate("  ", &StyleOptions::new()).await.unwrap_err();

        assert!(err.is_invalid_input());
        assert_eq!(backend.calls(), 0);
        assert_eq!(orchestrator.state(), SessionState::Error(FailureStage::Generate));
    }

    #[tokio::test]
    async fn test_preview_disabled_without_backend() {
        let orchestrator =
            PromptOrchestrator::new(Arc::new(MockChatBackend::replying("knight, armor")));
        orchestrator.generate("Roland", &StyleOptions::new()).await.unwrap();

        let err = orchestrator.preview().await.unwrap_err();

        assert!(matches!(err, DomainError::PreviewDisabled(_)));
        assert_eq!(orchestrator.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_preview_before_generate_is_not_ready() {
        let orchestrator = PromptOrchestrator::new(Arc::new(MockChatBackend::new()))
            .with_preview_backend(Arc::new(MockPreviewBackend::new()));

        let err = orchestrator.preview().await.unwrap_err();

        assert!(err.is_not_ready());
        assert_eq!(orchestrator.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_preview_can_repeat() {
        let preview = Arc::new(MockPreviewBackend::new());
        let orchestrator =
            PromptOrchestrator::new(Arc::new(MockChatBackend::replying("knight, armor")))
                .with_preview_backend(preview.clone());
        orchestrator.generate("Roland", &StyleOptions::new()).await.unwrap();

        orchestrator.preview().await.unwrap();
        orchestrator.preview().await.unwrap();

        assert_eq!(preview.calls(), 2);
        assert_eq!(orchestrator.state(), SessionState::PreviewReady);
    }

    #[tokio::test]
    async fn test_new_generate_resets_previous_error() {
        let backend = Arc::new(MockChatBackend::scripted(vec![
            crate::domain::ChatCompletionResult::failure(
                BackendFailure::HttpStatus { status: 500 },
                "http 500",
            ),
            crate::domain::ChatCompletionResult::success("wizard, tower"),
        ]));
        let orchestrator = PromptOrchestrator::new(backend);

        assert!(orchestrator.generate("Merlin", &StyleOptions::new()).await.is_err());
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.error_detail(), Some("http 500"));
        assert_eq!(
            snapshot.last_error.map(|e| e.message),
            Some("The chat backend returned http 500".to_string())
        );

        orchestrator.generate("Merlin", &StyleOptions::new()).await.unwrap();
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.state, SessionState::Ready);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_fallback_is_a_warning() {
        let orchestrator = PromptOrchestrator::new(Arc::new(MockChatBackend::replying(
            "Sure! Here is the prompt:",
        )));

        let outcome = orchestrator.generate("Roland", &StyleOptions::new()).await.unwrap();

        assert!(outcome.is_fallback());
        assert_eq!(orchestrator.state(), SessionState::Ready);
        assert_eq!(
            orchestrator.snapshot().warning,
            Some(NormalizationWarning::Fallback)
        );
    }

    #[tokio::test]
    async fn test_clear_resets_to_idle() {
        let orchestrator =
            PromptOrchestrator::new(Arc::new(MockChatBackend::replying("knight, armor")));
        orchestrator.generate("Roland", &StyleOptions::new()).await.unwrap();

        orchestrator.clear().unwrap();

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.prompt.is_none());
    }

    #[tokio::test]
    async fn test_compose_sets_prompt_and_structure() {
        let orchestrator = PromptOrchestrator::new(Arc::new(MockChatBackend::replying(
            "weathered grey robes",
        )));

        let outcome = orchestrator.compose("Gandalf").await.unwrap();

        assert!(outcome.structure.is_some());
        assert!(outcome.fingerprint.is_none());
        assert!(outcome
            .prompt
            .text()
            .ends_with("ultra-detailed, 8k, photorealistic, cinematic composition"));
        assert_eq!(orchestrator.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_caption_leaves_session_alone() {
        let orchestrator = PromptOrchestrator::new(Arc::new(MockChatBackend::scripted(vec![
            crate::domain::ChatCompletionResult::success("knight, armor"),
            crate::domain::ChatCompletionResult::success("A knight in dented plate armor."),
        ])));
        orchestrator.generate("Roland", &StyleOptions::new()).await.unwrap();

        let caption = orchestrator
            .caption(vec![0xFF, 0xD8, 0xFF, 0xE0], None)
            .await
            .unwrap();

        assert_eq!(caption, "A knight in dented plate armor");
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.state, SessionState::Ready);
        assert_eq!(
            snapshot.prompt.map(|p| p.text().to_string()),
            Some("knight, armor".to_string())
        );
    }

    #[tokio::test]
    async fn test_dropped_generate_does_not_stay_busy() {
        let orchestrator = PromptOrchestrator::new(Arc::new(
            MockChatBackend::replying("knight").with_delay(std::time::Duration::from_secs(30)),
        ));

        let options = StyleOptions::new();
        let pending = orchestrator.generate("Roland", &options);
        let _ = tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.state, SessionState::Error(FailureStage::Generate));
        assert_eq!(snapshot.error_detail(), Some("cancelled"));
    }
}
