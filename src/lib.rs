pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    ChatBackend, CinematicComposer, GenerationOutcome, ImageCaptioner, PreviewBackend,
    PromptOrchestrator,
};

pub use cli::Commands;

pub use connector::{
    Automatic1111PreviewClient, ComfyUiPreviewClient, MockChatBackend, MockPreviewBackend,
    OpenAiChatClient, PreviewParams,
};

pub use domain::{
    BackendConfig, BackendFailure, CaptionRequest, ChatCompletionResult, CinematicPrompt, DomainError,
    GenerationRequest, ImageRef, NormalizedPrompt, PreviewBackendKind, PreviewResult,
    PromptNormalizer, RequestBuilder, SessionSnapshot, SessionState, StyleOptions, StyleValue,
};
