use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::info;

use super::payloads::{
    CaptionBody, CaptionView, ComposeBody, ErrorBody, GenerateBody, PreviewView, PromptView,
    SessionView,
};
use crate::application::PromptOrchestrator;
use crate::domain::DomainError;

/// Request body cap; base64 images for `/api/caption` exceed axum's default.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Domain error rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            DomainError::Busy(_) => (StatusCode::CONFLICT, "busy"),
            DomainError::NotReady(_) => (StatusCode::CONFLICT, "not_ready"),
            DomainError::PreviewDisabled(_) => (StatusCode::CONFLICT, "preview_disabled"),
            DomainError::BackendUnreachable(_) => (StatusCode::BAD_GATEWAY, "backend_unreachable"),
            DomainError::BackendRejected(_) => (StatusCode::BAD_GATEWAY, "backend_error"),
            DomainError::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "malformed_response"),
            DomainError::Config(_) | DomainError::IoError(_) | DomainError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        let body = ErrorBody {
            error: kind,
            message: self.0.to_string(),
            detail: self.0.detail(),
        };
        (status, Json(body)).into_response()
    }
}

/// Routes of the local HTTP API.
pub fn api_router(orchestrator: Arc<PromptOrchestrator>) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/compose", post(compose))
        .route("/api/preview", post(preview))
        .route("/api/caption", post(caption))
        .route("/api/session", get(session))
        .route("/api/session/reset", post(reset))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(orchestrator)
}

/// Serve the API on an already bound listener until the task is dropped.
pub async fn serve_api(
    listener: TcpListener,
    orchestrator: Arc<PromptOrchestrator>,
) -> Result<(), DomainError> {
    let addr = listener.local_addr()?;
    info!("Prompt Studio API listening on http://{}", addr);
    axum::serve(listener, api_router(orchestrator)).await?;
    Ok(())
}

/// Bind to loopback on `port` (0 picks a free port).
pub async fn bind_local(port: u16) -> Result<TcpListener, DomainError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    Ok(TcpListener::bind(addr).await?)
}

async fn generate(
    State(orchestrator): State<Arc<PromptOrchestrator>>,
    Json(body): Json<GenerateBody>,
) -> ApiResult<PromptView> {
    let outcome = orchestrator
        .generate(&body.character_name, &body.style_options)
        .await?;
    Ok(Json(PromptView::new(outcome, orchestrator.state())))
}

async fn compose(
    State(orchestrator): State<Arc<PromptOrchestrator>>,
    Json(body): Json<ComposeBody>,
) -> ApiResult<PromptView> {
    let outcome = orchestrator.compose(&body.character_name).await?;
    Ok(Json(PromptView::new(outcome, orchestrator.state())))
}

async fn preview(State(orchestrator): State<Arc<PromptOrchestrator>>) -> ApiResult<PreviewView> {
    let result = orchestrator.preview().await?;
    Ok(Json(PreviewView::from(&result)))
}

async fn caption(
    State(orchestrator): State<Arc<PromptOrchestrator>>,
    Json(body): Json<CaptionBody>,
) -> ApiResult<CaptionView> {
    let (image, mime_type) = body.decode()?;
    let caption = orchestrator.caption(image, mime_type.as_deref()).await?;
    Ok(Json(CaptionView { caption }))
}

async fn session(State(orchestrator): State<Arc<PromptOrchestrator>>) -> Json<SessionView> {
    Json(SessionView::new(
        &orchestrator.snapshot(),
        orchestrator.preview_enabled(),
    ))
}

async fn reset(State(orchestrator): State<Arc<PromptOrchestrator>>) -> ApiResult<SessionView> {
    orchestrator.clear()?;
    Ok(Json(SessionView::new(
        &orchestrator.snapshot(),
        orchestrator.preview_enabled(),
    )))
}
