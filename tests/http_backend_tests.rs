//! HTTP adapters against stub servers bound to loopback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use prompt_studio::application::{ChatBackend, PreviewBackend};
use prompt_studio::domain::{ImageRef, PromptNormalizer};
use prompt_studio::{
    Automatic1111PreviewClient, BackendFailure, ComfyUiPreviewClient, GenerationRequest,
    OpenAiChatClient, PreviewParams, RequestBuilder, StyleOptions,
};

async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn request() -> GenerationRequest {
    RequestBuilder::default()
        .build("Aria Nightshade", &StyleOptions::new())
        .unwrap()
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn test_chat_completion_success() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(captured): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *captured.lock() = Some(body);
                    Json(completion(
                        "Sure, here's your prompt: cinematic portrait, aria nightshade, dramatic lighting",
                    ))
                },
            ),
        )
        .with_state(Arc::clone(&captured));
    let base = spawn_stub(app).await;

    let client = OpenAiChatClient::new(&base, Duration::from_secs(5));
    let result = client.complete(&request()).await;

    assert!(result.is_success());
    let normalized = PromptNormalizer::new().normalize(result.raw_text());
    assert_eq!(
        normalized.prompt.text(),
        "cinematic portrait, aria nightshade, dramatic lighting"
    );

    let body = captured.lock().clone().expect("request body captured");
    assert_eq!(body["model"], "local-model");
    assert_eq!(body["stream"], false);
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("Aria Nightshade"));
}

#[tokio::test]
async fn test_chat_caption_sends_image_part() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(captured): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *captured.lock() = Some(body);
                    Json(completion("A knight in dented plate armor, standing in the rain."))
                },
            ),
        )
        .with_state(Arc::clone(&captured));
    let base = spawn_stub(app).await;

    let request = RequestBuilder::default()
        .caption(vec![0x89, b'P', b'N', b'G'], None)
        .unwrap();
    let result = OpenAiChatClient::new(&base, Duration::from_secs(5))
        .caption(&request)
        .await;

    assert!(result.is_success());
    let body = captured.lock().clone().expect("request body captured");
    let parts = &body["messages"][1]["content"];
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[1]["type"], "image_url");
    assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,iVBORw==");
    assert_eq!(body["max_tokens"], 1024);
}

#[tokio::test]
async fn test_chat_http_error_status() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded") }),
    );
    let base = spawn_stub(app).await;

    let result = OpenAiChatClient::new(&format!("{}/v1", base), Duration::from_secs(5))
        .complete(&request())
        .await;

    assert!(!result.is_success());
    assert_eq!(
        result.failure_kind(),
        Some(&BackendFailure::HttpStatus { status: 500 })
    );
    assert_eq!(result.error_detail(), Some("http 500"));
}

#[tokio::test]
async fn test_chat_malformed_bodies() {
    let app = Router::new()
        .route(
            "/a/v1/chat/completions",
            post(|| async { Json(json!({ "object": "chat.completion" })) }),
        )
        .route(
            "/b/v1/chat/completions",
            post(|| async { "definitely not json" }),
        )
        .route(
            "/c/v1/chat/completions",
            post(|| async { Json(completion("   ")) }),
        );
    let base = spawn_stub(app).await;

    for prefix in ["a", "b", "c"] {
        let client =
            OpenAiChatClient::new(&format!("{}/{}", base, prefix), Duration::from_secs(5));
        let result = client.complete(&request()).await;
        assert_eq!(
            result.failure_kind(),
            Some(&BackendFailure::MalformedResponse),
            "route {}",
            prefix
        );
    }
}

#[tokio::test]
async fn test_chat_timeout_detail() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(completion("too late"))
        }),
    );
    let base = spawn_stub(app).await;

    let result = OpenAiChatClient::new(&base, Duration::from_secs(1))
        .complete(&request())
        .await;

    assert_eq!(result.failure_kind(), Some(&BackendFailure::Timeout));
    assert_eq!(result.error_detail(), Some("timeout"));
}

#[tokio::test]
async fn test_chat_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAiChatClient::new(&format!("http://{}", addr), Duration::from_secs(2));
    let result = client.complete(&request()).await;

    assert_eq!(result.failure_kind(), Some(&BackendFailure::Unreachable));

    let status = client.probe().await;
    assert!(!status.reachable);
    assert!(status.detail.is_some());
}

#[tokio::test]
async fn test_probe_lists_models() {
    let app = Router::new().route(
        "/v1/models",
        get(|| async {
            Json(json!({ "object": "list", "data": [{ "id": "mistral-7b-instruct" }, { "id": "qwen2.5-7b" }] }))
        }),
    );
    let base = spawn_stub(app).await;

    let status = OpenAiChatClient::new(&base, Duration::from_secs(5)).probe().await;

    assert!(status.reachable);
    assert_eq!(status.models, vec!["mistral-7b-instruct", "qwen2.5-7b"]);
    assert!(status.endpoint.ends_with("/v1/chat/completions"));
}

#[derive(Clone)]
struct ComfyStub {
    polls: Arc<AtomicUsize>,
    queued: Arc<Mutex<Option<Value>>>,
}

#[tokio::test]
async fn test_comfyui_queue_and_poll() {
    let stub = ComfyStub {
        polls: Arc::new(AtomicUsize::new(0)),
        queued: Arc::new(Mutex::new(None)),
    };
    let app = Router::new()
        .route(
            "/prompt",
            post(|State(stub): State<ComfyStub>, Json(body): Json<Value>| async move {
                *stub.queued.lock() = Some(body);
                Json(json!({ "prompt_id": "p-1", "number": 0 }))
            }),
        )
        .route(
            "/history/{id}",
            get(|State(stub): State<ComfyStub>, Path(id): Path<String>| async move {
                if stub.polls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Json(json!({}));
                }
                let mut history = serde_json::Map::new();
                history.insert(
                    id,
                    json!({
                        "status": { "status_str": "success", "completed": true },
                        "outputs": {
                            "9": { "images": [{ "filename": "prompt_studio_00001_.png", "subfolder": "", "type": "output" }] }
                        }
                    }),
                );
                Json(Value::Object(history))
            }),
        )
        .with_state(stub.clone());
    let base = spawn_stub(app).await;

    let client = ComfyUiPreviewClient::new(&base, PreviewParams::default(), Duration::from_secs(10));
    let prompt = PromptNormalizer::new().normalize("knight, armor, sunset").prompt;
    let result = client.render_preview(&prompt).await;

    assert!(result.is_success(), "{:?}", result.error_detail());
    assert_eq!(
        result.image(),
        Some(&ImageRef::Uri(format!(
            "{}/view?filename=prompt_studio_00001_.png&subfolder=&type=output",
            base
        )))
    );
    assert!(stub.polls.load(Ordering::SeqCst) >= 2);

    let queued = stub.queued.lock().clone().unwrap();
    assert_eq!(queued["prompt"]["6"]["inputs"]["text"], "knight, armor, sunset");
    assert!(queued["client_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_comfyui_times_out_when_never_finished() {
    let app = Router::new()
        .route("/prompt", post(|| async { Json(json!({ "prompt_id": "p-2" })) }))
        .route("/history/{id}", get(|| async { Json(json!({})) }));
    let base = spawn_stub(app).await;

    let client = ComfyUiPreviewClient::new(&base, PreviewParams::default(), Duration::from_secs(1));
    let prompt = PromptNormalizer::new().normalize("knight").prompt;
    let result = client.render_preview(&prompt).await;

    assert_eq!(result.failure_kind(), Some(&BackendFailure::Timeout));
    assert_eq!(result.error_detail(), Some("timeout"));
}

#[tokio::test]
async fn test_automatic1111_inline_image() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/sdapi/v1/txt2img",
            post(
                |State(captured): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *captured.lock() = Some(body);
                    Json(json!({ "images": [STANDARD.encode([0x89, b'P', b'N', b'G'])], "parameters": {} }))
                },
            ),
        )
        .with_state(Arc::clone(&captured));
    let base = spawn_stub(app).await;

    let client =
        Automatic1111PreviewClient::new(&base, PreviewParams::default(), Duration::from_secs(5));
    let prompt = PromptNormalizer::new().normalize("knight, armor").prompt;
    let result = client.render_preview(&prompt).await;

    assert!(result.is_success());
    assert_eq!(
        result.image().and_then(ImageRef::bytes),
        Some(&[0x89, b'P', b'N', b'G'][..])
    );

    let body = captured.lock().clone().unwrap();
    assert_eq!(body["prompt"], "knight, armor");
    assert_eq!(body["seed"], 42);
    assert_eq!(
        body["override_settings"]["sd_model_checkpoint"],
        "sd_xl_base_1.0.safetensors"
    );
}

#[tokio::test]
async fn test_automatic1111_without_images_is_malformed() {
    let app = Router::new().route(
        "/sdapi/v1/txt2img",
        post(|| async { Json(json!({ "images": [] })) }),
    );
    let base = spawn_stub(app).await;

    let client =
        Automatic1111PreviewClient::new(&base, PreviewParams::default(), Duration::from_secs(5));
    let prompt = PromptNormalizer::new().normalize("knight").prompt;
    let result = client.render_preview(&prompt).await;

    assert_eq!(result.failure_kind(), Some(&BackendFailure::MalformedResponse));
}
