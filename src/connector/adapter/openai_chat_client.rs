use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ChatBackend;
use crate::domain::{
    BackendConfig, BackendFailure, BackendStatus, CaptionRequest, ChatCompletionResult,
    GenerationRequest,
};

/// Probe timeout; `/models` answers instantly on a healthy server.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: MessageContent<'a>,
}

/// Plain string content, or the multi-part form vision models take.
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Client for OpenAI-compatible chat servers such as LM Studio.
///
/// Sends one non-streaming `POST …/v1/chat/completions` per call with a
/// system and a user message and reads `choices[0].message.content`. The
/// configured timeout bounds the whole exchange. No retries.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    probe_client: reqwest::Client,
    /// Full completions endpoint.
    url: String,
    /// `/v1` root, used for `/models`.
    api_root: String,
}

impl OpenAiChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let url = crate::domain::resolve_chat_url(base_url);
        let api_root = url.trim_end_matches("/chat/completions").to_string();
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            probe_client: reqwest::Client::builder()
                .connect_timeout(PROBE_TIMEOUT)
                .timeout(PROBE_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url,
            api_root,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.chat_base_url, config.request_timeout())
    }

    async fn send(&self, body: &ApiRequest<'_>) -> ChatCompletionResult {
        let response = match self.client.post(&self.url).json(body).send().await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(&e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Chat backend returned {}: {}", status, body);
            return ChatCompletionResult::failure(
                BackendFailure::HttpStatus {
                    status: status.as_u16(),
                },
                format!("http {}", status.as_u16()),
            );
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return self.transport_failure(&e),
        };
        let parsed: ApiResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                return ChatCompletionResult::failure(
                    BackendFailure::MalformedResponse,
                    format!("invalid JSON body: {}", e),
                )
            }
        };

        match parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
        {
            Some(content) if !content.trim().is_empty() => ChatCompletionResult::success(content),
            _ => ChatCompletionResult::failure(
                BackendFailure::MalformedResponse,
                "missing choices[0].message.content",
            ),
        }
    }

    fn transport_failure(&self, error: &reqwest::Error) -> ChatCompletionResult {
        if error.is_timeout() {
            warn!("Chat request to {} timed out", self.url);
            return ChatCompletionResult::timeout();
        }
        warn!("Chat request to {} failed: {}", self.url, error);
        if error.is_connect() {
            ChatCompletionResult::failure(
                BackendFailure::Unreachable,
                format!("connection failed: {}", self.url),
            )
        } else {
            ChatCompletionResult::failure(BackendFailure::Unreachable, error.to_string())
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn complete(&self, request: &GenerationRequest) -> ChatCompletionResult {
        let body = ApiRequest {
            model: request.target_model(),
            messages: [
                ApiMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_prompt()),
                },
                ApiMessage {
                    role: "user",
                    content: MessageContent::Text(request.instruction()),
                },
            ],
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
            stream: false,
        };

        debug!("POST {} (model {})", self.url, request.target_model());
        self.send(&body).await
    }

    async fn caption(&self, request: &CaptionRequest) -> ChatCompletionResult {
        let body = ApiRequest {
            model: request.target_model(),
            messages: [
                ApiMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_prompt()),
                },
                ApiMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: request.instruction(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: request.data_uri(),
                            },
                        },
                    ]),
                },
            ],
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
            stream: false,
        };

        debug!(
            "POST {} (model {}, {} image of {} bytes)",
            self.url,
            request.target_model(),
            request.mime_type(),
            request.image().len()
        );
        self.send(&body).await
    }

    async fn probe(&self) -> BackendStatus {
        let url = format!("{}/models", self.api_root);
        let response = match self.probe_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return BackendStatus::down(&self.url, "timeout"),
            Err(e) => return BackendStatus::down(&self.url, e.to_string()),
        };

        if !response.status().is_success() {
            return BackendStatus::down(&self.url, format!("http {}", response.status().as_u16()));
        }

        // Any 2xx means the server is up even if the listing is unexpected.
        let models = response
            .json::<ModelList>()
            .await
            .map(|list| list.data.into_iter().map(|m| m.id).collect())
            .unwrap_or_default();
        BackendStatus::up(&self.url, models)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
