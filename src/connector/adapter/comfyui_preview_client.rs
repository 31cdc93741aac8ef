use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::PreviewParams;
use crate::application::PreviewBackend;
use crate::domain::{BackendFailure, ImageRef, NormalizedPrompt, PreviewResult};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Node id of the `SaveImage` node in [`ComfyUiPreviewClient::workflow`].
const SAVE_NODE: &str = "9";

#[derive(Deserialize)]
struct QueueResponse {
    prompt_id: Option<String>,
}

#[derive(Deserialize)]
struct OutputImage {
    filename: String,
    #[serde(default)]
    subfolder: String,
    #[serde(rename = "type", default = "default_image_type")]
    kind: String,
}

fn default_image_type() -> String {
    "output".to_string()
}

enum Poll {
    Pending,
    Done(ImageRef),
    Failed(PreviewResult),
}

/// Preview adapter for a ComfyUI server.
///
/// Queues a fixed SDXL text-to-image workflow on `POST /prompt`, then polls
/// `GET /history/{prompt_id}` until the save node reports an image. The
/// result is a `/view` URI on the same server; no bytes are downloaded.
/// The configured timeout bounds the whole queue-and-poll cycle.
pub struct ComfyUiPreviewClient {
    client: reqwest::Client,
    base_url: String,
    params: PreviewParams,
    timeout: Duration,
    client_id: String,
}

impl ComfyUiPreviewClient {
    pub fn new(base_url: &str, params: PreviewParams, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            params,
            timeout,
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Minimal SDXL graph: checkpoint, two text encodes, empty latent,
    /// sampler, VAE decode and save.
    pub fn workflow(&self, prompt: &str) -> Value {
        let p = &self.params;
        json!({
            "4": {
                "class_type": "CheckpointLoaderSimple",
                "inputs": { "ckpt_name": p.checkpoint }
            },
            "6": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": prompt, "clip": ["4", 1] }
            },
            "7": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": p.negative_prompt, "clip": ["4", 1] }
            },
            "5": {
                "class_type": "EmptyLatentImage",
                "inputs": { "width": p.width, "height": p.height, "batch_size": 1 }
            },
            "3": {
                "class_type": "KSampler",
                "inputs": {
                    "seed": p.seed,
                    "steps": p.steps,
                    "cfg": p.cfg_scale,
                    "sampler_name": p.sampler,
                    "scheduler": p.scheduler,
                    "denoise": 1.0,
                    "model": ["4", 0],
                    "positive": ["6", 0],
                    "negative": ["7", 0],
                    "latent_image": ["5", 0]
                }
            },
            "8": {
                "class_type": "VAEDecode",
                "inputs": { "samples": ["3", 0], "vae": ["4", 2] }
            },
            SAVE_NODE: {
                "class_type": "SaveImage",
                "inputs": { "filename_prefix": "prompt_studio", "images": ["8", 0] }
            }
        })
    }

    async fn queue(&self, prompt: &str) -> Result<String, PreviewResult> {
        let body = json!({
            "prompt": self.workflow(prompt),
            "client_id": self.client_id,
        });
        let response = self
            .client
            .post(format!("{}/prompt", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("ComfyUI rejected workflow ({}): {}", status, body);
            return Err(http_failure(status.as_u16()));
        }

        let queued: QueueResponse = response.json().await.map_err(|e| {
            PreviewResult::failure(
                BackendFailure::MalformedResponse,
                format!("invalid queue response: {}", e),
            )
        })?;
        queued.prompt_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            PreviewResult::failure(BackendFailure::MalformedResponse, "missing prompt_id")
        })
    }

    async fn poll(&self, prompt_id: &str) -> Poll {
        let response = match self
            .client
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Poll::Failed(transport_failure(&e)),
        };
        if !response.status().is_success() {
            return Poll::Failed(http_failure(response.status().as_u16()));
        }
        let history: Value = match response.json().await {
            Ok(history) => history,
            Err(e) => {
                return Poll::Failed(PreviewResult::failure(
                    BackendFailure::MalformedResponse,
                    format!("invalid history response: {}", e),
                ))
            }
        };
        self.read_history(&history, prompt_id)
    }

    fn read_history(&self, history: &Value, prompt_id: &str) -> Poll {
        let Some(entry) = history.get(prompt_id) else {
            return Poll::Pending;
        };

        if entry.pointer("/status/status_str").and_then(Value::as_str) == Some("error") {
            return Poll::Failed(PreviewResult::failure(
                BackendFailure::MalformedResponse,
                "workflow execution failed",
            ));
        }

        let image = entry
            .pointer(&format!("/outputs/{}/images/0", SAVE_NODE))
            .cloned()
            .map(serde_json::from_value::<OutputImage>);
        match image {
            None => Poll::Pending,
            Some(Ok(image)) => match self.view_uri(&image) {
                Some(uri) => Poll::Done(ImageRef::Uri(uri)),
                None => Poll::Failed(PreviewResult::failure(
                    BackendFailure::MalformedResponse,
                    "invalid image reference",
                )),
            },
            Some(Err(e)) => Poll::Failed(PreviewResult::failure(
                BackendFailure::MalformedResponse,
                format!("invalid image entry: {}", e),
            )),
        }
    }

    fn view_uri(&self, image: &OutputImage) -> Option<String> {
        reqwest::Url::parse_with_params(
            &format!("{}/view", self.base_url),
            &[
                ("filename", image.filename.as_str()),
                ("subfolder", image.subfolder.as_str()),
                ("type", image.kind.as_str()),
            ],
        )
        .ok()
        .map(String::from)
    }
}

#[async_trait]
impl PreviewBackend for ComfyUiPreviewClient {
    async fn render_preview(&self, prompt: &NormalizedPrompt) -> PreviewResult {
        let deadline = Instant::now() + self.timeout;

        let prompt_id = match self.queue(prompt.text()).await {
            Ok(id) => id,
            Err(failure) => return failure,
        };
        info!("ComfyUI queued prompt {}", prompt_id);

        loop {
            match self.poll(&prompt_id).await {
                Poll::Done(image) => {
                    debug!("ComfyUI finished {}: {}", prompt_id, image.describe());
                    return PreviewResult::success(image);
                }
                Poll::Failed(failure) => return failure,
                Poll::Pending => {}
            }
            if Instant::now() + POLL_INTERVAL >= deadline {
                warn!("ComfyUI prompt {} did not finish in time", prompt_id);
                return PreviewResult::timeout();
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn name(&self) -> &str {
        "comfyui"
    }
}

fn transport_failure(error: &reqwest::Error) -> PreviewResult {
    if error.is_timeout() {
        return PreviewResult::timeout();
    }
    warn!("Preview request failed: {}", error);
    PreviewResult::failure(BackendFailure::Unreachable, error.to_string())
}

fn http_failure(status: u16) -> PreviewResult {
    PreviewResult::failure(BackendFailure::HttpStatus { status }, format!("http {}", status))
}
