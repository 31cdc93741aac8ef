use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PreviewParams;
use crate::application::PreviewBackend;
use crate::domain::{BackendFailure, ImageRef, NormalizedPrompt, PreviewResult};

#[derive(Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    width: u32,
    height: u32,
    steps: u32,
    cfg_scale: f32,
    seed: u64,
    sampler_name: &'a str,
    scheduler: &'a str,
    batch_size: u32,
    override_settings: OverrideSettings<'a>,
}

#[derive(Serialize)]
struct OverrideSettings<'a> {
    sd_model_checkpoint: &'a str,
}

#[derive(Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// Preview adapter for Automatic1111 and Forge (`POST /sdapi/v1/txt2img`).
/// The first returned image is decoded into inline PNG bytes.
pub struct Automatic1111PreviewClient {
    client: reqwest::Client,
    url: String,
    params: PreviewParams,
}

impl Automatic1111PreviewClient {
    pub fn new(base_url: &str, params: PreviewParams, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url: format!("{}/sdapi/v1/txt2img", base_url.trim().trim_end_matches('/')),
            params,
        }
    }
}

#[async_trait]
impl PreviewBackend for Automatic1111PreviewClient {
    async fn render_preview(&self, prompt: &NormalizedPrompt) -> PreviewResult {
        let p = &self.params;
        let body = Txt2ImgRequest {
            prompt: prompt.text(),
            negative_prompt: &p.negative_prompt,
            width: p.width,
            height: p.height,
            steps: p.steps,
            cfg_scale: p.cfg_scale,
            seed: p.seed,
            sampler_name: "Euler",
            scheduler: "Automatic",
            batch_size: 1,
            override_settings: OverrideSettings {
                sd_model_checkpoint: &p.checkpoint,
            },
        };

        debug!("POST {}", self.url);
        let response = match self.client.post(&self.url).json(&body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return PreviewResult::timeout(),
            Err(e) => {
                warn!("Preview request to {} failed: {}", self.url, e);
                return PreviewResult::failure(BackendFailure::Unreachable, e.to_string());
            }
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return PreviewResult::failure(
                BackendFailure::HttpStatus { status },
                format!("http {}", status),
            );
        }

        let parsed: Txt2ImgResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) if e.is_timeout() => return PreviewResult::timeout(),
            Err(e) => {
                return PreviewResult::failure(
                    BackendFailure::MalformedResponse,
                    format!("invalid txt2img response: {}", e),
                )
            }
        };

        match parsed.images.first().map(|encoded| decode_image(encoded)) {
            Some(Ok(bytes)) => PreviewResult::success(ImageRef::png(bytes)),
            Some(Err(detail)) => PreviewResult::failure(BackendFailure::MalformedResponse, detail),
            None => PreviewResult::failure(BackendFailure::MalformedResponse, "no image returned"),
        }
    }

    fn name(&self) -> &str {
        "automatic1111"
    }
}

/// Some builds prefix the payload with a `data:image/png;base64,` header.
fn decode_image(encoded: &str) -> Result<Vec<u8>, String> {
    let payload = encoded
        .split_once(";base64,")
        .map_or(encoded, |(_, data)| data)
        .trim();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64 image: {}", e))?;
    if bytes.is_empty() {
        return Err("empty image payload".to_string());
    }
    Ok(bytes)
}
