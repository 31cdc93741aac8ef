use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const DEFAULT_CHAT_URL: &str = "http://localhost:1234/v1/chat/completions";
/// LM Studio answers with whichever model is loaded for this identifier.
pub const DEFAULT_CHAT_MODEL: &str = "local-model";
pub const DEFAULT_CHECKPOINT: &str = "sd_xl_base_1.0.safetensors";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Image backend flavour used for previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewBackendKind {
    #[default]
    ComfyUi,
    Automatic1111,
}

impl PreviewBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComfyUi => "comfyui",
            Self::Automatic1111 => "automatic1111",
        }
    }
}

impl fmt::Display for PreviewBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewBackendKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comfyui" | "comfy" => Ok(Self::ComfyUi),
            "automatic1111" | "a1111" | "forge" => Ok(Self::Automatic1111),
            other => Err(DomainError::config(format!(
                "unknown preview backend '{}' (expected comfyui or automatic1111)",
                other
            ))),
        }
    }
}

/// Process-wide backend settings. Read-only once the container is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub chat_base_url: String,
    pub chat_model: String,
    pub preview_base_url: Option<String>,
    pub preview_backend: PreviewBackendKind,
    pub checkpoint: String,
    pub request_timeout_secs: u64,
    pub enable_preview: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            chat_base_url: DEFAULT_CHAT_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            preview_base_url: None,
            preview_backend: PreviewBackendKind::default(),
            checkpoint: DEFAULT_CHECKPOINT.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            enable_preview: false,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Preview runs only when enabled and a backend URL is configured.
    pub fn preview_available(&self) -> bool {
        self.enable_preview
            && self
                .preview_base_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty())
    }

    /// Full chat-completions endpoint derived from `chat_base_url`.
    pub fn chat_completions_url(&self) -> String {
        resolve_chat_url(&self.chat_base_url)
    }

    /// The `/v1` root of the chat server (used for `/models`).
    pub fn chat_api_root(&self) -> String {
        let url = self.chat_completions_url();
        url.trim_end_matches(COMPLETIONS_PATH).to_string()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        check_http_url("chat backend URL", &self.chat_base_url)?;
        if let Some(url) = self.preview_base_url.as_deref() {
            check_http_url("preview backend URL", url)?;
        }
        if self.chat_model.trim().is_empty() {
            return Err(DomainError::config("chat model identifier is empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(DomainError::config("request timeout must be at least one second"));
        }
        Ok(())
    }
}

fn check_http_url(label: &str, url: &str) -> Result<(), DomainError> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(DomainError::config(format!(
            "{} must start with http:// or https://, got '{}'",
            label, url
        )))
    }
}

/// Accepts a full completions URL, a `/v1` root or a bare host and returns
/// the completions endpoint.
pub fn resolve_chat_url(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_PATH) {
        trimmed.to_string()
    } else if trimmed.ends_with("/v1") {
        format!("{}{}", trimmed, COMPLETIONS_PATH)
    } else {
        format!("{}/v1{}", trimmed, COMPLETIONS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_chat_url() {
        assert_eq!(
            resolve_chat_url("http://localhost:1234/v1/chat/completions"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            resolve_chat_url("http://localhost:1234/v1/"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            resolve_chat_url("http://localhost:1234"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_api_root() {
        let config = BackendConfig::default();
        assert_eq!(config.chat_api_root(), "http://localhost:1234/v1");
    }

    #[test]
    fn test_preview_available_requires_url_and_flag() {
        let mut config = BackendConfig::default();
        assert!(!config.preview_available());

        config.enable_preview = true;
        assert!(!config.preview_available());

        config.preview_base_url = Some("http://127.0.0.1:8188".to_string());
        assert!(config.preview_available());

        config.enable_preview = false;
        assert!(!config.preview_available());
    }

    #[test]
    fn test_validate() {
        assert!(BackendConfig::default().validate().is_ok());

        let config = BackendConfig {
            chat_base_url: "localhost:1234".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BackendConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_preview_backend_kind_parse() {
        assert_eq!(
            "ComfyUI".parse::<PreviewBackendKind>().unwrap(),
            PreviewBackendKind::ComfyUi
        );
        assert_eq!(
            "a1111".parse::<PreviewBackendKind>().unwrap(),
            PreviewBackendKind::Automatic1111
        );
        assert!("midjourney".parse::<PreviewBackendKind>().is_err());
    }
}
