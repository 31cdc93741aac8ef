use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::application::GenerationOutcome;
use crate::domain::{
    CinematicPrompt, DomainError, ImageRef, NormalizationWarning, PreviewResult, SessionError,
    SessionSnapshot, SessionState, StyleOptions,
};

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub style_options: StyleOptions,
}

#[derive(Debug, Deserialize)]
pub struct ComposeBody {
    #[serde(default)]
    pub character_name: String,
}

/// An image as base64, optionally wrapped in a `data:` URI.
#[derive(Debug, Deserialize)]
pub struct CaptionBody {
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl CaptionBody {
    /// Decoded bytes plus the declared type. A `data:` URI header supplies
    /// the type when the field is absent.
    pub fn decode(&self) -> Result<(Vec<u8>, Option<String>), DomainError> {
        let raw = self.image_base64.trim();
        let (header_mime, payload) = match raw.strip_prefix("data:") {
            Some(rest) => match rest.split_once(";base64,") {
                Some((mime, payload)) => (Some(mime.to_string()), payload),
                None => return Err(DomainError::invalid_input("data URI is not base64")),
            },
            None => (None, raw),
        };
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| DomainError::invalid_input(format!("invalid base64 image: {}", e)))?;
        Ok((bytes, self.mime_type.clone().or(header_mime)))
    }
}

#[derive(Debug, Serialize)]
pub struct CaptionView {
    pub caption: String,
}

#[derive(Debug, Serialize)]
pub struct PromptView {
    pub prompt: String,
    pub tags: Vec<String>,
    pub warning: Option<String>,
    pub fallback: bool,
    pub fingerprint: Option<String>,
    pub structure: Option<CinematicPrompt>,
    pub state: SessionState,
}

impl PromptView {
    pub fn new(outcome: GenerationOutcome, state: SessionState) -> Self {
        Self {
            tags: outcome.prompt.tags().map(str::to_string).collect(),
            warning: outcome.warning.map(|w| w.to_string()),
            fallback: outcome.warning == Some(NormalizationWarning::Fallback),
            prompt: outcome.prompt.text().to_string(),
            fingerprint: outcome.fingerprint,
            structure: outcome.structure,
            state,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageView {
    Inline { mime_type: String, data_base64: String },
    Uri { uri: String },
}

impl From<&ImageRef> for ImageView {
    fn from(image: &ImageRef) -> Self {
        match image {
            ImageRef::Inline { mime_type, data } => Self::Inline {
                mime_type: mime_type.clone(),
                data_base64: STANDARD.encode(data),
            },
            ImageRef::Uri(uri) => Self::Uri { uri: uri.clone() },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewView {
    pub success: bool,
    pub image: Option<ImageView>,
    pub error_detail: Option<String>,
}

impl From<&PreviewResult> for PreviewView {
    fn from(result: &PreviewResult) -> Self {
        Self {
            success: result.is_success(),
            image: result.image().map(ImageView::from),
            error_detail: result.error_detail().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub status: &'static str,
    pub prompt: Option<String>,
    pub warning: Option<String>,
    pub last_error: Option<SessionError>,
    pub preview: Option<PreviewView>,
    pub preview_enabled: bool,
}

impl SessionView {
    pub fn new(snapshot: &SessionSnapshot, preview_enabled: bool) -> Self {
        Self {
            state: snapshot.state,
            status: snapshot.state.as_str(),
            prompt: snapshot.prompt.as_ref().map(|p| p.text().to_string()),
            warning: snapshot.warning.map(|w| w.to_string()),
            last_error: snapshot.last_error.clone(),
            preview: snapshot.preview.as_ref().map(PreviewView::from),
            preview_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub detail: String,
}
