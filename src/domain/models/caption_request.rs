use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::DomainError;

/// Image formats a vision chat server accepts as a data URI.
const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Greedy decoding keeps captions stable across runs.
pub const CAPTION_TEMPERATURE: f32 = 0.0;
pub const CAPTION_MAX_TOKENS: u32 = 1024;

/// Detect the image format from its leading bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// One image-description call against a vision-capable chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRequest {
    image: Vec<u8>,
    mime_type: String,
    target_model: String,
    system_prompt: String,
    instruction: String,
}

impl CaptionRequest {
    /// Fails with `InvalidInput` for empty payloads and formats that are
    /// neither declared nor recognizable from the bytes.
    pub fn new(
        image: Vec<u8>,
        mime_type: Option<&str>,
        target_model: String,
        system_prompt: String,
        instruction: String,
    ) -> Result<Self, DomainError> {
        if image.is_empty() {
            return Err(DomainError::invalid_input("image is empty"));
        }
        let mime_type = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
            Some(declared) => declared.to_ascii_lowercase(),
            None => sniff_image_mime(&image)
                .ok_or_else(|| DomainError::invalid_input("unrecognized image format"))?
                .to_string(),
        };
        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(DomainError::invalid_input(format!(
                "unsupported image type '{}'",
                mime_type
            )));
        }

        Ok(Self {
            image,
            mime_type,
            target_model,
            system_prompt,
            instruction,
        })
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn target_model(&self) -> &str {
        &self.target_model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn temperature(&self) -> f32 {
        CAPTION_TEMPERATURE
    }

    pub fn max_tokens(&self) -> u32 {
        CAPTION_MAX_TOKENS
    }

    /// `data:<mime>;base64,<payload>` as sent in an `image_url` content part.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.image))
    }
}
