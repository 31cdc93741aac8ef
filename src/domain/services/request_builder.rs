use tracing::debug;

use crate::domain::{
    CaptionRequest, DomainError, GenerationRequest, StyleOptions, DEFAULT_CHAT_MODEL,
};

/// System prompt for single-shot cinematic prompt generation.
pub const CINEMATIC_SYSTEM_PROMPT: &str = "\
You are an expert prompt engineer for Stable Diffusion XL. Given a character, \
write one cinematic image-generation prompt as a comma-separated list of concise \
descriptive tags. Cover the character's appearance, outfit and expression, the \
setting, mood and time of day, the camera shot, angle and lens, the lighting, and \
the artistic style. Reply with the prompt only: no preamble, no explanation, no \
markdown.";

/// System prompt for describing an uploaded image.
pub const CAPTION_SYSTEM_PROMPT: &str = "\
You describe images for an image-generation workflow. Describe the main subject \
in detail: appearance, clothing, expression and pose, then the setting, lighting \
and overall style. Reply with the description only: no preamble, no markdown.";

const CAPTION_INSTRUCTION: &str = "Describe this image in detail.";

/// Builds deterministic chat requests from user input.
///
/// Style options are rendered in key order (the map is sorted), so the same
/// name and options always give byte-identical instruction text.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    target_model: String,
    system_prompt: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_MODEL)
    }
}

impl RequestBuilder {
    pub fn new(target_model: impl Into<String>) -> Self {
        Self {
            target_model: target_model.into(),
            system_prompt: CINEMATIC_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn target_model(&self) -> &str {
        &self.target_model
    }

    pub fn build(
        &self,
        character_name: &str,
        style_options: &StyleOptions,
    ) -> Result<GenerationRequest, DomainError> {
        let name = validate_name(character_name)?;

        let mut options = StyleOptions::new();
        for (key, value) in style_options {
            let key = key.trim();
            if key.is_empty() {
                return Err(DomainError::invalid_input("style option names cannot be empty"));
            }
            if value.is_empty() {
                debug!("Skipping empty style option '{}'", key);
                continue;
            }
            options.insert(key.to_string(), value.clone());
        }

        let mut instruction = format!("Character: {}", name);
        if !options.is_empty() {
            instruction.push_str("\nStyle hints:");
            for (key, value) in &options {
                instruction.push_str(&format!("\n- {}: {}", key, value));
            }
        }
        instruction.push_str("\nWrite the SDXL prompt now.");

        Ok(GenerationRequest::new(
            name.to_string(),
            options,
            self.target_model.clone(),
            self.system_prompt.clone(),
            instruction,
        ))
    }

    /// A free-form request with explicit messages, used by multi-step
    /// composition. The character name is still validated.
    pub fn custom(
        &self,
        character_name: &str,
        system_prompt: &str,
        instruction: &str,
    ) -> Result<GenerationRequest, DomainError> {
        let name = validate_name(character_name)?;
        if instruction.trim().is_empty() {
            return Err(DomainError::invalid_input("instruction text cannot be empty"));
        }

        Ok(GenerationRequest::new(
            name.to_string(),
            StyleOptions::new(),
            self.target_model.clone(),
            system_prompt.to_string(),
            instruction.to_string(),
        ))
    }

    /// Wrap an image for a vision-capable chat model. The format is taken
    /// from `mime_type` when given, otherwise sniffed from the bytes.
    pub fn caption(
        &self,
        image: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<CaptionRequest, DomainError> {
        CaptionRequest::new(
            image,
            mime_type,
            self.target_model.clone(),
            CAPTION_SYSTEM_PROMPT.to_string(),
            CAPTION_INSTRUCTION.to_string(),
        )
    }
}

fn validate_name(character_name: &str) -> Result<&str, DomainError> {
    let name = character_name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid_input("character name cannot be empty"));
    }
    Ok(name)
}
