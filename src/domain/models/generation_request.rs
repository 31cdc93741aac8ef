use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single style hint value. Text hints are embedded verbatim, flags are
/// rendered as enabled/disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Flag(bool),
    Text(String),
}

impl StyleValue {
    /// Parse a CLI-style value: `true`/`false` become flags, anything else is text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Self::Flag(true),
            "false" | "no" | "off" => Self::Flag(false),
            _ => Self::Text(raw.trim().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(t) if t.trim().is_empty())
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(true) => write!(f, "enabled"),
            Self::Flag(false) => write!(f, "disabled"),
            Self::Text(text) => write!(f, "{}", text.trim()),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Style hints keyed by option name. Keys are kept sorted so the rendered
/// instruction never depends on insertion order.
pub type StyleOptions = BTreeMap<String, StyleValue>;

/// A fully built chat request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    character_name: String,
    style_options: StyleOptions,
    target_model: String,
    system_prompt: String,
    instruction: String,
    temperature: f32,
    max_tokens: u32,
}

impl GenerationRequest {
    pub(crate) fn new(
        character_name: String,
        style_options: StyleOptions,
        target_model: String,
        system_prompt: String,
        instruction: String,
    ) -> Self {
        Self {
            character_name,
            style_options,
            target_model,
            system_prompt,
            instruction,
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn character_name(&self) -> &str {
        &self.character_name
    }

    pub fn style_options(&self) -> &StyleOptions {
        &self.style_options
    }

    pub fn target_model(&self) -> &str {
        &self.target_model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The user-turn text sent to the model.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// SHA-256 over the model id and both message texts.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.target_model.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.system_prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.instruction.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_value_parse() {
        assert_eq!(StyleValue::parse("true"), StyleValue::Flag(true));
        assert_eq!(StyleValue::parse("OFF"), StyleValue::Flag(false));
        assert_eq!(
            StyleValue::parse(" cinematic "),
            StyleValue::Text("cinematic".to_string())
        );
    }

    #[test]
    fn test_style_value_display() {
        assert_eq!(StyleValue::Flag(true).to_string(), "enabled");
        assert_eq!(StyleValue::Flag(false).to_string(), "disabled");
        assert_eq!(StyleValue::from("noir").to_string(), "noir");
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let request = GenerationRequest::new(
            "Aria".to_string(),
            StyleOptions::new(),
            "local-model".to_string(),
            "system".to_string(),
            "Character: Aria".to_string(),
        );

        let fingerprint = request.fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, request.clone().fingerprint());

        let other = GenerationRequest::new(
            "Aria".to_string(),
            StyleOptions::new(),
            "other-model".to_string(),
            "system".to_string(),
            "Character: Aria".to_string(),
        );
        assert_ne!(fingerprint, other.fingerprint());
    }

    #[test]
    fn test_style_options_deserialize_mixed_values() {
        let options: StyleOptions =
            serde_json::from_str(r#"{"lighting": "cinematic", "film_grain": true}"#).unwrap();

        assert_eq!(options["lighting"], StyleValue::Text("cinematic".to_string()));
        assert_eq!(options["film_grain"], StyleValue::Flag(true));
    }
}
