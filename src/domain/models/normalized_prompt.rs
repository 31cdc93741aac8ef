use std::fmt;

use serde::{Deserialize, Serialize};

/// Single-line, comma-separated SDXL prompt. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedPrompt {
    text: String,
}

impl NormalizedPrompt {
    /// Only the normalizer constructs prompts, which keeps the non-empty
    /// single-line invariant in one place.
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.text.split(", ")
    }

    pub fn tag_count(&self) -> usize {
        self.tags().count()
    }
}

impl fmt::Display for NormalizedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Soft warnings raised during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationWarning {
    /// Nothing usable survived cleaning; the placeholder prompt was used.
    Fallback,
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fallback => write!(
                f,
                "model output contained no usable prompt text; placeholder prompt substituted"
            ),
        }
    }
}

/// A normalized prompt together with any warning raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalization {
    pub prompt: NormalizedPrompt,
    pub warning: Option<NormalizationWarning>,
}

impl Normalization {
    pub fn is_fallback(&self) -> bool {
        self.warning == Some(NormalizationWarning::Fallback)
    }
}
