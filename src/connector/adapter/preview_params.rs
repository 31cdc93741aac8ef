use crate::domain::{BackendConfig, DEFAULT_CHECKPOINT};

/// Fixed negative prompt sent with every preview.
pub const PREVIEW_NEGATIVE_PROMPT: &str =
    "cartoonish, blurry, low resolution, watermark, text, deformed";

/// Generation settings shared by the preview adapters. Previews are meant to
/// be comparable across prompts, so everything but the checkpoint is fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewParams {
    pub checkpoint: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f32,
    pub seed: u64,
    pub sampler: String,
    pub scheduler: String,
}

impl Default for PreviewParams {
    fn default() -> Self {
        Self {
            checkpoint: DEFAULT_CHECKPOINT.to_string(),
            negative_prompt: PREVIEW_NEGATIVE_PROMPT.to_string(),
            width: 1024,
            height: 1024,
            steps: 25,
            cfg_scale: 7.0,
            seed: 42,
            sampler: "euler".to_string(),
            scheduler: "normal".to_string(),
        }
    }
}

impl PreviewParams {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            checkpoint: config.checkpoint.clone(),
            ..Self::default()
        }
    }
}
