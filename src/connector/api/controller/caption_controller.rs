use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::StyleOptions;

use super::super::Container;

pub struct CaptionController<'a> {
    container: &'a Container,
}

impl<'a> CaptionController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Print the caption, or with `generate` feed it in as the character
    /// input and print the resulting prompt under it.
    pub async fn caption(
        &self,
        image: PathBuf,
        mime_type: Option<String>,
        generate: bool,
    ) -> Result<String> {
        let bytes = std::fs::read(&image)
            .with_context(|| format!("failed to read image at {}", image.display()))?;

        let orchestrator = self.container.orchestrator();
        let caption = orchestrator.caption(bytes, mime_type.as_deref()).await?;
        if !generate {
            return Ok(caption);
        }

        let outcome = orchestrator.generate(&caption, &StyleOptions::new()).await?;
        Ok(format!("Caption: {}\n\n{}", caption, outcome.prompt.text()))
    }
}
