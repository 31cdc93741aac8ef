use std::path::PathBuf;

use anyhow::Result;

use crate::domain::{DomainError, ImageRef};

use super::super::Container;

pub struct PreviewController<'a> {
    container: &'a Container,
}

impl<'a> PreviewController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Render a preview for the prompt the session holds. A failed preview
    /// is reported in the output rather than as an error: the prompt stays
    /// valid either way.
    pub async fn preview(&self, output: Option<PathBuf>) -> Result<String> {
        let orchestrator = self.container.orchestrator();
        match orchestrator.preview().await {
            Ok(result) => match result.image() {
                Some(image) => self.describe_image(image, output),
                None => Ok("Preview: no image returned".to_string()),
            },
            Err(DomainError::PreviewDisabled(_)) => Ok(
                "Preview: disabled (set --enable-preview and --preview-url)".to_string(),
            ),
            Err(e) if e.is_backend_failure() => {
                let snapshot = orchestrator.snapshot();
                let message = snapshot
                    .last_error
                    .map(|err| format!("{} ({})", err.message, err.detail))
                    .unwrap_or_else(|| e.to_string());
                Ok(format!("Preview failed: {}", message))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn describe_image(&self, image: &ImageRef, output: Option<PathBuf>) -> Result<String> {
        match (image, output) {
            (ImageRef::Uri(uri), _) => Ok(format!("Preview: {}", uri)),
            (ImageRef::Inline { .. }, Some(path)) => {
                image.save_to(&path)?;
                Ok(format!("Preview saved to {}", path.display()))
            }
            (ImageRef::Inline { .. }, None) => Ok(format!(
                "Preview: {} (use --output to save it)",
                image.describe()
            )),
        }
    }
}
