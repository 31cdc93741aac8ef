use std::path::PathBuf;

use anyhow::Result;

use crate::domain::{StyleOptions, StyleValue};

use super::super::Container;
use super::PreviewController;

pub struct GenerateController<'a> {
    container: &'a Container,
}

impl<'a> GenerateController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn generate(
        &self,
        name: String,
        styles: Vec<(String, StyleValue)>,
        preview: bool,
        output: Option<PathBuf>,
    ) -> Result<String> {
        let options: StyleOptions = styles.into_iter().collect();
        let outcome = self
            .container
            .orchestrator()
            .generate(&name, &options)
            .await?;

        let mut lines = vec![outcome.prompt.text().to_string()];
        if preview {
            lines.push(String::new());
            lines.push(
                PreviewController::new(self.container)
                    .preview(output)
                    .await?,
            );
        }
        Ok(lines.join("\n"))
    }
}
