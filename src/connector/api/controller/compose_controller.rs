use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use super::super::Container;
use super::PreviewController;

pub struct ComposeController<'a> {
    container: &'a Container,
}

impl<'a> ComposeController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn compose(
        &self,
        name: String,
        as_json: bool,
        preview: bool,
        output: Option<PathBuf>,
    ) -> Result<String> {
        let outcome = self.container.orchestrator().compose(&name).await?;

        let mut lines = if as_json {
            let value = json!({
                "prompt": outcome.prompt.text(),
                "structure": outcome.structure,
                "warning": outcome.warning.map(|w| w.to_string()),
            });
            vec![serde_json::to_string_pretty(&value)?]
        } else {
            vec![outcome.prompt.text().to_string()]
        };

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
