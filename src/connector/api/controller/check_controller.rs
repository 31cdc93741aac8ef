use anyhow::Result;

use crate::domain::BackendStatus;

use super::super::Container;

pub struct CheckController<'a> {
    container: &'a Container,
}

impl<'a> CheckController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn check(&self) -> Result<String> {
        let status = self.container.chat_backend().probe().await;
        Ok(self.format_status(&status))
    }

    fn format_status(&self, status: &BackendStatus) -> String {
        let reachable = if status.reachable {
            "reachable".to_string()
        } else {
            format!(
                "unreachable ({})",
                status.detail.as_deref().unwrap_or("no detail")
            )
        };
        let models = if status.models.is_empty() {
            "-".to_string()
        } else {
            status.models.join(", ")
        };
        let preview = match self.container.preview_backend_name() {
            Some(name) => format!(
                "{} at {}",
                name,
                self.container
                    .backends()
                    .preview_base_url
                    .as_deref()
                    .unwrap_or("in-process")
            ),
            None => "disabled".to_string(),
        };

        format!(
            "Prompt Studio Backends\n======================\nChat:    {}\nStatus:  {}\nModels:  {}\nPreview: {}",
            status.endpoint, reachable, models, preview
        )
    }
}
