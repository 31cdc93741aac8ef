use anyhow::Result;

use crate::connector::adapter::web::{bind_local, serve_api};

use super::super::Container;

pub struct ServeController<'a> {
    container: &'a Container,
}

impl<'a> ServeController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Run the local HTTP API until the process is stopped.
    pub async fn serve(&self, port: u16) -> Result<String> {
        let listener = bind_local(port).await?;
        let addr = listener.local_addr()?;
        eprintln!("Serving Prompt Studio API on http://{}", addr);
        serve_api(listener, self.container.orchestrator()).await?;
        Ok(String::new())
    }
}
