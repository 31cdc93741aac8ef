use anyhow::Result;

use crate::cli::Commands;

use super::container::Container;
use super::controller::{
    CaptionController, CheckController, ComposeController, GenerateController, ServeController,
};

pub struct Router<'a> {
    generate_controller: GenerateController<'a>,
    compose_controller: ComposeController<'a>,
    caption_controller: CaptionController<'a>,
    check_controller: CheckController<'a>,
    serve_controller: ServeController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            generate_controller: GenerateController::new(container),
            compose_controller: ComposeController::new(container),
            caption_controller: CaptionController::new(container),
            check_controller: CheckController::new(container),
            serve_controller: ServeController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Generate {
                name,
                styles,
                preview,
                output,
            } => {
                self.generate_controller
                    .generate(name, styles, preview, output)
                    .await
            }
            Commands::Compose {
                name,
                json,
                preview,
                output,
            } => {
                self.compose_controller
                    .compose(name, json, preview, output)
                    .await
            }
            Commands::Caption {
                image,
                mime_type,
                generate,
            } => {
                self.caption_controller
                    .caption(image, mime_type, generate)
                    .await
            }
            Commands::Check => self.check_controller.check().await,
            Commands::Serve { port } => self.serve_controller.serve(port).await,
        }
    }
}
