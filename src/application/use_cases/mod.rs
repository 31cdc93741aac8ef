mod caption_image;
mod compose_cinematic_prompt;
mod prompt_orchestrator;

pub use caption_image::*;
pub use compose_cinematic_prompt::*;
pub use prompt_orchestrator::*;
