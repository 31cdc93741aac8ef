pub mod caption_controller;
pub mod check_controller;
pub mod compose_controller;
pub mod generate_controller;
pub mod preview_controller;
pub mod serve_controller;

pub use caption_controller::CaptionController;
pub use check_controller::CheckController;
pub use compose_controller::ComposeController;
pub use generate_controller::GenerateController;
pub use preview_controller::PreviewController;
pub use serve_controller::ServeController;
