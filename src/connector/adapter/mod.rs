mod automatic1111_preview_client;
mod comfyui_preview_client;
mod mock_chat_backend;
mod mock_preview_backend;
mod openai_chat_client;
mod preview_params;
pub mod web;

pub use automatic1111_preview_client::*;
pub use comfyui_preview_client::*;
pub use mock_chat_backend::*;
pub use mock_preview_backend::*;
pub use openai_chat_client::*;
pub use preview_params::*;
