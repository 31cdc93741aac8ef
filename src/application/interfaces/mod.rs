mod chat_backend;
mod preview_backend;

pub use chat_backend::*;
pub use preview_backend::*;
