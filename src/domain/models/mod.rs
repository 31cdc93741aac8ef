mod backend_config;
mod caption_request;
mod chat_completion;
mod cinematic_prompt;
mod generation_request;
mod normalized_prompt;
mod preview_result;
mod session;

pub use backend_config::*;
pub use caption_request::*;
pub use chat_completion::*;
pub use cinematic_prompt::*;
pub use generation_request::*;
pub use normalized_prompt::*;
pub use preview_result::*;
pub use session::*;
