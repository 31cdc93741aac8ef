//! Pure services: building chat requests and normalizing model output.

mod prompt_normalizer;
mod request_builder;

pub use prompt_normalizer::*;
pub use request_builder::*;
