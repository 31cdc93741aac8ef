//! # Application Layer
//!
//! Backend ports and the use cases that sequence them.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
