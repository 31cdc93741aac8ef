//! # Domain Layer
//!
//! Prompt models, the pure request/normalization services and the error
//! taxonomy. Nothing in this layer performs I/O beyond saving preview bytes.

pub mod error;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
