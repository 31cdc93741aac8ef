//! # Connector Layer
//!
//! Backend adapters (LM Studio chat, ComfyUI and Automatic1111 previews,
//! in-process mocks), the local HTTP API and the CLI composition root.

pub mod adapter;
pub mod api;

pub use adapter::*;
