//! Local JSON API over the orchestrator, bound to loopback only.

mod payloads;
mod server;

pub use payloads::*;
pub use server::*;
