//! HTTP API: channel queries, session commands, SSE events

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
