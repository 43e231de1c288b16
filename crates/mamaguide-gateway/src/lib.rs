//! # MamaGuide Gateway
//!
//! HTTP API over the knowledge base, the chat assistant and the local store.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
