//! # MamaGuide Core
//!
//! Shared building blocks for every MamaGuide crate:
//! - [`config`]: TOML configuration (`~/.mamaguide/config.toml`)
//! - [`error`]: the crate-wide error enum and `Result` alias
//! - [`types`]: chat messages and provider responses
//! - [`traits`]: the completion (`Provider`) and embedding (`Embedder`) seams

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::MamaGuideConfig;
pub use error::{MamaGuideError, Result};
