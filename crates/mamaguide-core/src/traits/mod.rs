//! Service seams. Implementations live in `mamaguide-providers`; tests supply
//! their own doubles.

pub mod embedding;
pub mod provider;

pub use embedding::Embedder;
pub use provider::{GenerateParams, Provider};
