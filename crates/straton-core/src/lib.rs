//! straton-core: shared types, configuration, and error handling for the
//! Straton messaging client.

pub mod config;
pub mod error;
pub mod types;

pub use error::{StratonError, StratonResult};
