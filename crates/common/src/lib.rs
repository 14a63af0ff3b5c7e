//! Common utilities and types for EnviroLLM
//!
//! This crate provides shared functionality used across the EnviroLLM system,
//! including error types, the benchmark data model, and utility functions.

pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
