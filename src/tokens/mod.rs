//! Token counting module
//!
//! Provides fallback token estimation using tiktoken-rs.

pub mod counter;

pub use counter::{SharedTokenCounter, TokenCountError, TokenCounter};
