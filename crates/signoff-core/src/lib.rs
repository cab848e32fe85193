//! Core types for the signoff approval-workflow engine
//!
//! # Modules
//!
//! - `config`: Environment configuration loading
//! - `error`: Error types and Result alias
//! - `step`: The Step data model filters operate on

pub mod config;
pub mod error;
pub mod step;

// Re-exports
pub use error::{Error, Result};
pub use step::{keys, Step, LIST_DELIMITER};

/// Split a `;`-delimited list into its non-empty, trimmed entries, in order
pub fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
