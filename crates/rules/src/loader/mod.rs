//! Filesystem rule loader with hot-reload via `notify` watcher.
//!
//! Watches the rules directory for YAML file changes (create, modify, delete)
//! and reloads affected documents into the in-memory registry.
//! Supports both document kinds via two-pass deserialization
//! (RuleEnvelope -> RuleDocument); every document is validated before it
//! is accepted.

mod core;
mod error;
mod watcher;

#[cfg(test)]
mod tests;

pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
