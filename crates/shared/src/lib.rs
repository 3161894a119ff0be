//! Shared library for the Anime Nexus workspace.
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::{BackoffKind, Config, JikanConfig, PacingConfig, SuggestionConfig};
pub use logging::LogConfig;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
