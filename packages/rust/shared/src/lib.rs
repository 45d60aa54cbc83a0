//! Shared types, error model, and configuration for contextpairs.
//!
//! This crate is the foundation depended on by all other contextpairs crates.
//! It provides:
//! - [`ContextPairsError`]: the unified error type
//! - Domain types ([`Reply`], [`Comment`], [`Submission`], [`TrainingRecord`])
//! - Configuration ([`AppConfig`], [`ArchiveConfig`], [`WalkerConfig`], [`AssemblyConfig`])

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ArchiveConfig, ArchiveSection, AssemblyConfig, AssemblySection, WalkerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ContextPairsError, Result};
pub use types::{Comment, Reply, Submission, TrainingRecord};
