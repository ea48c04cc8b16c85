//! Shared types, error model, and configuration for ManyBodyLab.
//!
//! This crate is the foundation depended on by all other ManyBodyLab crates.
//! It provides:
//! - [`ManyBodyLabError`] — the unified error type
//! - Domain types ([`MembershipEntry`], [`UserDetail`], [`EnrichedProfile`])
//! - Configuration ([`AppConfig`], [`DirectoryConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DirectoryConfig, DirectorySection, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{ManyBodyLabError, Result};
pub use types::{
    DIRECTORY_REVALIDATE_SECS, EnrichedProfile, MembershipEntry, UserDetail, fallback_bio,
};
