//! Shared types, error model, and configuration for skillsync.
//!
//! This crate is the foundation depended on by all other skillsync crates.
//! It provides:
//! - [`SyncError`]: the unified error type
//! - Domain types ([`CandidateRecord`], [`SkillEntry`], [`PartitionFile`], [`Manifest`])
//! - Key normalization ([`name_to_key`], [`url_to_source`])
//! - Configuration ([`AppConfig`], [`ValidatorConfig`], [`PartitionConfig`], config loading)

pub mod config;
pub mod error;
pub mod keys;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogRepo, GithubConfig, PartitionConfig, RegistryConfig, SourcesConfig,
    ValidationConfig, ValidatorConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{Result, SyncError};
pub use keys::{UNKNOWN_OWNER, name_to_key, owner_key, url_owner_hint, url_to_source};
pub use types::{
    CONNECTORS_CATEGORY, CandidateExtra, CandidateRecord, Categories, DEFAULT_VERSION, Manifest,
    McpServerConfig, PartitionFile, RecordKind, SKILLS_CATEGORY, SkillEntry, Versions,
};
