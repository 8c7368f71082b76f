//! Application configuration for skillsync.
//!
//! User config lives at `~/.skillsync/skillsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "skillsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".skillsync";

// ---------------------------------------------------------------------------
// Config structs (matching skillsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// On-disk registry layout and partitioning.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Link validation budget.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// GitHub API settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Upstream catalogs.
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry root directory (holds `index.json` and category folders).
    #[serde(default = "default_registry_dir")]
    pub dir: String,

    /// Owners with fewer records than this are folded into the overflow file.
    #[serde(default = "default_min_records")]
    pub min_records_per_file: usize,

    /// Merge fresh records into the partitions already on disk.
    #[serde(default)]
    pub merge_existing: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            dir: default_registry_dir(),
            min_records_per_file: default_min_records(),
            merge_existing: false,
        }
    }
}

fn default_registry_dir() -> String {
    "registry".into()
}
fn default_min_records() -> usize {
    1
}

/// `[validation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum number of in-flight link checks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Hard timeout per attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per link (initial + retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay before a retry, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_concurrency() -> usize {
    10
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_max_attempts() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    1_000
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Base URL of the contents API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

/// `[sources]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Markdown catalog of skills.
    #[serde(default = "default_skills_repo")]
    pub skills: CatalogRepo,

    /// Directory of connector (MCP server) JSON descriptors.
    #[serde(default = "default_connectors_repo")]
    pub connectors: CatalogRepo,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            skills: default_skills_repo(),
            connectors: default_connectors_repo(),
        }
    }
}

fn default_skills_repo() -> CatalogRepo {
    CatalogRepo {
        owner: "Chat2AnyLLM".into(),
        repo: "awesome-claude-skills".into(),
        branch: "main".into(),
        path: "domains".into(),
    }
}
fn default_connectors_repo() -> CatalogRepo {
    CatalogRepo {
        owner: "Chat2AnyLLM".into(),
        repo: "code-assistant-manager".into(),
        branch: "main".into(),
        path: "code_assistant_manager/mcp/registry/servers".into(),
    }
}

/// A directory inside a GitHub repository that holds catalog files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRepo {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

impl std::fmt::Display for CatalogRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}:{}", self.owner, self.repo, self.branch, self.path)
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime link-validation settings.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// When false every link is treated as reachable and no request is made.
    pub enabled: bool,
    /// Maximum simultaneously in-flight checks.
    pub concurrency: usize,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout: Duration,
    /// Total attempts per link.
    pub max_attempts: u32,
    /// Delay between a failed attempt and its retry.
    pub retry_backoff: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let defaults = ValidationConfig::default();
        Self {
            enabled: false,
            concurrency: defaults.concurrency,
            attempt_timeout: Duration::from_millis(defaults.timeout_ms),
            max_attempts: defaults.max_attempts,
            retry_backoff: Duration::from_millis(defaults.retry_backoff_ms),
        }
    }
}

impl TryFrom<&AppConfig> for ValidatorConfig {
    type Error = SyncError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let v = &config.validation;
        if v.concurrency == 0 {
            return Err(SyncError::config("validation.concurrency must be at least 1"));
        }
        if v.max_attempts == 0 {
            return Err(SyncError::config("validation.max_attempts must be at least 1"));
        }
        Ok(Self {
            enabled: false,
            concurrency: v.concurrency,
            attempt_timeout: Duration::from_millis(v.timeout_ms),
            max_attempts: v.max_attempts,
            retry_backoff: Duration::from_millis(v.retry_backoff_ms),
        })
    }
}

/// Runtime partition-writing settings.
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// Owners below this record count share the overflow file.
    pub min_records_per_file: usize,
    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// Load existing partition files and merge into them.
    pub merge_existing: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            min_records_per_file: default_min_records(),
            dry_run: false,
            merge_existing: false,
        }
    }
}

impl From<&AppConfig> for PartitionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_records_per_file: config.registry.min_records_per_file.max(1),
            dry_run: false,
            merge_existing: config.registry.merge_existing,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.skillsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| SyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.skillsync/skillsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
