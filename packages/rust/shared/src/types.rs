//! Core domain types for the skills registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::keys::{name_to_key, owner_key};

/// Manifest category holding synced skill partitions.
pub const SKILLS_CATEGORY: &str = "community";

/// Manifest category holding synced connector partitions.
pub const CONNECTORS_CATEGORY: &str = "mcp";

/// Version label written for every synced entry.
pub const DEFAULT_VERSION: &str = "main";

// ---------------------------------------------------------------------------
// RecordKind
// ---------------------------------------------------------------------------

/// The two independent record kinds ingested from upstream catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// A skill listed in a markdown catalog.
    Skill,
    /// A service connector (MCP server) described by a JSON file.
    Connector,
}

impl RecordKind {
    /// All kinds, in processing order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Skill, RecordKind::Connector];

    /// Manifest category this kind is written into.
    pub fn category(self) -> &'static str {
        match self {
            Self::Skill => SKILLS_CATEGORY,
            Self::Connector => CONNECTORS_CATEGORY,
        }
    }

    /// Plural label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Connector => "connectors",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord
// ---------------------------------------------------------------------------

/// Launch configuration for a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

/// Kind-specific payload carried through to the persisted entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateExtra {
    pub aliases: Vec<String>,
    pub dependencies: Vec<String>,
    pub mcp_servers: Vec<McpServerConfig>,
}

/// A raw catalog entry, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Which catalog produced this record.
    pub kind: RecordKind,
    /// Key derived from `name` (see [`name_to_key`]).
    pub id: String,
    /// Normalized publishing owner.
    pub owner: String,
    /// Display name.
    pub name: String,
    /// Reference link checked by the validator.
    pub source_url: String,
    /// Free-form description (untruncated).
    pub description: String,
    /// Tags with set semantics, in first-seen order.
    pub tags: Vec<String>,
    /// Kind-specific payload.
    pub extra: CandidateExtra,
}

impl CandidateRecord {
    /// Build a record, deriving `id` from `name` and normalizing `owner_hint`.
    ///
    /// Fails with a parse error when the name has no alphanumeric content.
    pub fn new(
        kind: RecordKind,
        name: &str,
        source_url: &str,
        description: &str,
        owner_hint: &str,
    ) -> Result<Self> {
        let name = name.trim();
        let id = name_to_key(name);
        if id.is_empty() {
            return Err(SyncError::parse(format!(
                "record name {name:?} does not yield a key"
            )));
        }

        Ok(Self {
            kind,
            id,
            owner: owner_key(owner_hint),
            name: name.to_string(),
            source_url: source_url.trim().to_string(),
            description: description.trim().to_string(),
            tags: Vec::new(),
            extra: CandidateExtra::default(),
        })
    }

    /// Attach tags, dropping blanks and duplicates.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            let tag = tag.trim();
            if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_string());
            }
        }
        self
    }

    /// Attach the kind-specific payload.
    pub fn with_extra(mut self, extra: CandidateExtra) -> Self {
        self.extra = extra;
        self
    }
}

// ---------------------------------------------------------------------------
// Persisted partition format
// ---------------------------------------------------------------------------

/// `versions` block of a persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub latest: String,
}

impl Default for Versions {
    fn default() -> Self {
        Self {
            latest: DEFAULT_VERSION.into(),
        }
    }
}

/// A single entry inside a partition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    /// Source identity (`github:owner/repo/path` or the raw URL).
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub versions: Versions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServerConfig>,
    /// Fields written by other tools, preserved on rewrite.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Root structure of a partition file and of the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionFile {
    #[serde(default)]
    pub skills: BTreeMap<String, SkillEntry>,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Partition filenames per category.
///
/// The four well-known categories keep their position in the file; any other
/// category is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    #[serde(default)]
    pub official: Vec<String>,
    #[serde(default)]
    pub community: Vec<String>,
    #[serde(default)]
    pub mcp: Vec<String>,
    #[serde(default)]
    pub cursor: Vec<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Vec<String>>,
}

impl Categories {
    /// Look up a category's file list.
    pub fn get(&self, name: &str) -> Option<&Vec<String>> {
        match name {
            "official" => Some(&self.official),
            "community" => Some(&self.community),
            "mcp" => Some(&self.mcp),
            "cursor" => Some(&self.cursor),
            other => self.other.get(other),
        }
    }

    /// Mutable access to a category's file list, creating it if absent.
    pub fn list_mut(&mut self, name: &str) -> &mut Vec<String> {
        match name {
            "official" => &mut self.official,
            "community" => &mut self.community,
            "mcp" => &mut self.mcp,
            "cursor" => &mut self.cursor,
            other => self.other.entry(other.to_string()).or_default(),
        }
    }

    /// Iterate categories in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Vec<String>)> {
        [
            ("official", &self.official),
            ("community", &self.community),
            ("mcp", &self.mcp),
            ("cursor", &self.cursor),
        ]
        .into_iter()
        .chain(self.other.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

/// The persisted `index.json` listing every partition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_manifest_version")]
    pub version: String,
    /// Date of the last successful run, `YYYY-MM-DD`.
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub format: String,
    #[serde(rename = "compatibleWith", default)]
    pub compatible_with: Vec<String>,
    #[serde(rename = "totalSkills", default)]
    pub total_skills: usize,
    #[serde(default)]
    pub categories: Categories,
    /// Top-level fields this tool does not manage.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_manifest_version() -> String {
    "1.0.0".into()
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: default_manifest_version(),
            updated: String::new(),
            format: "skills-registry".into(),
            compatible_with: Vec::new(),
            total_skills: 0,
            categories: Categories::default(),
            extra: BTreeMap::new(),
        }
    }
}
