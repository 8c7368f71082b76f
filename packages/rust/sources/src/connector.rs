//! Connector (MCP server) descriptor parser.

use std::collections::BTreeMap;

use serde::Deserialize;
use skillsync_shared::{
    CandidateExtra, CandidateRecord, McpServerConfig, RecordKind, Result, SyncError,
    url_owner_hint,
};

/// Tag attached to every connector.
const MCP_TAG: &str = "mcp";

#[derive(Debug, Deserialize)]
struct Descriptor {
    name: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    repository: Option<Repository>,
    homepage: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    installations: BTreeMap<String, Installation>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Installation {
    command: Option<String>,
    args: Option<Vec<String>>,
    package: Option<String>,
    env: Option<BTreeMap<String, String>>,
}

/// Treat empty strings like missing values.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Parse one descriptor file into a candidate.
///
/// `stem` is the file name without `.json`; it stands in for missing names.
pub fn parse_connector(stem: &str, json: &str) -> Result<CandidateRecord> {
    let desc: Descriptor = serde_json::from_str(json)
        .map_err(|e| SyncError::parse(format!("{stem}.json: {e}")))?;

    let base_name = non_empty(desc.name.as_ref()).unwrap_or(stem);
    let display = non_empty(desc.display_name.as_ref()).unwrap_or(base_name);
    let repo_url = non_empty(desc.repository.as_ref().and_then(|r| r.url.as_ref()))
        .or_else(|| non_empty(desc.homepage.as_ref()))
        .unwrap_or("");
    let description = non_empty(desc.description.as_ref())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{stem} MCP server"));
    let owner = url_owner_hint(repo_url).unwrap_or_default();

    let mcp_servers = desc
        .installations
        .iter()
        .filter_map(|(kind, install)| {
            let command = install.command.as_ref()?;
            let args = install.args.as_ref()?;
            Some(McpServerConfig {
                name: format!("{base_name}-{kind}"),
                package: install.package.clone(),
                command: command.clone(),
                args: args.clone(),
                env: Some(install.env.clone().unwrap_or_default()),
            })
        })
        .collect();

    let tags = std::iter::once(MCP_TAG.to_string())
        .chain(desc.tags)
        .chain(desc.categories);

    Ok(
        CandidateRecord::new(RecordKind::Connector, display, repo_url, &description, &owner)?
            .with_tags(tags)
            .with_extra(CandidateExtra {
                mcp_servers,
                ..CandidateExtra::default()
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_descriptor() {
        let json = r#"{
            "name": "github",
            "display_name": "GitHub Server",
            "description": "Repository access",
            "repository": { "url": "https://github.com/modelcontextprotocol/servers" },
            "tags": ["git", "mcp"],
            "categories": ["developer-tools"],
            "installations": {
                "npm": {
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-github"],
                    "env": { "GITHUB_TOKEN": "${GITHUB_TOKEN}" }
                },
                "docker": { "command": "docker" },
                "uvx": { "command": "uvx", "args": ["mcp-github"] }
            }
        }"#;
        let rec = parse_connector("github", json).unwrap();
        assert_eq!(rec.kind, RecordKind::Connector);
        assert_eq!(rec.name, "GitHub Server");
        assert_eq!(rec.id, "github-server");
        assert_eq!(rec.owner, "modelcontextprotocol");
        assert_eq!(rec.source_url, "https://github.com/modelcontextprotocol/servers");
        assert_eq!(rec.tags, vec!["mcp", "git", "developer-tools"]);

        let servers = &rec.extra.mcp_servers;
        assert_eq!(servers.len(), 2, "docker entry lacks args");
        assert_eq!(servers[0].name, "github-npm");
        assert_eq!(servers[0].env.as_ref().unwrap()["GITHUB_TOKEN"], "${GITHUB_TOKEN}");
        assert_eq!(servers[1].name, "github-uvx");
        assert!(servers[1].env.as_ref().unwrap().is_empty());
    }

    #[test]
    fn sparse_descriptor_uses_fallbacks() {
        let rec = parse_connector("sqlite-tools", r#"{ "homepage": "https://sqlite.example.org" }"#)
            .unwrap();
        assert_eq!(rec.name, "sqlite-tools");
        assert_eq!(rec.description, "sqlite-tools MCP server");
        assert_eq!(rec.source_url, "https://sqlite.example.org");
        assert_eq!(rec.owner, "sqlite-example-org");
        assert_eq!(rec.tags, vec!["mcp"]);
        assert!(rec.extra.mcp_servers.is_empty());
    }

    #[test]
    fn missing_link_gives_unknown_owner() {
        let rec = parse_connector("lonely", r#"{ "name": "" }"#).unwrap();
        assert_eq!(rec.name, "lonely");
        assert_eq!(rec.source_url, "");
        assert_eq!(rec.owner, "unknown");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_connector("broken", "{ not json").unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
