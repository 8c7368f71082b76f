//! Upstream catalog access: the candidate source for a sync run.
//!
//! Two catalogs are read through the GitHub contents API:
//! - a directory of Markdown files whose tables list skills
//! - a directory of JSON descriptors, one per connector (MCP server)
//!
//! A failed directory listing is returned as an error so the caller can
//! decide to treat that catalog as empty. Individual files that fail to
//! download or parse are skipped.

mod connector;
mod markdown;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use skillsync_shared::{CandidateRecord, CatalogRepo, Result, SyncError};
use tracing::{debug, info, instrument, warn};

pub use connector::parse_connector;
pub use markdown::{SkillRow, parse_skills_table};

/// Maximum number of redirects to follow on catalog requests.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for catalog requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for catalog requests (GitHub rejects requests without one).
const USER_AGENT: &str = concat!("skillsync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ContentEntry
// ---------------------------------------------------------------------------

/// One item of a GitHub directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    /// File name, including extension.
    pub name: String,
    /// Raw download link (absent for directories).
    #[serde(default)]
    pub download_url: Option<String>,
    /// `file`, `dir`, `symlink`, ...
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContentEntry {
    /// File stem when this is a regular file with the given extension.
    fn file_stem(&self, ext: &str) -> Option<&str> {
        if self.kind != "file" {
            return None;
        }
        self.name.strip_suffix(ext)
    }
}

// ---------------------------------------------------------------------------
// CatalogClient
// ---------------------------------------------------------------------------

/// HTTP client for the GitHub contents API and raw file downloads.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    api_base: String,
}

impl CatalogClient {
    /// Build a client against the given API base (e.g. `https://api.github.com`).
    pub fn new(api_base: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// List a catalog directory.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn list_directory(&self, repo: &CatalogRepo) -> Result<Vec<ContentEntry>> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, repo.owner, repo.repo, repo.path
        );
        debug!(%url, "listing catalog directory");

        let response = self
            .client
            .get(&url)
            .query(&[("ref", repo.branch.as_str())])
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<Vec<ContentEntry>>()
            .await
            .map_err(|e| SyncError::Network(format!("{url}: invalid listing: {e}")))
    }

    /// Download a file as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("{url}: failed to read body: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Catalog readers
// ---------------------------------------------------------------------------

/// Read every skill listed in the Markdown catalog.
#[instrument(skip_all, fields(repo = %repo))]
pub async fn fetch_skill_candidates(
    client: &CatalogClient,
    repo: &CatalogRepo,
) -> Result<Vec<CandidateRecord>> {
    info!("fetching skills catalog");
    let files = client.list_directory(repo).await?;

    let mut records = Vec::new();
    for file in &files {
        let (Some(domain), Some(url)) = (file.file_stem(".md"), file.download_url.as_deref())
        else {
            continue;
        };

        debug!(file = %file.name, "processing catalog file");
        let markdown = match client.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file.name, error = %e, "catalog file unavailable, skipping");
                continue;
            }
        };

        let rows = parse_skills_table(&markdown);
        let found = rows.len();
        for row in rows {
            match row.into_candidate(domain) {
                Ok(record) => records.push(record),
                Err(e) => debug!(file = %file.name, error = %e, "skipping malformed row"),
            }
        }
        debug!(file = %file.name, rows = found, "parsed catalog file");
    }

    info!(count = records.len(), "skills catalog fetched");
    Ok(records)
}

/// Read every connector descriptor in the connectors directory.
#[instrument(skip_all, fields(repo = %repo))]
pub async fn fetch_connector_candidates(
    client: &CatalogClient,
    repo: &CatalogRepo,
) -> Result<Vec<CandidateRecord>> {
    info!("fetching connectors catalog");
    let files = client.list_directory(repo).await?;

    let mut records = Vec::new();
    let mut processed = 0usize;
    for file in &files {
        let (Some(stem), Some(url)) = (file.file_stem(".json"), file.download_url.as_deref())
        else {
            continue;
        };

        let body = match client.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file.name, error = %e, "descriptor unavailable, skipping");
                continue;
            }
        };

        match parse_connector(stem, &body) {
            Ok(record) => records.push(record),
            Err(e) => debug!(file = %file.name, error = %e, "skipping malformed descriptor"),
        }

        processed += 1;
        if processed % 50 == 0 {
            debug!(processed, "connector descriptors processed");
        }
    }

    info!(count = records.len(), "connectors catalog fetched");
    Ok(records)
}
