//! Skills catalog table parser.
//!
//! Catalog files are Markdown documents containing tables of the form:
//! `| [Skill Name](https://link) | Description | Author |`.
//! Any other line (headings, prose, separator rows) is ignored.

use std::sync::LazyLock;

use regex::Regex;
use skillsync_shared::{CandidateRecord, RecordKind, Result};

/// Tag attached to every skill from the community catalog.
const COMMUNITY_TAG: &str = "community";

/// Matches `| [name](url) | description | author |`.
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*\[([^\]]+)\]\(([^)]+)\)\s*\|\s*([^|]+?)\s*\|\s*([^|]+?)\s*\|")
        .expect("table row regex")
});

/// A single table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRow {
    pub name: String,
    pub url: String,
    pub description: String,
    pub author: String,
}

impl SkillRow {
    /// Convert into a candidate tagged with the catalog domain.
    pub fn into_candidate(self, domain: &str) -> Result<CandidateRecord> {
        Ok(CandidateRecord::new(
            RecordKind::Skill,
            &self.name,
            &self.url,
            &self.description,
            &self.author,
        )?
        .with_tags([domain, COMMUNITY_TAG]))
    }
}

/// Extract every skill row from a catalog document.
///
/// Badge images (`img.shields.io`) share the link syntax and are skipped.
pub fn parse_skills_table(markdown: &str) -> Vec<SkillRow> {
    markdown
        .lines()
        .filter_map(|line| ROW_RE.captures(line))
        .filter_map(|caps| {
            let url = caps[2].trim();
            if url.contains("img.shields.io") {
                return None;
            }
            Some(SkillRow {
                name: caps[1].trim().to_string(),
                url: url.to_string(),
                description: caps[3].trim().to_string(),
                author: caps[4].trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "\
# Document Skills

Skills for working with office documents.

| Skill | Description | Author |
|-------|-------------|--------|
| [PDF Tools](https://github.com/acme/skills/tree/main/pdf) | Extract text and tables from PDFs | acme |
| [Excel Helper](https://github.com/beta/xlsx) |  Build spreadsheets  | Beta Labs |
| [![badge](https://img.shields.io/badge/x)](https://img.shields.io/x) | badge | none |
| not a row | at all | here |
";

    #[test]
    fn parses_rows() {
        let rows = parse_skills_table(CATALOG);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "PDF Tools");
        assert_eq!(rows[0].url, "https://github.com/acme/skills/tree/main/pdf");
        assert_eq!(rows[0].description, "Extract text and tables from PDFs");
        assert_eq!(rows[0].author, "acme");
        assert_eq!(rows[1].description, "Build spreadsheets");
        assert_eq!(rows[1].author, "Beta Labs");
    }

    #[test]
    fn empty_document_has_no_rows() {
        assert!(parse_skills_table("").is_empty());
        assert!(parse_skills_table("# Title\n\nJust prose.\n").is_empty());
    }

    #[test]
    fn row_becomes_tagged_candidate() {
        let row = parse_skills_table(CATALOG).remove(1);
        let rec = row.into_candidate("document-skills").unwrap();
        assert_eq!(rec.kind, RecordKind::Skill);
        assert_eq!(rec.id, "excel-helper");
        assert_eq!(rec.owner, "beta-labs");
        assert_eq!(rec.tags, vec!["document-skills", "community"]);
    }
}
