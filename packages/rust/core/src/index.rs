//! Search index (`all.json`): the union of every partition the manifest
//! lists.

use std::path::Path;

use skillsync_shared::{Manifest, PartitionFile, Result};
use tracing::{debug, info, instrument, warn};

use crate::store::{read_json, render_json, write_atomic};

/// Search index filename inside the registry directory.
pub const SEARCH_INDEX_FILE: &str = "all.json";

/// Summary of an index build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Distinct keys in the index.
    pub skills: usize,
    /// Partition files successfully read.
    pub files_read: usize,
    /// Size of the rendered index.
    pub bytes: usize,
}

/// Merge every listed partition into `<registry_dir>/all.json`.
///
/// Files are read in manifest order; a later file overrides earlier entries
/// with the same key. Files that are missing or unparseable are skipped.
#[instrument(skip_all, fields(registry = %registry_dir.display(), dry_run = dry_run))]
pub fn build_search_index(
    registry_dir: &Path,
    manifest: &Manifest,
    dry_run: bool,
) -> Result<IndexReport> {
    let mut index = PartitionFile::default();
    let mut files_read = 0;

    for (category, files) in manifest.categories.iter() {
        for filename in files {
            let path = registry_dir.join(category).join(filename);
            match read_json::<PartitionFile>(&path) {
                Ok(Some(file)) => {
                    debug!(file = %path.display(), skills = file.skills.len(), "indexed partition");
                    index.skills.extend(file.skills);
                    files_read += 1;
                }
                Ok(None) => warn!(file = %path.display(), "listed partition is missing"),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable partition")
                }
            }
        }
    }

    let content = render_json(&index)?;
    if dry_run {
        info!(skills = index.skills.len(), "[dry run] would write search index");
    } else {
        write_atomic(&registry_dir.join(SEARCH_INDEX_FILE), &content)?;
    }

    let report = IndexReport {
        skills: index.skills.len(),
        files_read,
        bytes: content.len(),
    };
    info!(
        skills = report.skills,
        files = report.files_read,
        bytes = report.bytes,
        "search index built"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("skillsync-index-test-{}", uuid::Uuid::now_v7()))
    }

    fn write_partition(dir: &Path, category: &str, name: &str, body: &str) {
        let dir = dir.join(category);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn later_files_override_and_bad_files_are_skipped() {
        let tmp = temp_dir();
        write_partition(
            &tmp,
            "official",
            "core.json",
            r#"{"skills":{"shared":{"name":"Old","source":"github:a/old"},"base":{"name":"Base","source":"github:a/base"}}}"#,
        );
        write_partition(
            &tmp,
            "community",
            "acme.json",
            r#"{"skills":{"shared":{"name":"New","source":"github:a/new"}}}"#,
        );
        write_partition(&tmp, "community", "broken.json", "nope");

        let mut manifest = Manifest::default();
        manifest.categories.official = vec!["core.json".into()];
        manifest.categories.community =
            vec!["acme.json".into(), "broken.json".into(), "gone.json".into()];

        let report = build_search_index(&tmp, &manifest, false).unwrap();
        assert_eq!(report.skills, 2);
        assert_eq!(report.files_read, 2);

        let index: PartitionFile =
            serde_json::from_str(&std::fs::read_to_string(tmp.join(SEARCH_INDEX_FILE)).unwrap())
                .unwrap();
        assert_eq!(index.skills["shared"].name, "New");
        assert!(index.skills.contains_key("base"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn dry_run_leaves_no_index() {
        let tmp = temp_dir();
        std::fs::create_dir_all(&tmp).unwrap();

        let report = build_search_index(&tmp, &Manifest::default(), true).unwrap();
        assert_eq!(report.skills, 0);
        assert!(!tmp.join(SEARCH_INDEX_FILE).exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
