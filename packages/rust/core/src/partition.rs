//! Planning owner partitions into files and writing them to a category
//! directory.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use skillsync_shared::{PartitionConfig, PartitionFile, Result, SyncError};
use tracing::{debug, info, instrument, warn};

use crate::dedup::OwnerPartitions;
use crate::store::{read_json, render_json, sha256_hex, write_atomic};

/// File collecting owners below the per-file minimum.
pub const OVERFLOW_FILE: &str = "_overflow.json";

/// Planned files of one category, keyed by filename.
pub type PlannedFiles = BTreeMap<String, PartitionFile>;

/// Filename of an owner's partition.
pub fn partition_filename(owner: &str) -> String {
    format!("{owner}.json")
}

/// Assign every owner to a file.
///
/// Owners with at least `min_records_per_file` records get `<owner>.json`;
/// the rest are folded into [`OVERFLOW_FILE`] under `"<owner>-<key>"`.
pub fn plan(partitions: OwnerPartitions, min_records_per_file: usize) -> PlannedFiles {
    let mut planned = PlannedFiles::new();
    let mut overflow = PartitionFile::default();

    for (owner, entries) in partitions {
        if entries.len() >= min_records_per_file {
            planned.insert(
                partition_filename(&owner),
                PartitionFile { skills: entries },
            );
            continue;
        }

        for (key, entry) in entries {
            let folded = format!("{owner}-{key}");
            if overflow.skills.contains_key(&folded) {
                warn!(key = %folded, "overflow key collision, keeping first entry");
                continue;
            }
            overflow.skills.insert(folded, entry);
        }
    }

    if !overflow.skills.is_empty() {
        planned.insert(OVERFLOW_FILE.to_string(), overflow);
    }

    planned
}

// ---------------------------------------------------------------------------
// Persisted partitions
// ---------------------------------------------------------------------------

/// Partition files already on disk for one category.
#[derive(Debug, Default)]
pub struct ExistingPartitions {
    pub files: BTreeMap<String, PartitionFile>,
    /// Every `source` found across `files`.
    pub sources: HashSet<String>,
}

/// Load the named partition files of a category.
///
/// Missing files are skipped. A file that cannot be read or parsed is logged
/// and treated as absent.
pub fn load_existing<'a>(
    category_dir: &Path,
    filenames: impl IntoIterator<Item = &'a String>,
) -> ExistingPartitions {
    let mut existing = ExistingPartitions::default();

    for filename in filenames {
        if existing.files.contains_key(filename) {
            continue;
        }
        let path = category_dir.join(filename);
        match read_json::<PartitionFile>(&path) {
            Ok(Some(file)) => {
                existing
                    .sources
                    .extend(file.skills.values().map(|e| e.source.clone()));
                existing.files.insert(filename.clone(), file);
            }
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable partition"),
        }
    }

    debug!(
        files = existing.files.len(),
        sources = existing.sources.len(),
        "loaded persisted partitions"
    );
    existing
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// One file produced by [`write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPartition {
    pub filename: String,
    pub records: usize,
    /// SHA-256 of the rendered file content.
    pub sha256: String,
}

/// Summary of one category's write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub files: Vec<WrittenPartition>,
    pub total_records: usize,
}

impl PartitionReport {
    pub fn filenames(&self) -> Vec<String> {
        self.files.iter().map(|f| f.filename.clone()).collect()
    }
}

/// Write every planned file into `category_dir`.
///
/// In dry-run the report is computed identically but nothing touches disk.
#[instrument(skip_all, fields(dir = %category_dir.display(), files = planned.len(), dry_run = config.dry_run))]
pub fn write(
    category_dir: &Path,
    planned: &PlannedFiles,
    config: &PartitionConfig,
) -> Result<PartitionReport> {
    let mut report = PartitionReport::default();

    for (filename, file) in planned {
        let content = render_json(file)?;
        let records = file.skills.len();

        if config.dry_run {
            info!(file = %filename, records, "[dry run] would write partition");
        } else {
            write_atomic(&category_dir.join(filename), &content)?;
            debug!(file = %filename, records, "wrote partition");
        }

        report.total_records += records;
        report.files.push(WrittenPartition {
            filename: filename.clone(),
            records,
            sha256: sha256_hex(&content),
        });
    }

    info!(
        files = report.files.len(),
        records = report.total_records,
        "partitions written"
    );
    Ok(report)
}

/// Delete listed partition files of a category that this run did not plan.
///
/// Returns the filenames that are now stale. In dry-run they are only
/// reported. A file already gone from disk is still returned.
pub fn remove_stale(
    category_dir: &Path,
    listed: &[String],
    planned: &PlannedFiles,
    dry_run: bool,
) -> Result<Vec<String>> {
    let mut stale = Vec::new();

    for filename in listed {
        if planned.contains_key(filename) || stale.contains(filename) {
            continue;
        }
        let path = category_dir.join(filename);
        if dry_run {
            info!(file = %filename, "[dry run] would remove stale partition");
        } else {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(file = %filename, "removed stale partition"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SyncError::io(&path, e)),
            }
        }
        stale.push(filename.clone());
    }

    if !stale.is_empty() {
        info!(files = stale.len(), "stale partitions dropped");
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillsync_shared::{SkillEntry, Versions};
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("skillsync-partition-test-{}", uuid::Uuid::now_v7()))
    }

    fn entry(name: &str) -> SkillEntry {
        SkillEntry {
            name: name.into(),
            source: format!("github:test/{name}"),
            aliases: vec![],
            description: String::new(),
            tags: vec![],
            dependencies: vec![],
            versions: Versions::default(),
            mcp_servers: vec![],
            extra: BTreeMap::new(),
        }
    }

    fn partitions(layout: &[(&str, &[&str])]) -> OwnerPartitions {
        layout
            .iter()
            .map(|(owner, keys)| {
                let entries = keys.iter().map(|k| (k.to_string(), entry(k))).collect();
                (owner.to_string(), entries)
            })
            .collect()
    }

    #[test]
    fn min_one_gives_every_owner_a_file() {
        let planned = plan(partitions(&[("acme", &["a", "b"]), ("zeta", &["z"])]), 1);
        let names: Vec<&str> = planned.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["acme.json", "zeta.json"]);
    }

    #[test]
    fn small_owners_fold_into_overflow() {
        let planned = plan(
            partitions(&[("acme", &["a", "b"]), ("solo", &["x"]), ("tiny", &["y"])]),
            2,
        );

        let names: Vec<&str> = planned.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["_overflow.json", "acme.json"]);

        let overflow = &planned[OVERFLOW_FILE];
        let keys: Vec<&str> = overflow.skills.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["solo-x", "tiny-y"]);
    }

    #[test]
    fn write_reports_match_dry_run() {
        let tmp = temp_dir();
        let planned = plan(partitions(&[("acme", &["a", "b"])]), 1);

        let dry = write(
            &tmp,
            &planned,
            &PartitionConfig {
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!tmp.exists(), "dry run must not create the directory");

        let real = write(&tmp, &planned, &PartitionConfig::default()).unwrap();
        assert_eq!(dry, real);
        assert_eq!(real.total_records, 2);

        let content = std::fs::read_to_string(tmp.join("acme.json")).unwrap();
        assert!(content.ends_with("}\n"));
        assert_eq!(sha256_hex(&content), real.files[0].sha256);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn load_existing_collects_sources_and_skips_bad_files() {
        let tmp = temp_dir();
        std::fs::create_dir_all(&tmp).unwrap();
        let planned = plan(partitions(&[("acme", &["a", "b"])]), 1);
        write(&tmp, &planned, &PartitionConfig::default()).unwrap();
        std::fs::write(tmp.join("broken.json"), "not json").unwrap();

        let names = [
            "acme.json".to_string(),
            "broken.json".to_string(),
            "missing.json".to_string(),
        ];
        let existing = load_existing(&tmp, &names);

        assert_eq!(existing.files.len(), 1);
        assert!(existing.sources.contains("github:test/a"));
        assert!(existing.sources.contains("github:test/b"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unplanned_listed_files_are_removed() {
        let tmp = temp_dir();
        let old = plan(partitions(&[("acme", &["a"]), ("zeta", &["z"])]), 1);
        write(&tmp, &old, &PartitionConfig::default()).unwrap();
        std::fs::write(tmp.join("unlisted.json"), "{}").unwrap();

        let now = plan(partitions(&[("acme", &["a"])]), 1);
        let listed = vec!["acme.json".to_string(), "zeta.json".to_string()];

        let dry = remove_stale(&tmp, &listed, &now, true).unwrap();
        assert_eq!(dry, vec!["zeta.json"]);
        assert!(tmp.join("zeta.json").exists());

        let removed = remove_stale(&tmp, &listed, &now, false).unwrap();
        assert_eq!(removed, vec!["zeta.json"]);
        assert!(!tmp.join("zeta.json").exists());
        assert!(tmp.join("acme.json").exists());
        assert!(tmp.join("unlisted.json").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
