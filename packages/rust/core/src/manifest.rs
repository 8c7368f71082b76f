//! Loading, reconciling, and saving the registry manifest (`index.json`).

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use skillsync_shared::{Manifest, Result};
use tracing::{debug, info, warn};

use crate::store::{read_json, render_json, write_atomic};

/// Manifest filename inside the registry directory.
pub const MANIFEST_FILE: &str = "index.json";

/// Load the manifest, falling back to an empty one when the file is absent.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    match read_json::<Manifest>(path)? {
        Some(manifest) => Ok(manifest),
        None => {
            warn!(path = %path.display(), "manifest not found, starting from an empty one");
            Ok(Manifest::default())
        }
    }
}

/// Persist the manifest. In dry-run the would-be manifest is only logged.
pub fn save_manifest(path: &Path, manifest: &Manifest, dry_run: bool) -> Result<()> {
    let content = render_json(manifest)?;
    if dry_run {
        info!(
            path = %path.display(),
            manifest = %content.trim_end(),
            "[dry run] would write manifest"
        );
        return Ok(());
    }
    write_atomic(path, &content)
}

/// Changes applied by [`reconcile`].
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub manifest: Manifest,
    /// `(category, filename)` appended this run.
    pub added: Vec<(String, String)>,
    /// `(category, filename)` removed because the file is gone.
    pub pruned: Vec<(String, String)>,
}

/// Bring the manifest in line with this run's output.
///
/// For every category in `new_by_category`: collapse duplicate entries,
/// append filenames not yet listed, then drop every listed filename for
/// which `exists(category, filename)` is false. Other categories are left as
/// they are.
pub fn reconcile<F>(
    mut manifest: Manifest,
    new_by_category: &BTreeMap<String, Vec<String>>,
    total: usize,
    today: NaiveDate,
    exists: F,
) -> ReconcileReport
where
    F: Fn(&str, &str) -> bool,
{
    let mut added = Vec::new();
    let mut pruned = Vec::new();

    for (category, filenames) in new_by_category {
        let list = manifest.categories.list_mut(category);

        let mut seen = HashSet::new();
        list.retain(|f| seen.insert(f.clone()));

        for filename in filenames {
            if seen.insert(filename.clone()) {
                list.push(filename.clone());
                added.push((category.clone(), filename.clone()));
            }
        }

        list.retain(|f| {
            let keep = exists(category, f);
            if !keep {
                debug!(category = %category, file = %f, "pruning missing partition");
                pruned.push((category.clone(), f.clone()));
            }
            keep
        });
    }

    manifest.total_skills = total;
    manifest.updated = today.format("%Y-%m-%d").to_string();

    info!(
        added = added.len(),
        pruned = pruned.len(),
        total,
        "manifest reconciled"
    );
    ReconcileReport {
        manifest,
        added,
        pruned,
    }
}
