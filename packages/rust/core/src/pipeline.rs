//! End-to-end `sync` pipeline: catalogs → group → validate → partition →
//! manifest → search index.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use skillsync_shared::{
    AppConfig, CandidateRecord, PartitionConfig, RecordKind, Result, SourcesConfig, SyncError,
    ValidatorConfig,
};
use skillsync_sources::{CatalogClient, fetch_connector_candidates, fetch_skill_candidates};
use skillsync_validator::{HttpProbe, LinkProbe, LinkValidator};
use tracing::{error, info, instrument, warn};

use crate::dedup::{Grouper, merge_with_existing};
use crate::index::{IndexReport, build_search_index};
use crate::manifest::{MANIFEST_FILE, load_manifest, reconcile, save_manifest};
use crate::partition::{self, PartitionReport, load_existing, plan};

/// Candidates per record kind, as fetched from the catalogs.
pub type Candidates = BTreeMap<RecordKind, Vec<CandidateRecord>>;

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Registry root holding `index.json`, `all.json`, and category folders.
    pub registry_dir: PathBuf,
    pub validator: ValidatorConfig,
    pub partition: PartitionConfig,
    /// Upstream catalogs.
    pub sources: SourcesConfig,
    /// Base URL of the contents API.
    pub api_base: String,
    /// Rebuild `all.json` after the manifest is saved.
    pub build_index: bool,
}

impl SyncConfig {
    /// Build a run configuration from the loaded config file.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            registry_dir: PathBuf::from(&config.registry.dir),
            validator: ValidatorConfig::try_from(config)?,
            partition: PartitionConfig::from(config),
            sources: config.sources.clone(),
            api_base: config.github.api_base.clone(),
            build_index: true,
        })
    }
}

/// Per-kind counts of a run.
#[derive(Debug, Clone)]
pub struct KindSummary {
    pub kind: RecordKind,
    /// Candidates received from the catalog.
    pub fetched: usize,
    /// Discarded by first-seen-wins.
    pub duplicates: usize,
    /// Dropped after failing link validation.
    pub unreachable: usize,
    /// Rejected in merge mode because the source is already registered.
    pub already_registered: usize,
    /// Listed files from earlier runs not produced by this one, removed
    /// outside merge mode.
    pub stale: Vec<String>,
    pub written: PartitionReport,
}

/// Result of a sync run.
#[derive(Debug)]
pub struct SyncResult {
    pub kinds: Vec<KindSummary>,
    /// `(category, filename)` newly listed in the manifest.
    pub added: Vec<(String, String)>,
    /// `(category, filename)` removed from the manifest.
    pub pruned: Vec<(String, String)>,
    /// Records across every written partition.
    pub total_records: usize,
    /// `None` when the index build was skipped.
    pub index: Option<IndexReport>,
    pub dry_run: bool,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called each time a link check resolves.
    fn link_checked(&self, id: &str, reachable: bool, done: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &SyncResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn link_checked(&self, _id: &str, _reachable: bool, _done: usize, _total: usize) {}
    fn done(&self, _result: &SyncResult) {}
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Fetch every catalog, then run the pipeline with HTTP link validation.
pub async fn sync(config: &SyncConfig, progress: &dyn ProgressReporter) -> Result<SyncResult> {
    progress.phase("Fetching catalogs");
    let candidates = fetch_candidates(config).await?;
    let validator: LinkValidator<HttpProbe> = LinkValidator::http(config.validator.clone())?;
    run_sync(config, candidates, &validator, progress).await
}

/// Fetch candidates from every configured catalog.
///
/// A failing catalog is left out of the result, so its category is not
/// rewritten. Fails only when every catalog is unavailable.
#[instrument(skip_all, fields(api = %config.api_base))]
pub async fn fetch_candidates(config: &SyncConfig) -> Result<Candidates> {
    let client = CatalogClient::new(&config.api_base)?;
    let mut candidates = Candidates::new();
    let mut failed = 0;

    for kind in RecordKind::ALL {
        let fetched = match kind {
            RecordKind::Skill => fetch_skill_candidates(&client, &config.sources.skills).await,
            RecordKind::Connector => {
                fetch_connector_candidates(&client, &config.sources.connectors).await
            }
        };
        match fetched {
            Ok(records) => {
                candidates.insert(kind, records);
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "catalog unavailable, continuing without it");
                failed += 1;
            }
        }
    }

    if failed == RecordKind::ALL.len() {
        return Err(SyncError::UpstreamUnavailable);
    }
    Ok(candidates)
}

/// Run the pipeline over already-fetched candidates.
///
/// A kind absent from `candidates` keeps its partitions and manifest entries
/// untouched; its persisted records still count toward the total.
///
/// 1. Load the manifest (fails fast on a corrupt one)
/// 2. Per kind: group, validate links, drop unreachable records
/// 3. Per kind: plan partitions, merge with persisted files, write, drop
///    stale files
/// 4. Reconcile and save the manifest
/// 5. Rebuild the search index
#[instrument(skip_all, fields(registry = %config.registry_dir.display(), dry_run = config.partition.dry_run))]
pub async fn run_sync<P: LinkProbe>(
    config: &SyncConfig,
    mut candidates: Candidates,
    validator: &LinkValidator<P>,
    progress: &dyn ProgressReporter,
) -> Result<SyncResult> {
    let start = Instant::now();
    let dry_run = config.partition.dry_run;
    let manifest_path = config.registry_dir.join(MANIFEST_FILE);

    // --- Phase 1: Manifest ---
    progress.phase("Loading manifest");
    let manifest = load_manifest(&manifest_path)?;

    let mut kinds = Vec::new();
    let mut new_by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut planned_files: HashSet<(String, String)> = HashSet::new();
    let mut stale_files: HashSet<(String, String)> = HashSet::new();
    let mut total_records = 0;

    for kind in RecordKind::ALL {
        let category = kind.category();
        let category_dir = config.registry_dir.join(category);
        let listed = manifest.categories.get(category).cloned().unwrap_or_default();

        let Some(records) = candidates.remove(&kind) else {
            let kept: usize = load_existing(&category_dir, &listed)
                .files
                .values()
                .map(|f| f.skills.len())
                .sum();
            warn!(
                kind = %kind,
                files = listed.len(),
                records = kept,
                "no catalog data, keeping existing partitions"
            );
            total_records += kept;
            continue;
        };
        let fetched = records.len();

        // --- Phase 2: Group + validate ---
        let grouped = Grouper::collect(records);
        let duplicates = grouped.duplicates;

        progress.phase(&format!("Validating {kind} links"));
        let outcomes = validator
            .validate_all_with(grouped.link_checks(), |outcome, done, total| {
                progress.link_checked(&outcome.id, outcome.reachable, done, total);
            })
            .await;
        let survivors = grouped.into_partitions(&outcomes);

        // --- Phase 3: Partition ---
        progress.phase(&format!("Writing {kind} partitions"));
        let mut planned = plan(survivors.partitions, config.partition.min_records_per_file);

        let mut already_registered = 0;
        if config.partition.merge_existing {
            let mut existing = load_existing(&category_dir, listed.iter().chain(planned.keys()));
            for (filename, file) in planned.iter_mut() {
                let persisted = existing.files.remove(filename).unwrap_or_default();
                let incoming = std::mem::take(&mut file.skills);
                let outcome = merge_with_existing(persisted, incoming, &existing.sources);
                already_registered += outcome.rejected;
                *file = outcome.file;
            }
        }

        let written = partition::write(&category_dir, &planned, &config.partition)?;
        let stale = if config.partition.merge_existing {
            Vec::new()
        } else {
            partition::remove_stale(&category_dir, &listed, &planned, dry_run)?
        };

        info!(
            kind = %kind,
            fetched,
            duplicates,
            unreachable = survivors.unreachable,
            already_registered,
            stale = stale.len(),
            files = written.files.len(),
            records = written.total_records,
            "kind synced"
        );

        total_records += written.total_records;
        for file in &written.files {
            planned_files.insert((category.to_string(), file.filename.clone()));
        }
        for filename in &stale {
            stale_files.insert((category.to_string(), filename.clone()));
        }
        new_by_category.insert(category.to_string(), written.filenames());
        kinds.push(KindSummary {
            kind,
            fetched,
            duplicates,
            unreachable: survivors.unreachable,
            already_registered,
            stale,
            written,
        });
    }

    // --- Phase 4: Manifest ---
    progress.phase("Reconciling manifest");
    let registry_dir = &config.registry_dir;
    let report = reconcile(
        manifest,
        &new_by_category,
        total_records,
        chrono::Utc::now().date_naive(),
        |category, filename| {
            let key = (category.to_string(), filename.to_string());
            if stale_files.contains(&key) {
                return false;
            }
            planned_files.contains(&key) || registry_dir.join(category).join(filename).is_file()
        },
    );
    save_manifest(&manifest_path, &report.manifest, dry_run)?;

    // --- Phase 5: Search index ---
    let index = if config.build_index && !dry_run {
        progress.phase("Building search index");
        Some(build_search_index(registry_dir, &report.manifest, false)?)
    } else {
        if config.build_index {
            info!("[dry run] search index not rebuilt");
        }
        None
    };

    let result = SyncResult {
        kinds,
        added: report.added,
        pruned: report.pruned,
        total_records,
        index,
        dry_run,
        elapsed: start.elapsed(),
    };

    info!(
        total = result.total_records,
        added = result.added.len(),
        pruned = result.pruned.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "sync complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Rebuild `all.json` from the manifest currently on disk.
pub fn rebuild_index(registry_dir: &Path, dry_run: bool) -> Result<IndexReport> {
    let manifest = load_manifest(&registry_dir.join(MANIFEST_FILE))?;
    build_search_index(registry_dir, &manifest, dry_run)
}
