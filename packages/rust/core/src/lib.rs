//! Core sync pipeline for skillsync.
//!
//! - [`dedup`]: owner grouping, first-seen-wins, merging with persisted files
//! - [`partition`]: per-owner file planning and atomic writes
//! - [`manifest`]: `index.json` load, reconcile, save
//! - [`index`]: `all.json` search index
//! - [`pipeline`]: the end-to-end `sync` run

pub mod dedup;
pub mod index;
pub mod manifest;
pub mod partition;
pub mod pipeline;
mod store;

pub use dedup::{Grouped, Grouper, OwnerPartitions, merge_with_existing};
pub use index::{IndexReport, build_search_index};
pub use manifest::{ReconcileReport, load_manifest, reconcile, save_manifest};
pub use partition::{OVERFLOW_FILE, PartitionReport, WrittenPartition};
pub use pipeline::{
    Candidates, KindSummary, ProgressReporter, SilentProgress, SyncConfig, SyncResult,
    fetch_candidates, rebuild_index, run_sync, sync,
};
