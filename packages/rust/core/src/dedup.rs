//! Owner grouping, first-seen-wins deduplication, and merging with persisted
//! partitions.

use std::collections::{BTreeMap, HashMap, HashSet};

use skillsync_shared::{CandidateRecord, PartitionFile, SkillEntry, Versions, url_to_source};
use skillsync_validator::LinkCheck;
use tracing::debug;

/// Descriptions longer than this many characters are shortened.
pub const DESCRIPTION_LIMIT: usize = 200;

const TRUNCATED_CHARS: usize = 197;

/// `owner → (localKey → entry)`, ready to be planned into files.
pub type OwnerPartitions = BTreeMap<String, BTreeMap<String, SkillEntry>>;

/// Link-check id for a record: `"<owner>/<key>"`.
pub fn check_id(owner: &str, key: &str) -> String {
    format!("{owner}/{key}")
}

/// Shorten a description to at most [`DESCRIPTION_LIMIT`] characters.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let mut short: String = text.chars().take(TRUNCATED_CHARS).collect();
    short.push_str("...");
    short
}

/// Convert a surviving candidate into its persisted form.
pub fn to_entry(record: CandidateRecord) -> SkillEntry {
    SkillEntry {
        source: url_to_source(&record.source_url),
        description: truncate_description(&record.description),
        name: record.name,
        aliases: record.extra.aliases,
        tags: record.tags,
        dependencies: record.extra.dependencies,
        versions: Versions::default(),
        mcp_servers: record.extra.mcp_servers,
        extra: BTreeMap::new(),
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Collects candidates into owner groups.
pub struct Grouper;

impl Grouper {
    /// Group records by owner, keeping the first record seen for each
    /// `(owner, key)`.
    pub fn collect(records: impl IntoIterator<Item = CandidateRecord>) -> Grouped {
        let mut grouped = Grouped::default();

        for record in records {
            let owner = grouped.owners.entry(record.owner.clone()).or_default();
            if owner.contains_key(&record.id) {
                debug!(owner = %record.owner, key = %record.id, "duplicate record discarded");
                grouped.duplicates += 1;
                continue;
            }
            owner.insert(record.id.clone(), record);
        }

        grouped
    }
}

/// Candidates grouped by owner, one per `(owner, key)`.
#[derive(Debug, Default)]
pub struct Grouped {
    owners: BTreeMap<String, BTreeMap<String, CandidateRecord>>,
    /// Records discarded because an earlier one had the same `(owner, key)`.
    pub duplicates: usize,
}

/// Result of dropping unreachable records.
#[derive(Debug, Default)]
pub struct Survivors {
    pub partitions: OwnerPartitions,
    pub unreachable: usize,
}

impl Grouped {
    /// Number of distinct `(owner, key)` records.
    pub fn len(&self) -> usize {
        self.owners.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One link check per record, in owner then key order.
    pub fn link_checks(&self) -> Vec<LinkCheck> {
        self.owners
            .iter()
            .flat_map(|(owner, records)| {
                records
                    .iter()
                    .map(move |(key, r)| LinkCheck::new(check_id(owner, key), &r.source_url))
            })
            .collect()
    }

    /// Drop records whose link check failed and convert the rest.
    ///
    /// An id absent from `outcomes` counts as reachable. Owners left with no
    /// records are omitted.
    pub fn into_partitions(self, outcomes: &HashMap<String, bool>) -> Survivors {
        let mut survivors = Survivors::default();

        for (owner, records) in self.owners {
            let mut entries = BTreeMap::new();
            for (key, record) in records {
                let reachable = outcomes
                    .get(&check_id(&owner, &key))
                    .copied()
                    .unwrap_or(true);
                if !reachable {
                    debug!(
                        owner = %owner,
                        key = %key,
                        url = %record.source_url,
                        "dropping unreachable record"
                    );
                    survivors.unreachable += 1;
                    continue;
                }
                entries.insert(key, to_entry(record));
            }
            if !entries.is_empty() {
                survivors.partitions.insert(owner, entries);
            }
        }

        survivors
    }
}

// ---------------------------------------------------------------------------
// Merge with persisted state
// ---------------------------------------------------------------------------

/// Outcome of merging one planned file into its persisted counterpart.
#[derive(Debug)]
pub struct MergeOutcome {
    pub file: PartitionFile,
    /// Incoming entries written into the file.
    pub merged: usize,
    /// Incoming entries rejected because their source is already persisted.
    pub rejected: usize,
}

/// Merge `incoming` into `existing`.
///
/// Persisted entries are kept. An incoming entry whose `source` appears in
/// `existing_sources` is rejected; otherwise it is written, replacing any
/// persisted entry under the same key.
pub fn merge_with_existing(
    existing: PartitionFile,
    incoming: BTreeMap<String, SkillEntry>,
    existing_sources: &HashSet<String>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        file: existing,
        merged: 0,
        rejected: 0,
    };

    for (key, entry) in incoming {
        if existing_sources.contains(&entry.source) {
            debug!(key = %key, source = %entry.source, "source already registered, skipping");
            outcome.rejected += 1;
            continue;
        }
        outcome.file.skills.insert(key, entry);
        outcome.merged += 1;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillsync_shared::RecordKind;

    fn skill(name: &str, url: &str, owner: &str) -> CandidateRecord {
        CandidateRecord::new(RecordKind::Skill, name, url, "desc", owner).unwrap()
    }

    fn entry(name: &str, source: &str) -> SkillEntry {
        SkillEntry {
            name: name.into(),
            source: source.into(),
            aliases: vec![],
            description: String::new(),
            tags: vec![],
            dependencies: vec![],
            versions: Versions::default(),
            mcp_servers: vec![],
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn first_seen_wins_per_owner() {
        let grouped = Grouper::collect([
            skill("Foo Bar", "https://github.com/acme/foo", "acme"),
            skill("foo-bar", "https://github.com/acme/other", "acme"),
            skill("Foo Bar", "https://github.com/zeta/foo", "zeta"),
        ]);

        assert_eq!(grouped.duplicates, 1);
        assert_eq!(grouped.len(), 2);

        let checks = grouped.link_checks();
        let ids: Vec<&str> = checks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["acme/foo-bar", "zeta/foo-bar"]);
        assert_eq!(checks[0].url, "https://github.com/acme/foo");
    }

    #[test]
    fn unreachable_records_are_dropped() {
        let grouped = Grouper::collect([
            skill("One", "https://github.com/acme/one", "acme"),
            skill("Two", "https://github.com/acme/two", "acme"),
            skill("Solo", "https://github.com/zeta/solo", "zeta"),
        ]);
        let outcomes = HashMap::from([
            ("acme/one".to_string(), true),
            ("acme/two".to_string(), false),
            ("zeta/solo".to_string(), false),
        ]);

        let survivors = grouped.into_partitions(&outcomes);

        assert_eq!(survivors.unreachable, 2);
        assert_eq!(survivors.partitions.len(), 1);
        let acme = &survivors.partitions["acme"];
        assert_eq!(acme.len(), 1);
        assert_eq!(acme["one"].source, "github:acme/one");
    }

    #[test]
    fn missing_outcome_counts_as_reachable() {
        let grouped = Grouper::collect([skill("One", "https://example.com/x", "acme")]);
        let survivors = grouped.into_partitions(&HashMap::new());
        assert_eq!(survivors.unreachable, 0);
        assert_eq!(survivors.partitions["acme"]["one"].source, "https://example.com/x");
    }

    #[test]
    fn long_descriptions_are_truncated_by_chars() {
        let long = "é".repeat(250);
        let short = truncate_description(&long);
        assert_eq!(short.chars().count(), 200);
        assert!(short.ends_with("..."));
        assert!(short.starts_with(&"é".repeat(197)));

        let exact = "x".repeat(200);
        assert_eq!(truncate_description(&exact), exact);
    }

    #[test]
    fn merge_keeps_persisted_and_rejects_known_sources() {
        let mut existing = PartitionFile::default();
        existing.skills.insert("old".into(), entry("Old", "github:acme/old"));

        let incoming = BTreeMap::from([
            ("again".to_string(), entry("Again", "github:acme/old")),
            ("new".to_string(), entry("New", "github:acme/new")),
        ]);
        let sources = HashSet::from(["github:acme/old".to_string()]);

        let outcome = merge_with_existing(existing, incoming, &sources);

        assert_eq!(outcome.merged, 1);
        assert_eq!(outcome.rejected, 1);
        let keys: Vec<&str> = outcome.file.skills.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["new", "old"]);
    }

    #[test]
    fn merge_key_collision_takes_incoming() {
        let mut existing = PartitionFile::default();
        existing.skills.insert("tool".into(), entry("Tool", "github:acme/v1"));

        let incoming = BTreeMap::from([("tool".to_string(), entry("Tool", "github:acme/v2"))]);
        let sources = HashSet::from(["github:acme/v1".to_string()]);

        let outcome = merge_with_existing(existing, incoming, &sources);
        assert_eq!(outcome.file.skills["tool"].source, "github:acme/v2");
    }
}
