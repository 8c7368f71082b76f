//! Bounded-concurrency link validation.
//!
//! Entries wait in a FIFO queue; at most `concurrency` checks are in flight
//! and a new one is admitted exactly when one finishes. Each check runs its
//! attempts sequentially: a timeout or transport failure is retried after a
//! fixed backoff until `max_attempts` is spent. An HTTP status is final.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use skillsync_shared::{Result, ValidatorConfig};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::probe::{HttpProbe, LinkProbe, ProbeOutcome};

/// First status code counted as broken (client-error class).
const BROKEN_STATUS_FLOOR: u16 = 400;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A link to check, identified by a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheck {
    pub id: String,
    pub url: String,
}

impl LinkCheck {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Final verdict for one submitted id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub id: String,
    pub reachable: bool,
}

/// Timing and retry knobs copied into every spawned check.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempt_timeout: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

// ---------------------------------------------------------------------------
// LinkValidator
// ---------------------------------------------------------------------------

/// Checks batches of links with bounded parallelism.
pub struct LinkValidator<P> {
    config: ValidatorConfig,
    probe: Arc<P>,
}

impl LinkValidator<HttpProbe> {
    /// Validator backed by real HTTP GETs.
    pub fn http(config: ValidatorConfig) -> Result<Self> {
        Ok(Self::with_probe(config, HttpProbe::new()?))
    }
}

impl<P: LinkProbe> LinkValidator<P> {
    /// Validator backed by a custom probe.
    pub fn with_probe(config: ValidatorConfig, probe: P) -> Self {
        Self {
            config,
            probe: Arc::new(probe),
        }
    }

    /// Check every entry and return `id → reachable`.
    pub async fn validate_all(&self, entries: Vec<LinkCheck>) -> HashMap<String, bool> {
        self.validate_all_with(entries, |_, _, _| {}).await
    }

    /// Like [`validate_all`](Self::validate_all), calling `on_complete` with
    /// `(outcome, completed, total)` as each id resolves.
    ///
    /// The returned map holds every distinct submitted id exactly once. When
    /// an id appears more than once only its first URL is checked.
    #[instrument(skip_all, fields(entries = entries.len(), enabled = self.config.enabled))]
    pub async fn validate_all_with<F>(
        &self,
        entries: Vec<LinkCheck>,
        mut on_complete: F,
    ) -> HashMap<String, bool>
    where
        F: FnMut(&ValidationOutcome, usize, usize),
    {
        let start = Instant::now();
        let mut seen = HashSet::with_capacity(entries.len());
        let unique: Vec<LinkCheck> = entries
            .into_iter()
            .filter(|e| {
                let fresh = seen.insert(e.id.clone());
                if !fresh {
                    debug!(id = %e.id, "duplicate link id ignored");
                }
                fresh
            })
            .collect();

        let total = unique.len();
        let mut results: HashMap<String, bool> = HashMap::with_capacity(total);
        let mut record = |outcome: ValidationOutcome, results: &mut HashMap<String, bool>| {
            if !outcome.reachable {
                debug!(id = %outcome.id, "broken link");
            }
            results.insert(outcome.id.clone(), outcome.reachable);
            on_complete(&outcome, results.len(), total);
        };

        if !self.config.enabled {
            for entry in unique {
                record(
                    ValidationOutcome {
                        id: entry.id,
                        reachable: true,
                    },
                    &mut results,
                );
            }
            return results;
        }

        let mut pending: VecDeque<(String, Url)> = VecDeque::with_capacity(total);
        for entry in unique {
            match parse_link(&entry.url) {
                Some(url) => pending.push_back((entry.id, url)),
                None => {
                    debug!(id = %entry.id, url = %entry.url, "malformed link, not requested");
                    record(
                        ValidationOutcome {
                            id: entry.id,
                            reachable: false,
                        },
                        &mut results,
                    );
                }
            }
        }

        let admitted: Vec<String> = pending.iter().map(|(id, _)| id.clone()).collect();
        let limit = self.config.concurrency.max(1);
        let policy = RetryPolicy {
            attempt_timeout: self.config.attempt_timeout,
            max_attempts: self.config.max_attempts.max(1),
            retry_backoff: self.config.retry_backoff,
        };

        info!(
            queued = pending.len(),
            concurrency = limit,
            timeout_ms = policy.attempt_timeout.as_millis(),
            max_attempts = policy.max_attempts,
            "validating links"
        );

        let mut active: JoinSet<ValidationOutcome> = JoinSet::new();
        loop {
            while active.len() < limit {
                let Some((id, url)) = pending.pop_front() else {
                    break;
                };
                let probe = Arc::clone(&self.probe);
                active.spawn(async move {
                    let reachable = check_link(probe.as_ref(), &url, policy).await;
                    ValidationOutcome { id, reachable }
                });
            }

            match active.join_next().await {
                Some(Ok(outcome)) => record(outcome, &mut results),
                Some(Err(e)) => warn!(error = %e, "link check task failed"),
                None => break,
            }
        }

        // A check whose task died never reported; it counts as broken.
        for id in admitted {
            if !results.contains_key(&id) {
                record(
                    ValidationOutcome {
                        id,
                        reachable: false,
                    },
                    &mut results,
                );
            }
        }

        let broken = results.values().filter(|ok| !**ok).count();
        info!(
            checked = results.len(),
            broken,
            duration_ms = start.elapsed().as_millis(),
            "link validation completed"
        );

        results
    }
}

/// Only absolute http(s) URLs are worth a request.
fn parse_link(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Url::parse(raw)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}

/// Run up to `max_attempts` attempts against one link.
async fn check_link<P: LinkProbe>(probe: &P, url: &Url, policy: RetryPolicy) -> bool {
    for attempt in 1..=policy.max_attempts {
        let failure = match tokio::time::timeout(policy.attempt_timeout, probe.probe(url)).await {
            Ok(ProbeOutcome::Status(code)) => {
                debug!(%url, attempt, status = code, "link answered");
                return code < BROKEN_STATUS_FLOOR;
            }
            Ok(ProbeOutcome::Transport(reason)) => reason,
            Err(_) => format!("timed out after {}ms", policy.attempt_timeout.as_millis()),
        };

        debug!(%url, attempt, reason = %failure, "link attempt failed");
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.retry_backoff).await;
        }
    }
    false
}
