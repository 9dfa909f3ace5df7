//! Memoized classification and status, keyed by canonical path.
//!
//! Entries are whole [`CachedStatus`] values inserted in one map operation, so
//! readers never see a half-computed result. Each invalidation takes a stamp
//! from an epoch counter and records it against its key (or, for
//! [`StatusCache::invalidate_all`], against every key). A computation that
//! started before a stamp on its own key still returns its result to the
//! caller but does not install it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

use super::model::{StatusSnapshot, canonical_path};
use crate::git::{GitRunner, PathClassifier, RepoKind, StatusProbe};
use crate::sync::CancelToken;

/// What to do when an entry is older than the freshness window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Recompute before answering.
    #[default]
    Blocking,
    /// Answer with the stale entry once and recompute in the background.
    StaleWhileRevalidate,
}

/// Classification plus status for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedStatus {
    pub kind: RepoKind,
    pub snapshot: Arc<StatusSnapshot>,
}

/// Shared memoizing front for [`PathClassifier`] and [`StatusProbe`].
///
/// Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct StatusCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    classifier: PathClassifier,
    probe: StatusProbe,
    entries: DashMap<PathBuf, CachedStatus>,
    /// Paths with a background recompute in flight.
    revalidating: DashSet<PathBuf>,
    epoch: AtomicU64,
    /// Epoch of the latest `invalidate` per path.
    invalidated: DashMap<PathBuf, u64>,
    /// Epoch of the latest `invalidate_all`.
    cleared_at: AtomicU64,
    freshness: Duration,
    policy: RefreshPolicy,
}

impl StatusCache {
    pub fn new(git: Arc<dyn GitRunner>, freshness: Duration, policy: RefreshPolicy) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                classifier: PathClassifier::new(Arc::clone(&git)),
                probe: StatusProbe::new(git),
                entries: DashMap::new(),
                revalidating: DashSet::new(),
                epoch: AtomicU64::new(0),
                invalidated: DashMap::new(),
                cleared_at: AtomicU64::new(0),
                freshness,
                policy,
            }),
        }
    }

    pub fn probe(&self) -> &StatusProbe {
        &self.inner.probe
    }

    /// Kind and status of `path`, computing them on a miss or stale entry.
    pub fn get(&self, path: &Path) -> CachedStatus {
        self.get_with_cancel(path, &CancelToken::new())
    }

    /// Like [`get`](Self::get), but a computation finishing after `cancel` fires
    /// is returned without being installed.
    pub fn get_with_cancel(&self, path: &Path, cancel: &CancelToken) -> CachedStatus {
        let key = canonical_path(path);

        // Clone out so the shard lock is released before any git call
        let existing = self.inner.entries.get(&key).map(|e| e.value().clone());
        if let Some(entry) = existing {
            let age = entry.snapshot.age();
            if age < self.inner.freshness {
                log::trace!("cache hit for {} (age {:?})", key.display(), age);
                return entry;
            }
            if self.inner.policy == RefreshPolicy::StaleWhileRevalidate {
                log::trace!("serving stale entry for {}", key.display());
                self.revalidate_in_background(key);
                return entry;
            }
            log::trace!("cache entry for {} expired", key.display());
        }

        self.inner.compute_and_install(&key, cancel)
    }

    /// Installed entry for `path`, fresh or not, without computing anything.
    pub fn peek(&self, path: &Path) -> Option<CachedStatus> {
        self.inner
            .entries
            .get(&canonical_path(path))
            .map(|e| e.value().clone())
    }

    /// Drop the entry for `path`; the next `get` re-probes.
    pub fn invalidate(&self, path: &Path) {
        let key = canonical_path(path);
        // Stamp before removing so an in-flight install can't slip in between
        let stamp = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .invalidated
            .entry(key.clone())
            .and_modify(|s| *s = (*s).max(stamp))
            .or_insert(stamp);
        self.inner.entries.remove(&key);
        log::debug!("invalidated status cache for {}", key.display());
    }

    pub fn invalidate_all(&self) {
        let stamp = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.cleared_at.fetch_max(stamp, Ordering::SeqCst);
        self.inner.entries.clear();
        // Older per-path stamps are covered by `cleared_at`
        self.inner.invalidated.retain(|_, s| *s > stamp);
        log::debug!("invalidated entire status cache");
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn revalidate_in_background(&self, key: PathBuf) {
        if !self.inner.revalidating.insert(key.clone()) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        rayon::spawn(move || {
            inner.compute_and_install(&key, &CancelToken::new());
            inner.revalidating.remove(&key);
        });
    }
}

impl CacheInner {
    fn compute_and_install(&self, key: &Path, cancel: &CancelToken) -> CachedStatus {
        let started = self.epoch.load(Ordering::SeqCst);
        let computed = self.compute(key);

        if cancel.is_cancelled() {
            log::debug!("discarding status for {} (refresh cancelled)", key.display());
            return computed;
        }
        if self.superseded(key, started) {
            log::debug!(
                "discarding status for {} (invalidated while computing)",
                key.display()
            );
            return computed;
        }

        self.entries.insert(key.to_path_buf(), computed.clone());

        // An invalidation that landed between the check and the insert wins
        if self.superseded(key, started) {
            self.entries.remove_if(key, |_, installed| {
                Arc::ptr_eq(&installed.snapshot, &computed.snapshot)
            });
        }

        computed
    }

    /// Whether `key` was invalidated after epoch `started`.
    fn superseded(&self, key: &Path, started: u64) -> bool {
        self.cleared_at.load(Ordering::SeqCst) > started
            || self
                .invalidated
                .get(key)
                .is_some_and(|stamp| *stamp > started)
    }

    fn compute(&self, path: &Path) -> CachedStatus {
        let kind = match self.classifier.classify(path) {
            Ok(kind) => kind,
            Err(e) => {
                log::warn!("Could not classify {}: {}", path.display(), e);
                return CachedStatus {
                    kind: RepoKind::NotARepository,
                    snapshot: Arc::new(StatusSnapshot::errored()),
                };
            }
        };

        let snapshot = if kind.has_working_tree() {
            match self.probe.status(path) {
                Ok(status) => StatusSnapshot {
                    has_uncommitted: status.has_changes,
                    has_unpushed: status.ahead,
                    has_untracked: status.has_untracked,
                    branch: status.branch,
                    ..StatusSnapshot::clean()
                },
                Err(e) => {
                    log::warn!("Could not read status of {}: {}", path.display(), e);
                    StatusSnapshot::errored()
                }
            }
        } else {
            // Bare repositories defer to their worktrees
            StatusSnapshot::clean()
        };

        log::debug!(
            "computed {} {} for {}",
            kind,
            snapshot.flags(),
            path.display()
        );

        CachedStatus {
            kind,
            snapshot: Arc::new(snapshot),
        }
    }
}
