//! Concurrent refresh of all tracked roots.
//!
//! ## Fan-out
//!
//! Every root becomes one task in a `rayon::scope`. A [`Semaphore`] sized to
//! `max_concurrent` bounds how many resolve at once, so a long root list never
//! turns into one git process per root at the same instant.
//!
//! ## Fan-in
//!
//! Tasks send `(index, RepositoryGroup)` over a channel. After the scope ends,
//! results are placed by index and linearized 0..N, so the output order is a
//! function of the input order and each bare repository's worktree listing,
//! never of which task finished first.
//!
//! ## Failure isolation
//!
//! A root that can't be classified or probed comes back with `has_error` set;
//! siblings are unaffected. Only an unavailable root list or cancellation
//! fails the refresh as a whole.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crossbeam_channel as chan;

use super::cache::StatusCache;
use super::model::{NodeList, RepositoryGroup, StatusSnapshot, TrackedRoot, canonical_path};
use crate::git::RepoKind;
use crate::sync::{CancelToken, Semaphore};

/// Default bound on roots resolved concurrently.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Supplies the ordered list of tracked roots.
///
/// Called once at the start of each refresh; the returned `Vec` is the
/// point-in-time copy the refresh works from.
pub trait RootProvider {
    fn roots(&self) -> anyhow::Result<Vec<TrackedRoot>>;
}

impl RootProvider for [TrackedRoot] {
    fn roots(&self) -> anyhow::Result<Vec<TrackedRoot>> {
        Ok(self.to_vec())
    }
}

impl RootProvider for Vec<TrackedRoot> {
    fn roots(&self) -> anyhow::Result<Vec<TrackedRoot>> {
        Ok(self.clone())
    }
}

/// Whole-refresh failures. Per-root problems never end up here.
#[derive(Debug)]
pub enum RefreshError {
    /// The root provider could not supply the list.
    Roots(anyhow::Error),
    /// The refresh was cancelled before it completed.
    Cancelled,
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::Roots(e) => write!(f, "could not read tracked roots: {e:#}"),
            RefreshError::Cancelled => write!(f, "refresh cancelled"),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::Roots(e) => Some(e.as_ref()),
            RefreshError::Cancelled => None,
        }
    }
}

/// Produces flattened node lists for the display layer.
pub struct Aggregator {
    cache: StatusCache,
    max_concurrent: usize,
    last_good: Mutex<Arc<NodeList>>,
}

impl Aggregator {
    pub fn new(cache: StatusCache, max_concurrent: usize) -> Self {
        Self {
            cache,
            max_concurrent: max_concurrent.max(1),
            last_good: Mutex::new(Arc::new(NodeList::default())),
        }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Resolve every root and return the flattened list.
    pub fn refresh<P>(&self, provider: &P) -> Result<Arc<NodeList>, RefreshError>
    where
        P: RootProvider + ?Sized,
    {
        self.refresh_with_cancel(provider, &CancelToken::new())
    }

    /// [`refresh`](Self::refresh) that stops early once `cancel` fires.
    ///
    /// A cancelled refresh returns [`RefreshError::Cancelled`], leaves
    /// [`cached`](Self::cached) as it was and installs no cache entries computed
    /// after the cancellation.
    pub fn refresh_with_cancel<P>(
        &self,
        provider: &P,
        cancel: &CancelToken,
    ) -> Result<Arc<NodeList>, RefreshError>
    where
        P: RootProvider + ?Sized,
    {
        let roots = provider.roots().map_err(RefreshError::Roots)?;
        let started = Instant::now();

        let limiter = Semaphore::new(self.max_concurrent);
        let (tx, rx) = chan::unbounded::<(usize, RepositoryGroup)>();

        rayon::scope(|s| {
            for (idx, root) in roots.iter().enumerate() {
                let tx = tx.clone();
                let limiter = &limiter;
                s.spawn(move |_| {
                    let _permit = limiter.acquire();
                    if cancel.is_cancelled() {
                        return;
                    }
                    let group = self.resolve_root(root, cancel);
                    // Receiver outlives the scope
                    let _ = tx.send((idx, group));
                });
            }
        });
        drop(tx);

        if cancel.is_cancelled() {
            log::debug!("refresh cancelled after {:?}", started.elapsed());
            return Err(RefreshError::Cancelled);
        }

        let mut slots: Vec<Option<RepositoryGroup>> = roots.iter().map(|_| None).collect();
        for (idx, group) in rx {
            slots[idx] = Some(group);
        }

        let groups = slots.into_iter().zip(&roots).map(|(slot, root)| {
            slot.unwrap_or_else(|| {
                log::warn!("No result for {}", root.path.display());
                RepositoryGroup::new(
                    root.clone(),
                    RepoKind::NotARepository,
                    Arc::new(StatusSnapshot::errored()),
                )
            })
        });
        let nodes = Arc::new(NodeList::from_groups(groups));

        log::debug!(
            "refreshed {} roots into {} nodes in {:?} (max {} concurrent)",
            roots.len(),
            nodes.len(),
            started.elapsed(),
            self.max_concurrent
        );

        *self.last_good.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&nodes);
        Ok(nodes)
    }

    /// Last successfully refreshed list; empty before the first refresh.
    pub fn cached(&self) -> Arc<NodeList> {
        Arc::clone(&self.last_good.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Forget cached status for `path` so the next refresh re-probes it.
    pub fn invalidate(&self, path: &Path) {
        self.cache.invalidate(path);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    fn resolve_root(&self, root: &TrackedRoot, cancel: &CancelToken) -> RepositoryGroup {
        let resolved = self.cache.get_with_cancel(&root.path, cancel);
        let mut group = RepositoryGroup::new(root.clone(), resolved.kind, resolved.snapshot);
        if resolved.kind != RepoKind::Bare {
            return group;
        }

        let records = match self.cache.probe().list_worktrees(&root.path) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Could not list worktrees of {}: {}", root.path.display(), e);
                group.status = Arc::new(group.status.with_error());
                return group;
            }
        };

        let own_path = canonical_path(&root.path);
        for record in records {
            if record.is_bare || canonical_path(&record.path) == own_path {
                continue;
            }
            if cancel.is_cancelled() {
                break;
            }
            let status = self.cache.get_with_cancel(&record.path, cancel).snapshot;
            group.worktrees.push((record, status));
        }

        group
    }
}
