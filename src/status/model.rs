//! Nodes handed to the display layer.
//!
//! A refresh produces a [`NodeList`]: repository nodes in tracked-root order,
//! each bare repository immediately followed by its worktrees. Worktree nodes
//! point at their repository by index into the same list, so the list can be
//! cloned, stored or dropped without dangling references.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use normalize_path::NormalizePath;
use serde::{Deserialize, Serialize};

use crate::git::{RepoKind, WorktreeRecord};

/// Canonical identity of a path.
///
/// Existing paths are resolved with `dunce::canonicalize` (symlinks, `..`, no
/// Windows verbatim prefix). Paths that don't exist (yet) fall back to the
/// lexically normalized absolute path.
pub fn canonical_path(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| {
        std::path::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .normalize()
    })
}

/// A path the user asked to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackedRoot {
    pub name: String,
    pub path: PathBuf,
    /// Added by worktree discovery rather than by the user.
    #[serde(default)]
    pub auto_discover: bool,
}

impl TrackedRoot {
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: canonical_path(path.as_ref()),
            auto_discover: false,
        }
    }

    /// Root named after the last path component.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = canonical_path(path.as_ref());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path,
            auto_discover: false,
        }
    }

    /// Root created from a worktree found under a bare repository.
    pub fn discovered(record: &WorktreeRecord) -> Self {
        Self {
            auto_discover: true,
            ..Self::new(record.label(), &record.path)
        }
    }

    /// Identity comparison on canonical paths.
    pub fn is_at(&self, path: &Path) -> bool {
        canonical_path(&self.path) == canonical_path(path)
    }
}

/// Change state of one path at one moment. Shared as `Arc` and never mutated;
/// a later observation is a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub has_uncommitted: bool,
    pub has_unpushed: bool,
    pub has_untracked: bool,
    pub has_error: bool,
    pub branch: Option<String>,
    pub observed_at: Instant,
}

impl StatusSnapshot {
    /// No changes, no error. Also what bare repositories and non-repositories report.
    pub fn clean() -> Self {
        Self {
            has_uncommitted: false,
            has_unpushed: false,
            has_untracked: false,
            has_error: false,
            branch: None,
            observed_at: Instant::now(),
        }
    }

    pub fn errored() -> Self {
        Self {
            has_error: true,
            ..Self::clean()
        }
    }

    /// Copy of `self` flagged as errored, keeping the observation time.
    pub fn with_error(&self) -> Self {
        Self {
            has_error: true,
            ..self.clone()
        }
    }

    pub fn is_clean(&self) -> bool {
        !(self.has_uncommitted || self.has_unpushed || self.has_untracked || self.has_error)
    }

    pub fn age(&self) -> Duration {
        self.observed_at.elapsed()
    }

    /// Four fixed-width flag columns: `*` uncommitted, `?` untracked,
    /// `↑` unpushed, `!` error, `.` when unset.
    pub fn flags(&self) -> String {
        [
            (self.has_uncommitted, '*'),
            (self.has_untracked, '?'),
            (self.has_unpushed, '↑'),
            (self.has_error, '!'),
        ]
        .iter()
        .map(|&(set, symbol)| if set { symbol } else { '.' })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryNode {
    pub root: TrackedRoot,
    pub kind: RepoKind,
    pub status: Arc<StatusSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeNode {
    pub record: WorktreeRecord,
    /// Index of the owning bare repository's node in the same [`NodeList`].
    pub parent: usize,
    pub is_last: bool,
    pub status: Arc<StatusSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigableNode {
    Repository(RepositoryNode),
    Worktree(WorktreeNode),
}

impl NavigableNode {
    pub fn path(&self) -> &Path {
        match self {
            NavigableNode::Repository(repo) => &repo.root.path,
            NavigableNode::Worktree(wt) => &wt.record.path,
        }
    }

    pub fn status(&self) -> &Arc<StatusSnapshot> {
        match self {
            NavigableNode::Repository(repo) => &repo.status,
            NavigableNode::Worktree(wt) => &wt.status,
        }
    }

    pub fn as_repository(&self) -> Option<&RepositoryNode> {
        match self {
            NavigableNode::Repository(repo) => Some(repo),
            NavigableNode::Worktree(_) => None,
        }
    }

    pub fn as_worktree(&self) -> Option<&WorktreeNode> {
        match self {
            NavigableNode::Repository(_) => None,
            NavigableNode::Worktree(wt) => Some(wt),
        }
    }
}

/// Everything resolved for one tracked root: the per-task result of a refresh.
#[derive(Debug, Clone)]
pub struct RepositoryGroup {
    pub root: TrackedRoot,
    pub kind: RepoKind,
    pub status: Arc<StatusSnapshot>,
    /// Worktrees in enumeration order. Only ever non-empty for bare repositories.
    pub worktrees: Vec<(WorktreeRecord, Arc<StatusSnapshot>)>,
}

impl RepositoryGroup {
    pub fn new(root: TrackedRoot, kind: RepoKind, status: Arc<StatusSnapshot>) -> Self {
        Self {
            root,
            kind,
            status,
            worktrees: Vec::new(),
        }
    }
}

/// The flattened, ordered output of a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeList {
    nodes: Vec<NavigableNode>,
}

impl NodeList {
    /// Flatten groups, in the given order, into repository nodes followed by
    /// their worktrees. The last worktree of each group gets `is_last`.
    pub fn from_groups(groups: impl IntoIterator<Item = RepositoryGroup>) -> Self {
        let mut nodes = Vec::new();

        for group in groups {
            let parent = nodes.len();
            // Worktrees only hang off bare repositories
            let worktrees = if group.kind == RepoKind::Bare {
                group.worktrees
            } else {
                debug_assert!(group.worktrees.is_empty());
                Vec::new()
            };

            nodes.push(NavigableNode::Repository(RepositoryNode {
                root: group.root,
                kind: group.kind,
                status: group.status,
            }));

            let count = worktrees.len();
            nodes.extend(
                worktrees
                    .into_iter()
                    .enumerate()
                    .map(|(i, (record, status))| {
                        NavigableNode::Worktree(WorktreeNode {
                            record,
                            parent,
                            is_last: i + 1 == count,
                            status,
                        })
                    }),
            );
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NavigableNode> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NavigableNode> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[NavigableNode] {
        &self.nodes
    }

    /// The repository node that owns `worktree`.
    pub fn parent_of(&self, worktree: &WorktreeNode) -> Option<&RepositoryNode> {
        self.nodes.get(worktree.parent)?.as_repository()
    }

    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryNode> {
        self.nodes.iter().filter_map(NavigableNode::as_repository)
    }

    /// Worktree nodes owned by the repository node at `index`.
    pub fn worktrees_of(&self, index: usize) -> impl Iterator<Item = &WorktreeNode> {
        self.nodes
            .iter()
            .skip(index + 1)
            .map_while(NavigableNode::as_worktree)
            .filter(move |wt| wt.parent == index)
    }

    /// Index of the node at `path`, if any.
    pub fn position(&self, path: &Path) -> Option<usize> {
        let path = canonical_path(path);
        self.nodes
            .iter()
            .position(|node| canonical_path(node.path()) == path)
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a NavigableNode;
    type IntoIter = std::slice::Iter<'a, NavigableNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Display for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            match node {
                NavigableNode::Repository(repo) => writeln!(
                    f,
                    "{} {} ({}) {}",
                    repo.status.flags(),
                    repo.root.name,
                    repo.kind,
                    repo.root.path.display()
                )?,
                NavigableNode::Worktree(wt) => writeln!(
                    f,
                    "{} {} {} {}",
                    wt.status.flags(),
                    if wt.is_last { "└─" } else { "├─" },
                    wt.record.label(),
                    wt.record.path.display()
                )?,
            }
        }
        Ok(())
    }
}
