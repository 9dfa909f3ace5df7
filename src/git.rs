//! Git access for treewatch.
//!
//! All questions go through a [`GitRunner`], normally [`SystemGit`]. Nothing in
//! this module writes to a repository.

mod classify;
mod error;
mod probe;
pub(crate) mod runner;
mod worktree_list;

pub use classify::{GITDIR_MARKER, PathClassifier, RepoKind};
pub use error::GitError;
pub use probe::{StatusProbe, UNKNOWN_BRANCH, WorkingTreeStatus};
pub use runner::{GitRunner, SystemGit};
pub use worktree_list::{WorktreeRecord, parse_worktree_list};
