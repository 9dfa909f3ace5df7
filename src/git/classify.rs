//! Repository classification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{GitError, GitRunner};

/// Prefix of a `.git` file that links a worktree to its repository.
pub const GITDIR_MARKER: &str = "gitdir:";

/// What a tracked path turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum RepoKind {
    NotARepository,
    Regular,
    Bare,
    Worktree,
}

impl RepoKind {
    pub fn is_repository(self) -> bool {
        !matches!(self, RepoKind::NotARepository)
    }

    /// Regular checkouts and worktrees have a working tree to probe; bare
    /// repositories and non-repositories don't.
    pub fn has_working_tree(self) -> bool {
        matches!(self, RepoKind::Regular | RepoKind::Worktree)
    }
}

/// Decides what kind of repository (if any) lives at a path.
#[derive(Clone)]
pub struct PathClassifier {
    git: Arc<dyn GitRunner>,
}

impl PathClassifier {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self { git }
    }

    /// Classify `path`.
    ///
    /// Checks, in order: a `.git` directory (regular), a `.git` file starting
    /// with `gitdir:` (worktree), `rev-parse --is-bare-repository` (bare), and
    /// finally whether `rev-parse --git-dir` resolves at all (regular, else not a
    /// repository). Git exiting non-zero is an answer, not an error; only
    /// timeouts, spawn failures and missing paths come back as `Err`.
    pub fn classify(&self, path: &Path) -> Result<RepoKind, GitError> {
        let dot_git = path.join(".git");
        match std::fs::metadata(&dot_git) {
            Ok(meta) if meta.is_dir() => return Ok(RepoKind::Regular),
            Ok(meta) if meta.is_file() => {
                if std::fs::read_to_string(&dot_git)
                    .is_ok_and(|content| content.trim_start().starts_with(GITDIR_MARKER))
                {
                    return Ok(RepoKind::Worktree);
                }
                log::debug!("{} is a file without a gitdir marker", dot_git.display());
            }
            _ => {}
        }

        match self.git.run(path, &["rev-parse", "--is-bare-repository"]) {
            Ok(out) if out.trim() == "true" => return Ok(RepoKind::Bare),
            Ok(_) => {}
            Err(e) if e.is_exit() => {}
            Err(e) => return Err(e),
        }

        match self.git.run(path, &["rev-parse", "--git-dir"]) {
            Ok(_) => Ok(RepoKind::Regular),
            Err(e) if e.is_exit() => Ok(RepoKind::NotARepository),
            Err(e) => Err(e),
        }
    }

    /// Whether `path` is a linked worktree, judged by git rather than by the
    /// `.git` file: a linked worktree's git dir differs from the common dir.
    pub fn is_linked_worktree(&self, path: &Path) -> Result<bool, GitError> {
        match self.git.run(path, &["rev-parse", "--is-inside-work-tree"]) {
            Ok(out) if out.trim() == "true" => {}
            Ok(_) => return Ok(false),
            Err(e) if e.is_exit() => return Ok(false),
            Err(e) => return Err(e),
        }

        let common_dir = self.git.run(path, &["rev-parse", "--git-common-dir"])?;
        let git_dir = self.git.run(path, &["rev-parse", "--git-dir"])?;
        Ok(resolve_git_path(path, &common_dir) != resolve_git_path(path, &git_dir))
    }
}

/// `rev-parse` prints paths relative to the working directory unless they are
/// outside it; resolve both forms to a comparable absolute path.
fn resolve_git_path(base: &Path, output: &str) -> PathBuf {
    let raw = PathBuf::from(output.trim());
    let joined = if raw.is_absolute() {
        raw
    } else {
        base.join(raw)
    };
    crate::status::canonical_path(&joined)
}
