//! Read-only status questions about a working tree.
//!
//! Boolean probes degrade every failure to `false`: a repository we can't ask
//! is reported as "no changes" by these, and the cache marks it `has_error`
//! through [`StatusProbe::status`] instead. Structural queries
//! ([`StatusProbe::list_worktrees`], [`StatusProbe::status`]) propagate errors,
//! because "nothing there" and "couldn't look" must stay distinguishable.

use std::path::Path;
use std::sync::Arc;

use super::worktree_list::{WorktreeRecord, parse_worktree_list};
use super::{GitError, GitRunner};

/// Reported by [`StatusProbe::current_branch`] for detached HEADs and failures.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Porcelain status marker for untracked files.
const UNTRACKED_MARKER: &str = "??";

/// Everything one `git status --porcelain -b` call tells us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    /// `None` when detached.
    pub branch: Option<String>,
    /// Configured upstream as shown in the header (`origin/main`).
    pub upstream: Option<String>,
    /// Header carries an `[ahead N]` annotation.
    pub ahead: bool,
    /// Any entry at all (staged, unstaged, untracked, conflicted).
    pub has_changes: bool,
    pub has_untracked: bool,
}

impl WorkingTreeStatus {
    /// Parse `git status --porcelain -b` output (also accepts output without
    /// the `## ` header line).
    pub fn parse(output: &str) -> Self {
        let mut status = Self::default();

        for line in output.lines() {
            if let Some(header) = line.strip_prefix("## ") {
                parse_branch_header(header, &mut status);
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            status.has_changes = true;
            if line.starts_with(UNTRACKED_MARKER) {
                status.has_untracked = true;
            }
        }

        status
    }
}

/// `main...origin/main [ahead 2, behind 1]`, `main`, `No commits yet on main`,
/// `HEAD (no branch)`.
fn parse_branch_header(header: &str, status: &mut WorkingTreeStatus) {
    status.ahead = header.contains("[ahead");

    if header.starts_with("HEAD (no branch)") {
        return;
    }
    let header = header
        .strip_prefix("No commits yet on ")
        .or_else(|| header.strip_prefix("Initial commit on "))
        .unwrap_or(header);

    let names = header.split(" [").next().unwrap_or(header).trim();
    match names.split_once("...") {
        Some((branch, upstream)) => {
            status.branch = Some(branch.to_string());
            status.upstream = Some(upstream.to_string());
        }
        None if !names.is_empty() => status.branch = Some(names.to_string()),
        None => {}
    }
}

/// Point questions answered by running git in the target path.
#[derive(Clone)]
pub struct StatusProbe {
    git: Arc<dyn GitRunner>,
}

impl StatusProbe {
    pub fn new(git: Arc<dyn GitRunner>) -> Self {
        Self { git }
    }

    /// True iff `git status --porcelain` reports anything.
    pub fn has_uncommitted_changes(&self, path: &Path) -> bool {
        match self.git.run(path, &["status", "--porcelain"]) {
            Ok(out) => WorkingTreeStatus::parse(&out).has_changes,
            Err(e) => {
                log::debug!("uncommitted check failed for {}: {}", path.display(), e);
                false
            }
        }
    }

    /// True iff `git status --porcelain` has a `??` entry.
    pub fn has_untracked_files(&self, path: &Path) -> bool {
        match self.git.run(path, &["status", "--porcelain"]) {
            Ok(out) => WorkingTreeStatus::parse(&out).has_untracked,
            Err(e) => {
                log::debug!("untracked check failed for {}: {}", path.display(), e);
                false
            }
        }
    }

    /// True if the branch header says `[ahead`, otherwise if HEAD has commits
    /// the upstream lacks. No upstream configured means `false`.
    pub fn has_unpushed_commits(&self, path: &Path) -> bool {
        if let Ok(out) = self.git.run(path, &["status", "--porcelain", "-b"])
            && WorkingTreeStatus::parse(&out).ahead
        {
            return true;
        }
        self.commits_ahead_of_upstream(path)
    }

    /// `git rev-list @{upstream}..HEAD` is non-empty. Fails (and so answers
    /// `false`) when there is no upstream.
    fn commits_ahead_of_upstream(&self, path: &Path) -> bool {
        match self.git.run(path, &["rev-list", "@{upstream}..HEAD"]) {
            Ok(out) => !out.trim().is_empty(),
            Err(e) => {
                log::trace!("no upstream comparison for {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Checked-out branch, or [`UNKNOWN_BRANCH`] when detached or unavailable.
    pub fn current_branch(&self, path: &Path) -> String {
        match self.git.run(path, &["branch", "--show-current"]) {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => UNKNOWN_BRANCH.to_string(),
            Err(e) => {
                log::debug!("branch lookup failed for {}: {}", path.display(), e);
                UNKNOWN_BRANCH.to_string()
            }
        }
    }

    /// Enumerate the worktrees of the repository at `path`.
    pub fn list_worktrees(&self, path: &Path) -> Result<Vec<WorktreeRecord>, GitError> {
        let out = self.git.run(path, &["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_list(&out))
    }

    /// One status call answering branch, uncommitted and untracked together.
    ///
    /// `ahead` is settled here too: when the header doesn't already say so but
    /// an upstream exists, the rev-list check runs.
    pub fn status(&self, path: &Path) -> Result<WorkingTreeStatus, GitError> {
        let out = self.git.run(path, &["status", "--porcelain", "-b"])?;
        let mut status = WorkingTreeStatus::parse(&out);
        if !status.ahead && status.upstream.is_some() {
            status.ahead = self.commits_ahead_of_upstream(path);
        }
        Ok(status)
    }
}
