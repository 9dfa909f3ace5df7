//! Parser for `git worktree list --porcelain`.
//!
//! The format is blocks of `key value` lines separated by blank lines:
//!
//! ```text
//! worktree /repos/proj
//! bare
//!
//! worktree /repos/proj-main
//! HEAD 85a1ce7c7182540f9c02453441cb3e8bf0ced214
//! branch refs/heads/main
//! ```
//!
//! Parsing never fails. Unknown keys are skipped for forward compatibility, and
//! lines that arrive before any `worktree` line have nothing to attach to and are
//! dropped. Whether git could be run at all is the command layer's concern.

use std::path::PathBuf;

/// One entry of a worktree listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorktreeRecord {
    pub path: PathBuf,
    /// Checked-out branch with `refs/heads/` stripped; `None` when detached or bare.
    pub branch: Option<String>,
    pub is_bare: bool,
    pub head: Option<String>,
    pub detached: bool,
    /// Lock reason (empty when locked without one).
    pub locked: Option<String>,
    /// Prune reason (empty when prunable without one).
    pub prunable: Option<String>,
}

impl WorktreeRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Branch name for display, or the directory name when there is no branch.
    pub fn label(&self) -> String {
        match &self.branch {
            Some(branch) => branch.clone(),
            None => self
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string()),
        }
    }
}

/// Parse porcelain output into records, in listing order.
pub fn parse_worktree_list(output: &str) -> Vec<WorktreeRecord> {
    let mut records = Vec::new();
    let mut current: Option<WorktreeRecord> = None;

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if let Some(record) = current.take() {
                records.push(record);
            }
            continue;
        }

        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, Some(v)),
            None => (line, None),
        };

        if key == "worktree" {
            // A `worktree` line without a blank separator still starts a new record
            if let Some(record) = current.take() {
                records.push(record);
            }
            match value {
                Some(path) if !path.is_empty() => current = Some(WorktreeRecord::new(path)),
                _ => log::debug!("Ignoring worktree line without a path"),
            }
            continue;
        }

        let Some(record) = current.as_mut() else {
            log::trace!("Ignoring porcelain line outside a worktree block: {line}");
            continue;
        };

        match key {
            "branch" => {
                if let Some(branch_ref) = value {
                    let branch = branch_ref.strip_prefix("refs/heads/").unwrap_or(branch_ref);
                    record.branch = Some(branch.to_string());
                }
            }
            "bare" => record.is_bare = true,
            "HEAD" => record.head = value.map(str::to_string),
            "detached" => record.detached = true,
            "locked" => record.locked = Some(value.unwrap_or("").to_string()),
            "prunable" => record.prunable = Some(value.unwrap_or("").to_string()),
            _ => {}
        }
    }

    if let Some(record) = current {
        records.push(record);
    }

    records
}
