//! Errors from the git command layer.
//!
//! Only structural queries (classification, worktree enumeration) hand these to
//! callers. Boolean probes swallow them and answer `false`.

use std::path::PathBuf;

/// Failure to get an answer out of git for a path.
#[derive(Debug)]
pub enum GitError {
    /// The target path does not exist or is not a directory, so git can't run there.
    PathMissing { path: PathBuf },
    /// The command exceeded its per-call timeout and was killed.
    Timeout { command: String, path: PathBuf },
    /// The executable could not be started (missing, permission denied, ...).
    Spawn {
        command: String,
        source: std::io::Error,
    },
    /// The command ran and exited non-zero.
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl GitError {
    /// True when git ran and reported failure through its exit code.
    ///
    /// Classification treats these as answers ("not bare", "not a repository");
    /// every other variant means no answer was obtained.
    pub fn is_exit(&self) -> bool {
        matches!(self, GitError::Exit { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GitError::Timeout { .. })
    }
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::PathMissing { path } => {
                write!(f, "{} does not exist or is not a directory", path.display())
            }
            GitError::Timeout { command, path } => {
                write!(f, "`{command}` timed out in {}", path.display())
            }
            GitError::Spawn { command, source } => {
                write!(f, "failed to run `{command}`: {source}")
            }
            GitError::Exit {
                command,
                code,
                stderr,
            } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    write!(f, "`{command}` exited with {code}")
                } else {
                    write!(f, "`{command}` exited with {code}: {stderr}")
                }
            }
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
