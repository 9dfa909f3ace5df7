//! The process-execution seam.
//!
//! Everything above this module asks git questions through [`GitRunner`], so
//! tests can substitute a scripted runner for the real executable.

use std::path::Path;
use std::time::Duration;

use super::GitError;
use crate::shell_exec::Cmd;

/// Runs a git command with `dir` as working directory.
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` in `dir` and return stdout.
    ///
    /// A non-zero exit is reported as [`GitError::Exit`].
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError>;
}

/// Runs the real git executable with a per-call timeout.
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: String,
    timeout: Duration,
}

impl SystemGit {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git", Duration::from_secs(10))
    }
}

impl GitRunner for SystemGit {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        if !dir.is_dir() {
            return Err(GitError::PathMissing {
                path: dir.to_path_buf(),
            });
        }

        let cmd = Cmd::new(&self.program)
            .args(args.iter().copied())
            .current_dir(dir)
            .context(dir.display().to_string())
            .timeout(self.timeout)
            // Read-only: keep `git status` from refreshing the index behind our back
            .env("GIT_OPTIONAL_LOCKS", "0");
        let command = cmd.display_string();

        let output = cmd.run().map_err(|source| {
            if source.kind() == std::io::ErrorKind::TimedOut {
                GitError::Timeout {
                    command: command.clone(),
                    path: dir.to_path_buf(),
                }
            } else {
                GitError::Spawn {
                    command: command.clone(),
                    source,
                }
            }
        })?;

        if !output.status.success() {
            return Err(GitError::Exit {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
