use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use treewatch::git::SystemGit;
use treewatch::status::{Aggregator, RefreshPolicy, StatusCache};

/// Run git in `dir` with an isolated environment, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_SYSTEM", "/dev/null")
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z")
        .env("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z")
        .env("LC_ALL", "C")
        .output()
        .expect("Failed to run git");

    if !output.status.success() {
        panic!(
            "git {} failed in {}:\nstdout: {}\nstderr: {}",
            args.join(" "),
            dir.display(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A scratch directory for building repository layouts.
pub struct Sandbox {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // Canonicalize so paths compare equal to what git prints (macOS /var -> /private/var)
        let root = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp path");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Replace the sandbox path with `[TMP]` for snapshots.
    pub fn redact(&self, text: &str) -> String {
        text.replace(&self.root.display().to_string(), "[TMP]")
    }

    /// Regular repository on `main` with one commit.
    pub fn repo(&self, name: &str) -> PathBuf {
        let path = self.join(name);
        std::fs::create_dir_all(&path).expect("Failed to create repo directory");
        git(&path, &["init", "-q", "-b", "main"]);
        std::fs::write(path.join("README.md"), "# test\n").expect("Failed to write file");
        git(&path, &["add", "README.md"]);
        git(&path, &["commit", "-q", "-m", "Initial commit"]);
        path
    }

    /// Bare clone of a fresh repository named `name`.
    pub fn bare_repo(&self, name: &str) -> PathBuf {
        let seed = self.repo(&format!("{name}-seed"));
        let path = self.join(name);
        git(
            self.path(),
            &["clone", "-q", "--bare", seed.to_str().unwrap(), path.to_str().unwrap()],
        );
        path
    }

    /// `git worktree add` from `bare`; creates `branch` unless it is `main`.
    pub fn worktree(&self, bare: &Path, name: &str, branch: &str) -> PathBuf {
        let path = self.join(name);
        let path_str = path.to_str().unwrap();
        if branch == "main" {
            git(bare, &["worktree", "add", "-q", path_str, "main"]);
        } else {
            git(bare, &["worktree", "add", "-q", "-b", branch, path_str]);
        }
        path
    }

    /// Non-bare clone of `origin`, tracking its `main`.
    pub fn clone_of(&self, origin: &Path, name: &str) -> PathBuf {
        let path = self.join(name);
        git(
            self.path(),
            &["clone", "-q", origin.to_str().unwrap(), path.to_str().unwrap()],
        );
        path
    }
}

pub fn commit_file(repo: &Path, file: &str, content: &str) {
    std::fs::write(repo.join(file), content).expect("Failed to write file");
    git(repo, &["add", file]);
    git(repo, &["commit", "-q", "-m", &format!("Add {file}")]);
}

pub fn system_git() -> Arc<SystemGit> {
    Arc::new(SystemGit::new("git", Duration::from_secs(30)))
}

pub fn aggregator(max_concurrent: usize) -> Aggregator {
    let cache = StatusCache::new(
        system_git(),
        Duration::from_secs(60),
        RefreshPolicy::Blocking,
    );
    Aggregator::new(cache, max_concurrent)
}
