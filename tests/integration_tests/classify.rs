use std::path::Path;

use rstest::rstest;
use treewatch::git::{GitError, GitRunner, PathClassifier, RepoKind, StatusProbe, SystemGit};

use crate::common::{Sandbox, commit_file, git, system_git};

#[derive(Debug, Clone, Copy)]
enum Layout {
    Regular,
    Bare,
    LinkedWorktree,
    Plain,
}

fn build(sandbox: &Sandbox, layout: Layout) -> std::path::PathBuf {
    match layout {
        Layout::Regular => sandbox.repo("app"),
        Layout::Bare => sandbox.bare_repo("proj.git"),
        Layout::LinkedWorktree => {
            let bare = sandbox.bare_repo("proj.git");
            sandbox.worktree(&bare, "proj-feature", "feature")
        }
        Layout::Plain => {
            let path = sandbox.join("plain");
            std::fs::create_dir(&path).unwrap();
            path
        }
    }
}

#[rstest]
#[case::regular(Layout::Regular, RepoKind::Regular)]
#[case::bare(Layout::Bare, RepoKind::Bare)]
#[case::linked_worktree(Layout::LinkedWorktree, RepoKind::Worktree)]
#[case::plain_directory(Layout::Plain, RepoKind::NotARepository)]
fn test_classify_real_layouts(#[case] layout: Layout, #[case] expected: RepoKind) {
    let sandbox = Sandbox::new();
    let path = build(&sandbox, layout);
    let kind = PathClassifier::new(system_git()).classify(&path).unwrap();
    assert_eq!(kind, expected);
}

#[test]
fn test_classify_subdirectory_of_checkout_is_regular() {
    let sandbox = Sandbox::new();
    let repo = sandbox.repo("app");
    let nested = repo.join("src");
    std::fs::create_dir(&nested).unwrap();
    let kind = PathClassifier::new(system_git()).classify(&nested).unwrap();
    assert_eq!(kind, RepoKind::Regular);
}

#[test]
fn test_classify_missing_path_is_an_error() {
    let sandbox = Sandbox::new();
    let err = PathClassifier::new(system_git())
        .classify(&sandbox.join("gone"))
        .unwrap_err();
    assert!(matches!(err, GitError::PathMissing { .. }), "got {err:?}");
}

#[test]
fn test_linked_worktree_detection() {
    let sandbox = Sandbox::new();
    let bare = sandbox.bare_repo("proj.git");
    let linked = sandbox.worktree(&bare, "proj-main", "main");
    let regular = sandbox.repo("app");

    let classifier = PathClassifier::new(system_git());
    assert!(classifier.is_linked_worktree(&linked).unwrap());
    assert!(!classifier.is_linked_worktree(&regular).unwrap());
    assert!(!classifier.is_linked_worktree(&bare).unwrap());
}

#[test]
fn test_probe_against_real_repositories() {
    let sandbox = Sandbox::new();
    let repo = sandbox.repo("app");
    let probe = StatusProbe::new(system_git());

    assert!(!probe.has_uncommitted_changes(&repo));
    assert!(!probe.has_untracked_files(&repo));
    // No upstream configured
    assert!(!probe.has_unpushed_commits(&repo));
    assert_eq!(probe.current_branch(&repo), "main");

    std::fs::write(repo.join("README.md"), "# changed\n").unwrap();
    assert!(probe.has_uncommitted_changes(&repo));
    assert!(!probe.has_untracked_files(&repo));

    std::fs::write(repo.join("notes.txt"), "scratch\n").unwrap();
    assert!(probe.has_untracked_files(&repo));
}

#[test]
fn test_probe_unpushed_in_clone() {
    let sandbox = Sandbox::new();
    let origin = sandbox.bare_repo("origin.git");
    let clone = sandbox.clone_of(&origin, "work");
    let probe = StatusProbe::new(system_git());

    assert!(!probe.has_unpushed_commits(&clone));
    commit_file(&clone, "feature.rs", "fn main() {}\n");
    assert!(probe.has_unpushed_commits(&clone));
    assert!(!probe.has_uncommitted_changes(&clone));

    let status = probe.status(&clone).unwrap();
    assert!(status.ahead);
    assert_eq!(status.branch.as_deref(), Some("main"));
    assert_eq!(status.upstream.as_deref(), Some("origin/main"));
}

#[test]
fn test_detached_head_reports_unknown_branch() {
    let sandbox = Sandbox::new();
    let repo = sandbox.repo("app");
    git(&repo, &["checkout", "-q", "--detach"]);
    let probe = StatusProbe::new(system_git());
    assert_eq!(probe.current_branch(&repo), treewatch::git::UNKNOWN_BRANCH);
    assert_eq!(probe.status(&repo).unwrap().branch, None);
}

#[test]
fn test_list_worktrees_of_bare_repository() {
    let sandbox = Sandbox::new();
    let bare = sandbox.bare_repo("proj.git");
    let main = sandbox.worktree(&bare, "proj-main", "main");
    let feature = sandbox.worktree(&bare, "proj-feature", "feature");

    // git lists the bare entry first, then linked worktrees sorted by path
    let records = StatusProbe::new(system_git()).list_worktrees(&bare).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records[0].is_bare);
    assert_eq!(records[0].path, bare);
    assert_eq!(records[1].path, feature);
    assert_eq!(records[1].branch.as_deref(), Some("feature"));
    assert_eq!(records[2].path, main);
    assert_eq!(records[2].branch.as_deref(), Some("main"));
}

#[test]
fn test_system_git_timeout() {
    let sandbox = Sandbox::new();
    // `sh -c` stands in for a hung git; the runner only cares about the program
    let slow = SystemGit::new("sh", std::time::Duration::from_millis(200));
    let err = slow
        .run(sandbox.path(), &["-c", "exec sleep 5"])
        .unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
    assert!(err.to_string().contains("timed out"));
}

#[test]
fn test_system_git_reports_exit_status() {
    let err = SystemGit::default()
        .run(Path::new("/"), &["rev-parse", "--verify", "no-such-ref-anywhere"])
        .unwrap_err();
    assert!(err.is_exit(), "got {err:?}");
}
