use std::path::Path;

use treewatch::git::RepoKind;
use treewatch::status::TrackedRoot;
use treewatch::sync::CancelToken;

use crate::common::{Sandbox, aggregator, commit_file, git};

#[test]
fn test_bare_repository_with_worktrees() {
    let sandbox = Sandbox::new();
    let bare = sandbox.bare_repo("proj.git");
    sandbox.worktree(&bare, "proj-main", "main");
    let feature = sandbox.worktree(&bare, "proj-feature", "feature");
    std::fs::write(feature.join("scratch.txt"), "wip\n").unwrap();

    let roots = vec![TrackedRoot::new("proj", &bare)];
    let nodes = aggregator(8).refresh(&roots).unwrap();

    assert_eq!(nodes.len(), 3);
    let repo = nodes.get(0).unwrap().as_repository().unwrap();
    assert_eq!(repo.kind, RepoKind::Bare);
    for wt in nodes.worktrees_of(0) {
        assert_eq!(nodes.parent_of(wt).unwrap().root.path, bare);
    }

    insta::assert_snapshot!(sandbox.redact(&nodes.to_string()), @r"
    .... proj (bare) [TMP]/proj.git
    *?.. ├─ feature [TMP]/proj-feature
    .... └─ main [TMP]/proj-main
    ");
}

#[test]
fn test_mixed_roots_keep_tracked_order() {
    let sandbox = Sandbox::new();
    let dirty = sandbox.repo("dirty");
    std::fs::write(dirty.join("README.md"), "# edited\n").unwrap();

    let origin = sandbox.bare_repo("origin.git");
    let ahead = sandbox.clone_of(&origin, "ahead");
    commit_file(&ahead, "new.rs", "\n");

    let clean = sandbox.repo("clean");
    let plain = sandbox.join("plain");
    std::fs::create_dir(&plain).unwrap();

    let roots = vec![
        TrackedRoot::from_path(&dirty),
        TrackedRoot::from_path(&ahead),
        TrackedRoot::from_path(sandbox.join("missing")),
        TrackedRoot::from_path(&clean),
        TrackedRoot::from_path(&plain),
    ];
    let nodes = aggregator(8).refresh(&roots).unwrap();

    insta::assert_snapshot!(sandbox.redact(&nodes.to_string()), @r"
    *... dirty (regular) [TMP]/dirty
    ..↑. ahead (regular) [TMP]/ahead
    ...! missing (not-a-repository) [TMP]/missing
    .... clean (regular) [TMP]/clean
    .... plain (not-a-repository) [TMP]/plain
    ");
}

#[test]
fn test_concurrency_bound_does_not_change_output() {
    let sandbox = Sandbox::new();
    let mut roots = Vec::new();
    for i in 0..6 {
        let repo = sandbox.repo(&format!("repo-{i}"));
        if i % 2 == 0 {
            std::fs::write(repo.join("untracked.txt"), "x\n").unwrap();
        }
        roots.push(TrackedRoot::from_path(&repo));
    }
    let bare = sandbox.bare_repo("proj.git");
    sandbox.worktree(&bare, "proj-main", "main");
    sandbox.worktree(&bare, "proj-hotfix", "hotfix");
    roots.insert(3, TrackedRoot::new("proj", &bare));

    let sequential = aggregator(1).refresh(&roots).unwrap();
    let parallel = aggregator(8).refresh(&roots).unwrap();
    assert_eq!(sequential.len(), 7 + 2);
    assert_eq!(sequential.to_string(), parallel.to_string());
}

#[test]
fn test_invalidate_picks_up_new_changes() {
    let sandbox = Sandbox::new();
    let repo = sandbox.repo("app");
    let roots = vec![TrackedRoot::from_path(&repo)];
    let aggregator = aggregator(4);

    let before = aggregator.refresh(&roots).unwrap();
    assert!(before.get(0).unwrap().status().is_clean());

    std::fs::write(repo.join("new.txt"), "x\n").unwrap();
    // Still within the freshness window
    let cached = aggregator.refresh(&roots).unwrap();
    assert!(cached.get(0).unwrap().status().is_clean());

    aggregator.invalidate(&repo);
    let after = aggregator.refresh(&roots).unwrap();
    assert!(after.get(0).unwrap().status().has_untracked);
}

#[test]
fn test_removed_worktree_disappears_after_invalidation() {
    let sandbox = Sandbox::new();
    let bare = sandbox.bare_repo("proj.git");
    sandbox.worktree(&bare, "proj-main", "main");
    let feature = sandbox.worktree(&bare, "proj-feature", "feature");
    let roots = vec![TrackedRoot::new("proj", &bare)];
    let aggregator = aggregator(4);

    assert_eq!(aggregator.refresh(&roots).unwrap().len(), 3);

    git(&bare, &["worktree", "remove", feature.to_str().unwrap()]);
    aggregator.invalidate_all();
    let nodes = aggregator.refresh(&roots).unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.get(1).unwrap().as_worktree().unwrap().is_last);
    assert_eq!(nodes.position(Path::new(&feature)), None);
}

#[test]
fn test_cancelled_refresh_keeps_previous_list() {
    let sandbox = Sandbox::new();
    let repo = sandbox.repo("app");
    let roots = vec![TrackedRoot::from_path(&repo)];
    let aggregator = aggregator(4);
    let first = aggregator.refresh(&roots).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(aggregator.refresh_with_cancel(&roots, &cancel).is_err());
    assert_eq!(*aggregator.cached(), *first);
}
