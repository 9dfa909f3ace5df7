use treewatch::RootStore;
use treewatch::config::EngineConfig;
use treewatch::status::TrackedRoot;

use crate::common::{Sandbox, aggregator};

#[test]
fn test_root_store_drives_refresh() {
    let sandbox = Sandbox::new();
    let app = sandbox.repo("app");
    let lib = sandbox.repo("lib");
    let store = RootStore::load(sandbox.join("config/roots.toml")).unwrap();
    assert!(store.add(TrackedRoot::from_path(&lib)));
    assert!(store.add(TrackedRoot::from_path(&app)));
    store.save().unwrap();

    let reloaded = RootStore::load(store.path()).unwrap();
    let nodes = aggregator(2).refresh(&reloaded).unwrap();
    let names: Vec<_> = nodes.repositories().map(|r| r.root.name.as_str()).collect();
    assert_eq!(names, ["lib", "app"]);
}

#[test]
fn test_roots_file_format() {
    let sandbox = Sandbox::new();
    let path = sandbox.join("roots.toml");
    let store = RootStore::load(&path).unwrap();
    store.add(TrackedRoot::new("proj", "/repos/proj"));
    store.save().unwrap();

    insta::assert_snapshot!(std::fs::read_to_string(&path).unwrap(), @r#"
    [[roots]]
    name = "proj"
    path = "/repos/proj"
    auto-discover = false
    "#);
}

#[test]
fn test_config_file_points_at_roots() {
    let sandbox = Sandbox::new();
    let config_path = sandbox.join("config.toml");
    let roots_path = sandbox.join("elsewhere/roots.toml");
    std::fs::write(
        &config_path,
        format!(
            "max-concurrent = 3\nroots-file = \"{}\"\n",
            roots_path.display()
        ),
    )
    .unwrap();

    let config = EngineConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.max_concurrent, 3);
    assert_eq!(config.roots_file_path(), Some(roots_path));
}
