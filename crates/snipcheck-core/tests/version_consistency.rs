//! Workspace manifests agree on one version.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .unwrap()
        .to_path_buf()
}

fn manifest(path: &Path) -> toml::Value {
    let text = std::fs::read_to_string(path.join("Cargo.toml")).unwrap();
    text.parse().unwrap()
}

#[test]
fn members_inherit_workspace_version() {
    let root = workspace_root();
    let doc = manifest(&root);
    let members = doc["workspace"]["members"].as_array().unwrap();
    assert!(!members.is_empty());

    for member in members {
        let member = member.as_str().unwrap();
        let krate = manifest(&root.join(member));
        let inherited = krate["package"]["version"]
            .get("workspace")
            .and_then(|v| v.as_bool());
        assert_eq!(
            inherited,
            Some(true),
            "{member} should use version.workspace = true"
        );
    }
}

#[test]
fn internal_dependency_pins_workspace_version() {
    let doc = manifest(&workspace_root());
    let version = doc["workspace"]["package"]["version"].as_str().unwrap();
    let pinned = doc["workspace"]["dependencies"]["snipcheck-core"]["version"]
        .as_str()
        .unwrap();
    assert_eq!(pinned, version);
    assert_eq!(snipcheck_core::VERSION, version);
}
