//! Directory indexing against a real file tree.

use std::fs;
use std::path::Path;

use omnils::config::OmniConfig;
use omnils::index::WorkspaceIndex;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "main.omni", "def main():\n    run()\n");
    write(root, "lib/shapes.omni", "class Shape:\n    def area(self):\n        return 0\n");
    write(root, "lib/util.omni", "def run():\n    pass\ndef helper(x):\n    return x\n");
    write(root, "node_modules/pkg/vendored.omni", "def vendored():\n    pass\n");
    write(root, ".git/hooks/hook.omni", "def hook():\n    pass\n");
    write(root, "notes.txt", "def not_omni():\n");
    dir
}

#[test]
fn indexes_matching_files_only() {
    let dir = workspace();
    let mut index = WorkspaceIndex::new();
    let stats = index.index_directory(dir.path(), &OmniConfig::default()).unwrap();

    assert_eq!(stats.files_indexed, 3);
    assert_eq!(stats.files_skipped, 0);
    assert_eq!(stats.total_symbols, 5);
    assert_eq!(index.file_count(), 3);

    assert_eq!(index.lookup("helper").len(), 1);
    assert!(index.lookup("vendored").is_empty());
    assert!(index.lookup("hook").is_empty());
    assert!(index.lookup("not_omni").is_empty());

    let area = index.lookup("area");
    assert!(area[0].path.ends_with("lib/shapes.omni"));
}

#[test]
fn oversized_files_are_skipped() {
    let dir = workspace();
    write(dir.path(), "big.omni", &"def filler():\n    pass\n".repeat(10));
    let config = OmniConfig {
        max_file_bytes: 64,
        ..OmniConfig::default()
    };
    let mut index = WorkspaceIndex::new();
    let stats = index.index_directory(dir.path(), &config).unwrap();
    assert_eq!(stats.files_skipped, 1);
    assert!(index.lookup("filler").is_empty());
}

#[test]
fn file_limit_stops_indexing() {
    let dir = workspace();
    let config = OmniConfig {
        max_files: 2,
        ..OmniConfig::default()
    };
    let mut index = WorkspaceIndex::new();
    let stats = index.index_directory(dir.path(), &config).unwrap();
    assert_eq!(stats.files_indexed, 2);
    assert_eq!(stats.files_skipped, 1);
}

#[test]
fn custom_include_and_exclude() {
    let dir = workspace();
    let config = OmniConfig {
        include: vec!["lib/**/*.omni".into()],
        exclude: vec!["**/util.omni".into()],
        ..OmniConfig::default()
    };
    let mut index = WorkspaceIndex::new();
    let stats = index.index_directory(dir.path(), &config).unwrap();
    assert_eq!(stats.files_indexed, 1);
    assert_eq!(index.lookup("Shape").len(), 1);
    assert!(index.lookup("main").is_empty());
}

#[test]
fn disk_changes_are_picked_up_per_file() {
    let dir = workspace();
    let config = OmniConfig::default();
    let mut index = WorkspaceIndex::new();
    index.index_directory(dir.path(), &config).unwrap();

    let util = dir.path().join("lib/util.omni");
    fs::write(&util, "def renamed():\n    pass\n").unwrap();
    assert_eq!(index.index_file(&util, &config).unwrap(), 1);
    assert!(index.lookup("helper").is_empty());
    assert_eq!(index.lookup("renamed").len(), 1);

    fs::remove_file(&util).unwrap();
    assert!(index.index_file(&util, &config).is_err());
    assert!(index.remove_file(&util));
    assert!(index.lookup("renamed").is_empty());
}

#[test]
fn bad_exclude_pattern_is_an_error() {
    let dir = workspace();
    let config = OmniConfig {
        exclude: vec!["[".into()],
        ..OmniConfig::default()
    };
    let mut index = WorkspaceIndex::new();
    assert!(index.index_directory(dir.path(), &config).is_err());
}

#[test]
fn glob_characters_in_root_are_literal() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("ws[1]");
    write(&root, "main.omni", "def main():\n    pass\n");
    write(&root, "lib/util.omni", "def helper():\n    pass\n");
    // Would match `ws[1]` read as a character class.
    write(&dir.path().join("ws1"), "stray.omni", "def stray():\n    pass\n");

    let mut index = WorkspaceIndex::new();
    let stats = index.index_directory(&root, &OmniConfig::default()).unwrap();
    assert_eq!(stats.files_indexed, 2);
    assert_eq!(index.lookup("helper").len(), 1);
    assert!(index.lookup("stray").is_empty());
}
