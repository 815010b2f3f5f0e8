#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use sombra_btree_leaf::primitives::pager::FilePageStore;
use sombra_btree_leaf::storage::btree::{
    BTreeIndex, IndexOptions, IndexRow, InsertOutcome, KeyPosCodec, MemRowTable,
};
use sombra_btree_leaf::types::{Result, TableId};
use tempfile::TempDir;

fn setup_file(name: &str, page_size: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.idx"));
    seed_leaf(&path, page_size).expect("seed leaf page");
    (dir, path)
}

fn seed_leaf(path: &Path, page_size: usize) -> Result<()> {
    let store = Arc::new(FilePageStore::open(path, page_size)?);
    let codec = KeyPosCodec::new(TableId(42), Arc::new(MemRowTable::new()));
    let index = BTreeIndex::new(codec, store.clone(), IndexOptions::default())?;
    let mut leaf = index.create_root_leaf()?;
    for row in [IndexRow::new("b", 2), IndexRow::new("a", 1)] {
        assert_eq!(leaf.add_row_try(row)?, InsertOutcome::Inserted);
    }
    leaf.write()?;
    store.sync()
}

#[test]
fn inspect_emits_json() {
    let (_dir, path) = setup_file("json", 256);
    let output = cargo_bin_cmd!("sombra-leaf")
        .arg("inspect")
        .arg(&path)
        .args(["--page", "1", "--page-size", "256", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["table"], 42);
    assert_eq!(json["entry_count"], 2);
    assert_eq!(json["position_only"], false);
    assert!(json["parent"].is_null());
    assert_eq!(json["free_space"], 256 - 15 - 20);
    let slots = json["slots"].as_array().expect("slots array");
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["offset"], 246);
    assert_eq!(slots[0]["bytes"], "00000000000000010261");
    assert_eq!(slots[1]["bytes"], "00000000000000020262");
}

#[test]
fn inspect_text_uses_config_page_size() {
    let (dir, path) = setup_file("text", 512);
    let config = dir.path().join("leaf.toml");
    fs::write(&config, "[store]\npage_size = 512\n").expect("write config");
    let output = cargo_bin_cmd!("sombra-leaf")
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg(&path)
        .args(["--page", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8 output");
    assert!(text.contains("page 1 (page size 512)"), "{text}");
    assert!(text.contains("parent:     root"), "{text}");
    assert!(text.contains("table:      42"), "{text}");
    assert!(text.contains("rows:       full"), "{text}");
    assert!(text.contains("entries:    2"), "{text}");
}

#[test]
fn inspect_fails_on_missing_file() {
    let dir = TempDir::new().expect("tempdir");
    cargo_bin_cmd!("sombra-leaf")
        .arg("inspect")
        .arg(dir.path().join("absent.idx"))
        .args(["--page", "1"])
        .assert()
        .failure();
    assert!(!dir.path().join("absent.idx").exists());
}

#[test]
fn inspect_fails_on_non_leaf_page() {
    let (_dir, path) = setup_file("blank", 128);
    // page 0 is reserved and never holds a leaf
    cargo_bin_cmd!("sombra-leaf")
        .arg("inspect")
        .arg(&path)
        .args(["--page", "0", "--page-size", "128"])
        .assert()
        .failure();
}
