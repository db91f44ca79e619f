//! Common test utilities for ptm integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's data directory, config, or the network: every test seeds the
//! response cache by hand and runs the binary with `--cached`.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use chrono::{Datelike, NaiveDate};
pub use tempfile::TempDir;

/// Join epoch baked into the seeded initialization response.
pub const JOIN_EPOCH: i64 = 1_700_000_000;

/// A test environment with isolated data storage.
///
/// `PTM_DATA_DIR` points the binary at a per-test temp directory and
/// `PTM_CONFIG` at a nonexistent file inside it, so the user's real
/// config never leaks in. Tests are parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create an environment with both endpoint responses seeded.
    pub fn seeded(items: &[String]) -> Self {
        let env = Self::new();
        env.seed_initialization();
        env.seed_tree(items);
        env
    }

    /// Get a Command for the ptm binary with isolated data and config.
    pub fn ptm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ptm"));
        cmd.env("PTM_DATA_DIR", self.data_dir.path());
        cmd.env("PTM_CONFIG", self.data_dir.path().join("config.toml"));
        cmd.env_remove("PTM_SESSION_COOKIE");
        cmd
    }

    /// Seed the cached initialization response.
    pub fn seed_initialization(&self) {
        write_file(
            &self
                .data_dir
                .path()
                .join("cache")
                .join("initialization_data.json"),
            &format!(
                r#"{{"projectTreeData":{{"mainProjectTreeInfo":{{"dateJoinedTimestampInSeconds":{JOIN_EPOCH}}}}}}}"#
            ),
        );
    }

    /// Seed the cached tree response from raw item objects.
    pub fn seed_tree(&self, items: &[String]) {
        write_file(
            &self.data_dir.path().join("cache").join("tree_data.json"),
            &tree_body(items),
        );
    }

    /// Seed a history snapshot under the given key.
    pub fn seed_snapshot(&self, key: &str, items: &[String]) {
        write_file(
            &self
                .data_dir
                .path()
                .join("history")
                .join("tree_data")
                .join(format!("{key}.json")),
            &tree_body(items),
        );
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn tree_body(items: &[String]) -> String {
    format!(r#"{{"items":[{}]}}"#, items.join(","))
}

/// One raw item object as the tree endpoint would deliver it.
/// `cp` is a completion offset in seconds since the account joined.
pub fn item(id: &str, parent: &str, name: &str, cp: Option<i64>) -> String {
    let name = name.replace('"', "\\\"");
    match cp {
        Some(offset) => {
            format!(r#"{{"id":"{id}","prnt":"{parent}","nm":"{name}","cp":{offset}}}"#)
        }
        None => format!(r#"{{"id":"{id}","prnt":"{parent}","nm":"{name}"}}"#),
    }
}

/// The inline due-date annotation for a calendar date.
pub fn due_marker(date: NaiveDate) -> String {
    format!(
        r#", Due <time startYear="{}" startMonth="{}" startDay="{}">due</time>"#,
        date.year(),
        date.month(),
        date.day()
    )
}

/// Today as the binary will see it.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
