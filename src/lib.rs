//! ptm - personal task metrics from a Workflowy outline.
//!
//! This library provides the core functionality for the `ptm` CLI tool:
//! parsing raw outline nodes into tasks, resolving the task hierarchy,
//! and bucketing tasks into daily/weekly/monthly windows for reporting.

pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod storage;
pub mod store;
pub mod workflowy;

/// Library-level error type for ptm operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Malformed tree node: {0}")]
    MalformedNode(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("No cached response for {0}: run `ptm fetch` first")]
    NoCache(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for ptm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fixture builders shared by the unit tests.
#[cfg(test)]
pub(crate) mod test_utils {
    use chrono::{DateTime, NaiveDate, Utc};

    use crate::models::Task;
    use crate::workflowy::RawNode;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn instant(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    /// A raw node as the tree endpoint would deliver it.
    pub fn node(id: &str, parent: &str, name: &str, completed_offset: Option<i64>) -> RawNode {
        RawNode {
            id: id.to_string(),
            parent: parent.to_string(),
            name: Some(name.to_string()),
            completed_offset,
        }
    }

    /// A normalized task. Due date, tags, and flags are all encoded in the
    /// raw markup name; completion comes from the offset (join epoch
    /// 1_700_000_000).
    pub fn task(
        id: &str,
        parent: Option<&str>,
        raw_name: &str,
        completed_offset: Option<i64>,
    ) -> Task {
        let raw = RawNode {
            id: id.to_string(),
            parent: parent.unwrap_or("None").to_string(),
            name: Some(raw_name.to_string()),
            completed_offset,
        };
        Task::from_raw(&raw, 1_700_000_000).unwrap()
    }
}
