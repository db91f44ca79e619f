//! Workflowy API client and wire types.
//!
//! Two JSON endpoints back the whole pipeline: `get_tree_data` (the flat
//! list of outline items) and `get_initialization_data` (account metadata,
//! of which only the join timestamp matters here). Authentication is a
//! session cookie supplied by configuration; obtaining the cookie is the
//! user's problem, not this module's.
//!
//! Responses are returned as raw [`serde_json::Value`] so the cache and
//! history snapshots can store bodies verbatim; the typed views below are
//! deserialized from the raw value where needed.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// User-Agent header sent with every request
const USER_AGENT: &str = "ptm-cli";

const INITIALIZATION_PATH: &str =
    "/get_initialization_data?client_version=21&client_version_v2=28&no_root_children=1";
const TREE_PATH: &str = "/get_tree_data";

/// One raw outline item as the tree endpoint delivers it (only the fields
/// we care about).
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    /// Stable item id
    pub id: String,

    /// Parent item id, or the literal string "None" for roots
    #[serde(rename = "prnt")]
    pub parent: String,

    /// Markup name; required by contract, but checked during
    /// normalization so the violation is reported per-node
    #[serde(rename = "nm")]
    pub name: Option<String>,

    /// Completion offset in seconds since the account joined; present
    /// only on completed items
    #[serde(rename = "cp")]
    pub completed_offset: Option<i64>,
}

/// The tree endpoint's response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeData {
    pub items: Vec<RawNode>,
}

impl TreeData {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }
}

/// Account initialization data; only the join timestamp is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationData {
    project_tree_data: ProjectTreeData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectTreeData {
    main_project_tree_info: MainProjectTreeInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MainProjectTreeInfo {
    date_joined_timestamp_in_seconds: i64,
}

impl InitializationData {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Seconds-since-epoch when the account joined; completion offsets
    /// are relative to this.
    pub fn date_joined_epoch(&self) -> i64 {
        self.project_tree_data
            .main_project_tree_info
            .date_joined_timestamp_in_seconds
    }
}

/// Blocking client for the outline service.
pub struct Client {
    base_url: String,
    session_cookie: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>, session_cookie: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_cookie: session_cookie.into(),
        }
    }

    /// Fetch account initialization data.
    pub fn fetch_initialization_data(&self) -> Result<Value> {
        self.get_json(INITIALIZATION_PATH)
    }

    /// Fetch the full outline tree.
    pub fn fetch_tree_data(&self) -> Result<Value> {
        self.get_json(TREE_PATH)
    }

    fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "fetching");

        let response = ureq::get(&url)
            .set("Cookie", &self.session_cookie)
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT)
            .call();

        match response {
            Ok(resp) => resp
                .into_json()
                .map_err(|e| Error::Http(format!("invalid JSON body from {}: {}", path, e))),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(Error::Http(format!("HTTP {} from {}: {}", code, path, body)))
            }
            Err(e) => Err(Error::Http(e.to_string())),
        }
    }
}
