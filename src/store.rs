//! Task store: ties the upstream client and the storage port together.
//!
//! One `TaskStore` serves one CLI invocation. In the normal mode every
//! endpoint body is fetched and written through to the response cache; in
//! cached mode (`--cached`) the cache is the only source and an empty
//! cache is an error rather than a silent network call.

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::models::TaskList;
use crate::storage::{snapshot_key_now, Store};
use crate::workflowy::{Client, InitializationData, TreeData};
use crate::{Error, Result};

/// Response cache key for the tree endpoint.
pub const TREE_RESPONSE: &str = "tree_data";
/// Response cache key for the initialization endpoint.
pub const INITIALIZATION_RESPONSE: &str = "initialization_data";

pub struct TaskStore<'a> {
    config: &'a Config,
    store: &'a dyn Store,
    read_cache: bool,
}

impl<'a> TaskStore<'a> {
    pub fn new(config: &'a Config, store: &'a dyn Store, read_cache: bool) -> Self {
        Self {
            config,
            store,
            read_cache,
        }
    }

    /// Fetch and normalize the current task collection.
    pub fn fetch_tasks(&self) -> Result<TaskList> {
        let init = self.initialization_data()?;
        let tree = self.tree_data()?;
        let tasks = parse_tasks(&init, &tree)?;
        info!(count = tasks.len(), "parsed task collection");
        Ok(tasks)
    }

    /// The task collection as of the most recent snapshot, with the
    /// snapshot key. `Ok(None)` when no snapshot has ever been saved.
    pub fn historical_tasks(&self) -> Result<Option<(String, TaskList)>> {
        let Some((key, tree)) = self.store.latest_snapshot()? else {
            return Ok(None);
        };
        let init = self.initialization_data()?;
        let tasks = parse_tasks(&init, &tree)?;
        Ok(Some((key, tasks)))
    }

    /// Persist the current tree response as a new snapshot; returns its key.
    pub fn save_snapshot(&self) -> Result<String> {
        let tree = self.tree_data()?;
        let key = snapshot_key_now();
        self.store.save_snapshot(&key, &tree)?;
        info!(%key, "saved tree snapshot");
        Ok(key)
    }

    fn initialization_data(&self) -> Result<Value> {
        self.response(INITIALIZATION_RESPONSE, Client::fetch_initialization_data)
    }

    fn tree_data(&self) -> Result<Value> {
        self.response(TREE_RESPONSE, Client::fetch_tree_data)
    }

    fn response(&self, name: &str, fetch: fn(&Client) -> Result<Value>) -> Result<Value> {
        if self.read_cache {
            return self
                .store
                .load_response(name)?
                .ok_or_else(|| Error::NoCache(name.to_string()));
        }

        let client = self.client()?;
        let data = fetch(&client)?;
        self.store.save_response(name, &data)?;
        Ok(data)
    }

    fn client(&self) -> Result<Client> {
        let cookie = self.config.session_cookie().ok_or_else(|| {
            Error::Config(
                "no session cookie configured; set api.session_cookie or PTM_SESSION_COOKIE"
                    .to_string(),
            )
        })?;
        Ok(Client::new(self.config.api.base_url.clone(), cookie))
    }
}

/// Normalize a pair of raw endpoint bodies into a task collection.
pub fn parse_tasks(init: &Value, tree: &Value) -> Result<TaskList> {
    let init = InitializationData::from_value(init)?;
    let tree = TreeData::from_value(tree)?;
    TaskList::from_tree(&tree, init.date_joined_epoch())
}
