/// Capabilities the sync core consumes from the host browser
///
/// The browser build implements these over the extension APIs; tests
/// implement them in memory. All futures are `?Send` because the host runs
/// everything on one event loop.
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::tab_data::{GroupColor, GroupId, LocalGroup, LocalTab, TabId, WindowId};

#[async_trait(?Send)]
pub trait TabApi {
    /// All tab groups, optionally only those with an exact title
    async fn query_groups(&self, title: Option<&str>) -> Result<Vec<LocalGroup>>;

    /// All tabs, optionally only those in one group
    async fn query_tabs(&self, group: Option<GroupId>) -> Result<Vec<LocalTab>>;

    /// Open a tab. `window: None` lets the host pick the current window.
    async fn create_tab(&self, url: &str, active: bool, window: Option<WindowId>) -> Result<LocalTab>;

    /// Move tabs into `group`, or into a fresh group when `group` is `None`.
    /// Returns the group they ended up in.
    async fn group_tabs(&self, tabs: &[TabId], group: Option<GroupId>) -> Result<GroupId>;

    async fn update_group(&self, group: GroupId, title: &str, color: GroupColor) -> Result<()>;

    async fn remove_tabs(&self, tabs: &[TabId]) -> Result<()>;

    /// The window new groups are anchored in
    async fn current_window(&self) -> Result<WindowId>;
}

/// A JSON key-value storage area
#[async_trait(?Send)]
pub trait Store {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn get_all(&self) -> Result<Map<String, Value>>;

    /// Replace the value under `key` in a single write
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Wall clock in epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> u64;
}
