/// In-memory host doubles for unit tests
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::host::{Clock, Store, TabApi};
use crate::tab_data::{GroupColor, GroupId, LocalGroup, LocalTab, TabId, WindowId};

/// A recorded call against the fake tab API
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    QueryGroups(Option<String>),
    QueryTabs(Option<GroupId>),
    CreateTab { url: String, window: Option<WindowId> },
    GroupTabs { tabs: Vec<TabId>, group: Option<GroupId> },
    UpdateGroup { group: GroupId, title: String, color: GroupColor },
    RemoveTabs(Vec<TabId>),
    CurrentWindow,
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateTab { .. } | Call::GroupTabs { .. } | Call::UpdateGroup { .. } | Call::RemoveTabs(_)
        )
    }
}

#[derive(Default)]
struct BrowserState {
    groups: Vec<LocalGroup>,
    tabs: Vec<LocalTab>,
    next_tab_id: TabId,
    next_group_id: GroupId,
}

/// Fake browser holding tabs and groups in memory
pub struct FakeBrowser {
    state: RefCell<BrowserState>,
    calls: RefCell<Vec<Call>>,
    fail_queries: Cell<bool>,
    fail_group_calls: Cell<bool>,
    window: WindowId,
}

impl FakeBrowser {
    pub fn new() -> Self {
        FakeBrowser {
            state: RefCell::new(BrowserState {
                next_tab_id: 100,
                next_group_id: 10,
                ..BrowserState::default()
            }),
            calls: RefCell::new(Vec::new()),
            fail_queries: Cell::new(false),
            fail_group_calls: Cell::new(false),
            window: 1,
        }
    }

    /// Add a group with the given tabs, returning its id
    pub fn add_group(&self, title: &str, color: &str, urls: &[&str]) -> GroupId {
        let mut state = self.state.borrow_mut();
        let id = state.next_group_id;
        state.next_group_id += 1;
        state.groups.push(LocalGroup {
            id,
            title: Some(title.to_string()),
            color: Some(color.to_string()),
            window_id: self.window,
        });
        for url in urls {
            let tab_id = state.next_tab_id;
            state.next_tab_id += 1;
            state.tabs.push(LocalTab {
                id: tab_id,
                url: url.to_string(),
                group_id: Some(id),
                window_id: self.window,
            });
        }
        id
    }

    pub fn add_loose_tab(&self, url: &str) -> TabId {
        let mut state = self.state.borrow_mut();
        let id = state.next_tab_id;
        state.next_tab_id += 1;
        state.tabs.push(LocalTab {
            id,
            url: url.to_string(),
            group_id: None,
            window_id: self.window,
        });
        id
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.set(fail);
    }

    pub fn set_fail_group_calls(&self, fail: bool) {
        self.fail_group_calls.set(fail);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn groups(&self) -> Vec<LocalGroup> {
        self.state.borrow().groups.clone()
    }

    pub fn group_urls(&self, group: GroupId) -> Vec<String> {
        self.state
            .borrow()
            .tabs
            .iter()
            .filter(|tab| tab.group_id == Some(group))
            .map(|tab| tab.url.clone())
            .collect()
    }

    pub fn group_by_title(&self, title: &str) -> Option<LocalGroup> {
        self.groups()
            .into_iter()
            .find(|group| group.title.as_deref() == Some(title))
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check_queries(&self) -> Result<()> {
        if self.fail_queries.get() {
            return Err(SyncError::Host("query failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl TabApi for FakeBrowser {
    async fn query_groups(&self, title: Option<&str>) -> Result<Vec<LocalGroup>> {
        self.record(Call::QueryGroups(title.map(str::to_string)));
        self.check_queries()?;
        Ok(self
            .state
            .borrow()
            .groups
            .iter()
            .filter(|group| title.is_none() || group.title.as_deref() == title)
            .cloned()
            .collect())
    }

    async fn query_tabs(&self, group: Option<GroupId>) -> Result<Vec<LocalTab>> {
        self.record(Call::QueryTabs(group));
        self.check_queries()?;
        Ok(self
            .state
            .borrow()
            .tabs
            .iter()
            .filter(|tab| group.is_none() || tab.group_id == group)
            .cloned()
            .collect())
    }

    async fn create_tab(&self, url: &str, _active: bool, window: Option<WindowId>) -> Result<LocalTab> {
        self.record(Call::CreateTab {
            url: url.to_string(),
            window,
        });
        let mut state = self.state.borrow_mut();
        let tab = LocalTab {
            id: state.next_tab_id,
            url: url.to_string(),
            group_id: None,
            window_id: window.unwrap_or(self.window),
        };
        state.next_tab_id += 1;
        state.tabs.push(tab.clone());
        Ok(tab)
    }

    async fn group_tabs(&self, tabs: &[TabId], group: Option<GroupId>) -> Result<GroupId> {
        self.record(Call::GroupTabs {
            tabs: tabs.to_vec(),
            group,
        });
        if self.fail_group_calls.get() {
            return Err(SyncError::Host("group failed".to_string()));
        }
        let mut state = self.state.borrow_mut();
        let target = match group {
            Some(id) => id,
            None => {
                let id = state.next_group_id;
                state.next_group_id += 1;
                state.groups.push(LocalGroup {
                    id,
                    title: None,
                    color: None,
                    window_id: self.window,
                });
                id
            }
        };
        for tab in state.tabs.iter_mut().filter(|tab| tabs.contains(&tab.id)) {
            tab.group_id = Some(target);
        }
        Ok(target)
    }

    async fn update_group(&self, group: GroupId, title: &str, color: GroupColor) -> Result<()> {
        self.record(Call::UpdateGroup {
            group,
            title: title.to_string(),
            color,
        });
        let mut state = self.state.borrow_mut();
        match state.groups.iter_mut().find(|g| g.id == group) {
            Some(found) => {
                found.title = Some(title.to_string());
                found.color = Some(color.as_str().to_string());
                Ok(())
            }
            None => Err(SyncError::Host(format!("no group {}", group))),
        }
    }

    async fn remove_tabs(&self, tabs: &[TabId]) -> Result<()> {
        self.record(Call::RemoveTabs(tabs.to_vec()));
        self.state.borrow_mut().tabs.retain(|tab| !tabs.contains(&tab.id));
        Ok(())
    }

    async fn current_window(&self) -> Result<WindowId> {
        self.record(Call::CurrentWindow);
        Ok(self.window)
    }
}

/// Storage area backed by a map
#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<BTreeMap<String, Value>>,
    writes: Cell<usize>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

#[async_trait(?Send)]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.value(key))
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        Ok(self
            .values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if self.fail_writes.get() {
            return Err(SyncError::Host("quota exceeded".to_string()));
        }
        self.writes.set(self.writes.get() + 1);
        self.insert(key, value);
        Ok(())
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock { now: Cell::new(start) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}
