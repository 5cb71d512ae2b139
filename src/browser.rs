/// Host capabilities backed by the WebExtension APIs
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

use crate::config::SyncConfig;
use crate::engine::{SyncEngine, SyncStatus};
use crate::error::{Result, SyncError};
use crate::host::{Clock, Store, TabApi};
use crate::tab_data::{GroupColor, GroupId, LocalGroup, LocalTab, TabId, WindowId};

// Import JS bridge functions
#[wasm_bindgen(module = "/js/host.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryTabGroups(query: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabs(query: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(properties: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTabs(options: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateTabGroup(group_id: i32, properties: JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn currentWindowId() -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(area: &str, key: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(area: &str, key: &str, value: JsValue) -> std::result::Result<(), JsValue>;

    fn startTimer(ms: u32, callback: &JsValue) -> i32;

    fn cancelTimer(handle: i32);

    fn setBadge(text: &str, color: &str);
}

pub type BrowserEngine = SyncEngine<BrowserTabs, BrowserStore, BrowserClock>;

pub fn new_engine(config: SyncConfig) -> BrowserEngine {
    SyncEngine::new(
        BrowserTabs,
        BrowserStore::local(),
        BrowserStore::sync(),
        BrowserClock,
        config,
    )
}

/// Paint the toolbar badge for a status
pub fn show_badge(status: SyncStatus) {
    let badge = status.badge();
    setBadge(badge.text, badge.color.unwrap_or(""));
}

/// Run `callback` once after `ms`; the handle cancels it
pub fn start_timer(ms: u32, callback: impl FnOnce() + 'static) -> i32 {
    startTimer(ms, &Closure::once_into_js(callback))
}

pub fn cancel_timer(handle: i32) {
    cancelTimer(handle);
}

fn host_error(operation: &'static str) -> impl Fn(JsValue) -> SyncError {
    move |e| SyncError::Host(format!("{} failed: {:?}", operation, e))
}

pub fn to_js<V: Serialize + ?Sized>(value: &V) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| SyncError::Serialization(e.to_string()))
}

pub fn from_js<V: DeserializeOwned>(value: JsValue) -> Result<V> {
    serde_wasm_bindgen::from_value(value).map_err(|e| SyncError::Serialization(format!("{:?}", e)))
}

#[derive(Serialize)]
struct GroupQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<GroupId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProperties<'a> {
    url: &'a str,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_id: Option<WindowId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupOptions<'a> {
    tab_ids: &'a [TabId],
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<GroupId>,
}

#[derive(Serialize)]
struct UpdateProperties<'a> {
    title: &'a str,
    color: GroupColor,
}

/// `browser.tabs` and `browser.tabGroups`
pub struct BrowserTabs;

#[async_trait(?Send)]
impl TabApi for BrowserTabs {
    async fn query_groups(&self, title: Option<&str>) -> Result<Vec<LocalGroup>> {
        let groups = queryTabGroups(to_js(&GroupQuery { title })?)
            .await
            .map_err(host_error("tabGroups.query"))?;
        from_js(groups)
    }

    async fn query_tabs(&self, group: Option<GroupId>) -> Result<Vec<LocalTab>> {
        let tabs = queryTabs(to_js(&TabQuery { group_id: group })?)
            .await
            .map_err(host_error("tabs.query"))?;
        from_js(tabs)
    }

    async fn create_tab(&self, url: &str, active: bool, window: Option<WindowId>) -> Result<LocalTab> {
        let properties = CreateProperties {
            url,
            active,
            window_id: window,
        };
        let tab = createTab(to_js(&properties)?)
            .await
            .map_err(host_error("tabs.create"))?;
        from_js(tab)
    }

    async fn group_tabs(&self, tabs: &[TabId], group: Option<GroupId>) -> Result<GroupId> {
        let options = GroupOptions {
            tab_ids: tabs,
            group_id: group,
        };
        let group = groupTabs(to_js(&options)?)
            .await
            .map_err(host_error("tabs.group"))?;
        from_js(group)
    }

    async fn update_group(&self, group: GroupId, title: &str, color: GroupColor) -> Result<()> {
        updateTabGroup(group, to_js(&UpdateProperties { title, color })?)
            .await
            .map_err(host_error("tabGroups.update"))
    }

    async fn remove_tabs(&self, tabs: &[TabId]) -> Result<()> {
        removeTabs(to_js(tabs)?)
            .await
            .map_err(host_error("tabs.remove"))
    }

    async fn current_window(&self) -> Result<WindowId> {
        let window = currentWindowId().await.map_err(host_error("windows.getCurrent"))?;
        from_js(window)
    }
}

/// One `browser.storage` area
pub struct BrowserStore {
    area: &'static str,
}

impl BrowserStore {
    pub fn local() -> Self {
        BrowserStore { area: "local" }
    }

    pub fn sync() -> Self {
        BrowserStore { area: "sync" }
    }

    async fn fetch(&self, key: JsValue) -> Result<Map<String, Value>> {
        let items = getStorage(self.area, key)
            .await
            .map_err(host_error("storage.get"))?;
        if items.is_undefined() || items.is_null() {
            return Ok(Map::new());
        }
        from_js(items)
    }
}

#[async_trait(?Send)]
impl Store for BrowserStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut items = self.fetch(JsValue::from_str(key)).await?;
        Ok(items.remove(key))
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        self.fetch(JsValue::NULL).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        setStorage(self.area, key, to_js(&value)?)
            .await
            .map_err(host_error("storage.set"))
    }
}

pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}
