/// Data structures for tab-group sync
use serde::{Deserialize, Deserializer, Serialize};

pub type TabId = i32;
pub type GroupId = i32;
pub type WindowId = i32;

/// Sentinel the host uses for "not in any group"
const TAB_GROUP_ID_NONE: i32 = -1;

pub const UNTITLED_GROUP: &str = "Untitled Group";

/// Information about a browser tab as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTab {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "optional_group_id")]
    pub group_id: Option<GroupId>,
    pub window_id: WindowId,
}

/// A tab group as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalGroup {
    pub id: GroupId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub window_id: WindowId,
}

/// The nine colors the host accepts for a tab group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Blue,
    Red,
    Green,
    Orange,
    Yellow,
    Purple,
    Pink,
    Cyan,
    #[default]
    Grey,
}

impl GroupColor {
    pub const ALL: [GroupColor; 9] = [
        GroupColor::Blue,
        GroupColor::Red,
        GroupColor::Green,
        GroupColor::Orange,
        GroupColor::Yellow,
        GroupColor::Purple,
        GroupColor::Pink,
        GroupColor::Cyan,
        GroupColor::Grey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Green => "green",
            GroupColor::Orange => "orange",
            GroupColor::Yellow => "yellow",
            GroupColor::Purple => "purple",
            GroupColor::Pink => "pink",
            GroupColor::Cyan => "cyan",
            GroupColor::Grey => "grey",
        }
    }

    /// Exact wire name lookup; anything else (including "gray") is `None`
    pub fn from_name(name: &str) -> Option<GroupColor> {
        GroupColor::ALL.into_iter().find(|color| color.as_str() == name)
    }

    /// Lookup that falls back to grey, since the host rejects unknown colors
    pub fn from_name_or_grey(name: Option<&str>) -> GroupColor {
        name.and_then(GroupColor::from_name).unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for GroupColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(GroupColor::from_name_or_grey(name.as_deref()))
    }
}

/// One group inside a remote snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    #[serde(default = "untitled", deserialize_with = "group_title")]
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    #[serde(default, deserialize_with = "tab_urls")]
    pub tabs: Vec<String>,
}

/// One device's full layout, stored under `state_<device id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStateRecord {
    #[serde(deserialize_with = "epoch_millis")]
    pub timestamp: u64,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
}

/// Stable per-install identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: Option<String>,
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

fn untitled() -> String {
    UNTITLED_GROUP.to_string()
}

/// Null and empty titles read as the placeholder a publisher would have used
fn group_title<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let title = Option::<String>::deserialize(deserializer)?;
    Ok(title.filter(|t| !t.is_empty()).unwrap_or_else(untitled))
}

/// Older writers stored `Date.now()` as a float
fn epoch_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Ok(raw.max(0.0) as u64)
}

fn optional_group_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<GroupId>, D::Error> {
    let raw = Option::<i32>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != TAB_GROUP_ID_NONE))
}

/// Older snapshots stored tabs as `{url}` objects rather than bare strings
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTab {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

fn tab_urls<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let stored = Option::<Vec<StoredTab>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(stored
        .into_iter()
        .filter_map(|tab| match tab {
            StoredTab::Url(url) => Some(url),
            StoredTab::Object { url } => url,
        })
        .collect())
}
