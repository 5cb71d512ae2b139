/// Collecting the local layout into a publishable snapshot
use std::collections::HashMap;

use log::{debug, info};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::host::{Store, TabApi};
use crate::normalize::normalize_url;
use crate::storage::state_key;
use crate::tab_data::{
    Device, GroupColor, GroupId, GroupSnapshot, LocalGroup, LocalTab, RemoteStateRecord, UNTITLED_GROUP,
    truncate_chars,
};

/// Bucket tabs by group in one pass, keeping only syncable URLs in tab order
pub fn bucket_by_group(tabs: &[LocalTab]) -> HashMap<GroupId, Vec<String>> {
    tabs.iter()
        .filter_map(|tab| Some((tab.group_id?, tab)))
        .fold(HashMap::new(), |mut buckets, (group, tab)| {
            if let Some(url) = normalize_url(&tab.url) {
                buckets.entry(group).or_insert_with(Vec::new).push(url);
            }
            buckets
        })
}

/// Turn host groups and tabs into snapshot groups
///
/// Groups without a single http/https tab are dropped, titles are capped
/// and missing or unknown colors become grey.
pub fn snapshot_groups(groups: &[LocalGroup], tabs: &[LocalTab], max_title_chars: usize) -> Vec<GroupSnapshot> {
    let mut buckets = bucket_by_group(tabs);

    groups
        .iter()
        .filter_map(|group| {
            let urls = buckets.remove(&group.id).unwrap_or_default();
            if urls.is_empty() {
                debug!("Not syncing group {} with no syncable tabs", group.id);
                return None;
            }

            let title = match group.title.as_deref() {
                Some(title) if !title.is_empty() => truncate_chars(title, max_title_chars),
                _ => UNTITLED_GROUP.to_string(),
            };

            Some(GroupSnapshot {
                title,
                color: GroupColor::from_name_or_grey(group.color.as_deref()),
                tabs: urls,
            })
        })
        .collect()
}

/// Query the host once for groups and once for tabs and build the groups payload
pub async fn collect_groups<T: TabApi + ?Sized>(tabs: &T, max_title_chars: usize) -> Result<Vec<GroupSnapshot>> {
    let groups = tabs.query_groups(None).await?;
    let all_tabs = tabs.query_tabs(None).await?;
    Ok(snapshot_groups(&groups, &all_tabs, max_title_chars))
}

pub fn build_record(device: &Device, groups: Vec<GroupSnapshot>, timestamp: u64, config: &SyncConfig) -> RemoteStateRecord {
    RemoteStateRecord {
        timestamp,
        device_name: device
            .name
            .as_deref()
            .map(|name| truncate_chars(name, config.max_device_name_chars)),
        groups,
    }
}

/// Collect the local layout and overwrite this device's record with it
///
/// Nothing is written unless collection fully succeeds. Returns the number of
/// groups published.
pub async fn publish_snapshot<T, S>(
    tabs: &T,
    remote: &S,
    device: &Device,
    timestamp: u64,
    config: &SyncConfig,
) -> Result<usize>
where
    T: TabApi + ?Sized,
    S: Store + ?Sized,
{
    let groups = collect_groups(tabs, config.max_title_chars).await?;
    let record = build_record(device, groups, timestamp, config);
    let count = record.groups.len();

    remote
        .set(&state_key(&device.id), serde_json::to_value(&record)?)
        .await?;

    info!("[Auto-Save] Synced {} groups to cloud.", count);
    Ok(count)
}
