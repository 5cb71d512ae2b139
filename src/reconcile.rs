/// Tab set reconciliation: additive merge and exact mirror
use std::collections::{HashMap, HashSet, VecDeque};

use futures::future::try_join_all;
use log::info;

use crate::error::Result;
use crate::host::TabApi;
use crate::matcher::GroupTarget;
use crate::normalize::normalize_url;
use crate::tab_data::{LocalTab, TabId};

/// What a mirror pass intends to do, all computed from one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorPlan {
    pub keep: Vec<TabId>,
    pub to_create: Vec<String>,
    pub to_remove: Vec<TabId>,
}

/// Tabs touched while reconciling one group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabChanges {
    pub created: usize,
    pub removed: usize,
}

fn local_url_set(local_tabs: &[LocalTab]) -> HashSet<String> {
    local_tabs.iter().filter_map(|tab| normalize_url(&tab.url)).collect()
}

/// Remote URLs missing from the group, normalized, in remote order, each at most once
pub fn plan_additions<S: AsRef<str>>(remote_urls: &[S], local_tabs: &[LocalTab]) -> Vec<String> {
    let mut present = local_url_set(local_tabs);

    remote_urls
        .iter()
        .filter_map(|url| normalize_url(url.as_ref()))
        .filter(|url| present.insert(url.clone()))
        .collect()
}

/// Make the group's membership match the remote multiset of URLs
///
/// Each remote occurrence claims at most one local tab with the same URL.
/// Unclaimed local tabs, including ones with unsafe URLs, are removed.
pub fn plan_mirror<S: AsRef<str>>(remote_urls: &[S], local_tabs: &[LocalTab]) -> MirrorPlan {
    let mut buckets: HashMap<String, VecDeque<TabId>> = HashMap::new();
    let mut unsafe_tabs = Vec::new();
    for tab in local_tabs {
        match normalize_url(&tab.url) {
            Some(url) => buckets.entry(url).or_default().push_back(tab.id),
            None => unsafe_tabs.push(tab.id),
        }
    }

    let mut plan = MirrorPlan::default();
    for url in remote_urls.iter().filter_map(|url| normalize_url(url.as_ref())) {
        match buckets.get_mut(&url).and_then(VecDeque::pop_front) {
            Some(id) => plan.keep.push(id),
            None => plan.to_create.push(url),
        }
    }

    let unclaimed: HashSet<TabId> = buckets.into_values().flatten().chain(unsafe_tabs).collect();
    // Keep removals in the host's tab order
    plan.to_remove = local_tabs
        .iter()
        .map(|tab| tab.id)
        .filter(|id| unclaimed.contains(id))
        .collect();

    plan
}

/// True when every safe remote URL is already in the local group
pub fn is_synced<S: AsRef<str>>(remote_urls: &[S], local_tabs: &[LocalTab]) -> bool {
    let local = local_url_set(local_tabs);
    let mut remote = remote_urls.iter().filter_map(|url| normalize_url(url.as_ref())).peekable();

    remote.peek().is_some() && remote.all(|url| local.contains(&url))
}

/// Open `urls` in the target's window concurrently, then group them in one call
async fn create_in_group<T: TabApi + ?Sized>(tabs: &T, target: &GroupTarget, urls: &[String]) -> Result<usize> {
    if urls.is_empty() {
        return Ok(0);
    }

    let created = try_join_all(
        urls.iter()
            .map(|url| tabs.create_tab(url, false, Some(target.window_id))),
    )
    .await?;
    let ids: Vec<TabId> = created.iter().map(|tab| tab.id).collect();
    tabs.group_tabs(&ids, Some(target.id)).await?;

    Ok(ids.len())
}

/// Add the remote tabs the group is missing; never removes anything
pub async fn merge_into<T, S>(tabs: &T, target: &GroupTarget, remote_urls: &[S]) -> Result<TabChanges>
where
    T: TabApi + ?Sized,
    S: AsRef<str>,
{
    let existing = tabs.query_tabs(Some(target.id)).await?;
    let to_create = plan_additions(remote_urls, &existing);

    if to_create.is_empty() {
        info!("[Sync] No new tabs to add to group {}.", target.id);
        return Ok(TabChanges::default());
    }

    info!("[Sync] Adding {} new tabs to group {}.", to_create.len(), target.id);
    let created = create_in_group(tabs, target, &to_create).await?;
    Ok(TabChanges { created, removed: 0 })
}

/// Make the group an exact replica of the remote tab list
pub async fn mirror_into<T, S>(tabs: &T, target: &GroupTarget, remote_urls: &[S]) -> Result<TabChanges>
where
    T: TabApi + ?Sized,
    S: AsRef<str>,
{
    let existing = tabs.query_tabs(Some(target.id)).await?;
    let plan = plan_mirror(remote_urls, &existing);

    info!(
        "[Sync] Mirroring group {}: keep {}, create {}, remove {}.",
        target.id,
        plan.keep.len(),
        plan.to_create.len(),
        plan.to_remove.len()
    );

    let created = create_in_group(tabs, target, &plan.to_create).await?;
    if !plan.to_remove.is_empty() {
        tabs.remove_tabs(&plan.to_remove).await?;
    }

    Ok(TabChanges {
        created,
        removed: plan.to_remove.len(),
    })
}
