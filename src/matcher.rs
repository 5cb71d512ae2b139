/// Matching remote groups onto local groups by title
use std::collections::HashMap;

use log::info;

use crate::error::Result;
use crate::host::TabApi;
use crate::normalize::normalize_url;
use crate::tab_data::{GroupColor, GroupId, GroupSnapshot, LocalGroup, WindowId, truncate_chars};

/// A local group that remote tabs are merged into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupTarget {
    pub id: GroupId,
    pub window_id: WindowId,
}

/// How to create a group that has no local counterpart
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePlan {
    pub anchor_url: String,
    pub title: String,
    pub color: GroupColor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchPlan {
    Existing(GroupTarget),
    Create(CreatePlan),
    /// No local group and nothing safe to open
    Skip,
}

/// Outcome of resolving a remote group against the local layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Merged(GroupTarget),
    Created(GroupTarget),
    Skipped,
}

/// Title → group lookup
///
/// Titles are compared in their capped form, the same form snapshots
/// publish, so a long local title still finds its own round-tripped group.
/// Only the first local group with a given title is ever targeted; later
/// groups with the same title are ignored.
#[derive(Debug, Clone)]
pub struct GroupIndex {
    max_title_chars: usize,
    by_title: HashMap<String, GroupTarget>,
}

impl GroupIndex {
    pub fn new(max_title_chars: usize) -> Self {
        GroupIndex {
            max_title_chars,
            by_title: HashMap::new(),
        }
    }

    pub fn from_groups(groups: &[LocalGroup], max_title_chars: usize) -> Self {
        let mut index = GroupIndex::new(max_title_chars);
        for group in groups {
            if let Some(title) = group.title.as_deref().filter(|t| !t.is_empty()) {
                let target = GroupTarget {
                    id: group.id,
                    window_id: group.window_id,
                };
                index.record(title, target);
            }
        }
        index
    }

    pub fn get(&self, title: &str) -> Option<GroupTarget> {
        self.by_title.get(&self.key(title)).copied()
    }

    /// Decide whether `remote` merges into an existing group or needs a new one
    pub fn plan(&self, remote: &GroupSnapshot) -> MatchPlan {
        if let Some(target) = self.get(&remote.title) {
            return MatchPlan::Existing(target);
        }

        match remote.tabs.iter().find_map(|url| normalize_url(url)) {
            Some(anchor_url) => MatchPlan::Create(CreatePlan {
                anchor_url,
                title: self.key(&remote.title),
                color: remote.color,
            }),
            None => MatchPlan::Skip,
        }
    }

    /// Remember a group under `title`; an earlier entry for the same title wins
    pub fn record(&mut self, title: &str, target: GroupTarget) {
        let key = self.key(title);
        self.by_title.entry(key).or_insert(target);
    }

    fn key(&self, title: &str) -> String {
        truncate_chars(title, self.max_title_chars)
    }
}

/// Find or create the local group for `remote`, updating `index` on create
pub async fn resolve_group<T: TabApi + ?Sized>(
    tabs: &T,
    index: &mut GroupIndex,
    remote: &GroupSnapshot,
) -> Result<Resolved> {
    match index.plan(remote) {
        MatchPlan::Existing(target) => {
            info!("[Sync] Merging into existing group: {:?}", remote.title);
            Ok(Resolved::Merged(target))
        }
        MatchPlan::Skip => {
            info!("[Sync] Skipping remote group with no safe tabs: {:?}", remote.title);
            Ok(Resolved::Skipped)
        }
        MatchPlan::Create(plan) => {
            info!("[Sync] Creating new group: {:?}", plan.title);
            let target = create_group(tabs, &plan).await?;
            index.record(&plan.title, target);
            Ok(Resolved::Created(target))
        }
    }
}

/// Open the anchor tab, group it, then label the group
async fn create_group<T: TabApi + ?Sized>(tabs: &T, plan: &CreatePlan) -> Result<GroupTarget> {
    let window = tabs.current_window().await?;
    let anchor = tabs.create_tab(&plan.anchor_url, false, Some(window)).await?;
    let group = tabs.group_tabs(&[anchor.id], None).await?;
    tabs.update_group(group, &plan.title, plan.color).await?;

    Ok(GroupTarget {
        id: group,
        window_id: anchor.window_id,
    })
}
