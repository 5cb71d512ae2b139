/// Sync orchestration: debounced auto-save, force sync, merge and restore
use std::cell::RefCell;
use std::collections::HashMap;

use futures::channel::oneshot;
use futures::lock::Mutex;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::debounce::{DebounceTicket, Debouncer};
use crate::device::{get_or_create_device, set_device_name};
use crate::error::{Result, SyncError};
use crate::host::{Clock, Store, TabApi};
use crate::matcher::{GroupIndex, Resolved, resolve_group};
use crate::reconcile::{is_synced, merge_into, mirror_into};
use crate::snapshot::publish_snapshot;
use crate::storage::{SnapshotEntry, list_snapshots, load_record, state_key};
use crate::tab_data::{Device, GroupColor, GroupId, GroupSnapshot, LocalTab};

/// Result of one save cycle: number of groups published
pub type SaveOutcome = Result<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Pending,
    Saving,
    Synced,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreStatus {
    Idle,
    Restoring,
    Success,
    Error,
}

/// Toolbar badge for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub text: &'static str,
    pub color: Option<&'static str>,
}

const AMBER: &str = "#ff9400";
const GREEN: &str = "#2ac769";

impl SyncStatus {
    pub fn badge(self) -> Badge {
        match self {
            SyncStatus::Idle => Badge { text: "", color: None },
            SyncStatus::Pending | SyncStatus::Saving => Badge {
                text: "…",
                color: Some(AMBER),
            },
            SyncStatus::Synced => Badge {
                text: "✓",
                color: Some(GREEN),
            },
            SyncStatus::Error => Badge {
                text: "!",
                color: Some(AMBER),
            },
        }
    }
}

/// Host events that should schedule an auto-save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTrigger {
    TabUpdated,
    TabMoved,
    TabRemoved,
    GroupUpdated,
    GroupCreated,
    GroupRemoved,
}

/// The parts of a tab `changeInfo` that matter for triggering
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabChangeInfo {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ChangeTrigger {
    /// Map a host event name to a trigger; tab updates only count once a
    /// page finished loading or its URL changed
    pub fn from_event(kind: &str, change: &TabChangeInfo) -> Option<ChangeTrigger> {
        match kind {
            "tabUpdated" if change.status.as_deref() == Some("complete") || change.url.is_some() => {
                Some(ChangeTrigger::TabUpdated)
            }
            "tabMoved" => Some(ChangeTrigger::TabMoved),
            "tabRemoved" => Some(ChangeTrigger::TabRemoved),
            "groupUpdated" => Some(ChangeTrigger::GroupUpdated),
            "groupCreated" => Some(ChangeTrigger::GroupCreated),
            "groupRemoved" => Some(ChangeTrigger::GroupRemoved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Only add missing tabs
    Merge,
    /// Make each group an exact replica
    Mirror,
}

/// Totals for one merge or restore batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub groups_merged: usize,
    pub groups_created: usize,
    pub groups_skipped: usize,
    pub tabs_created: usize,
    pub tabs_removed: usize,
}

/// One remote group as it would appear in a restore picker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPreview {
    pub title: String,
    pub color: GroupColor,
    pub tab_count: usize,
    pub synced: bool,
}

struct EngineState {
    status: SyncStatus,
    restore_status: RestoreStatus,
    debounce: Debouncer,
    auto_save_running: bool,
    last_auto_save: Option<SaveOutcome>,
    waiters: Vec<oneshot::Sender<SaveOutcome>>,
}

/// Owns the sync state machine for one browser profile
///
/// Everything runs on a single event loop; interior state sits in a
/// `RefCell` that is never borrowed across an await. Saves are serialized
/// by one gate and merges/restores by another.
pub struct SyncEngine<T, S, C> {
    tabs: T,
    local: S,
    remote: S,
    clock: C,
    config: SyncConfig,
    state: RefCell<EngineState>,
    save_gate: Mutex<()>,
    restore_gate: Mutex<()>,
    listener: RefCell<Option<Box<dyn Fn(SyncStatus)>>>,
}

impl<T, S, C> SyncEngine<T, S, C>
where
    T: TabApi,
    S: Store,
    C: Clock,
{
    pub fn new(tabs: T, local: S, remote: S, clock: C, config: SyncConfig) -> Self {
        let debounce = Debouncer::new(config.debounce_ms);
        SyncEngine {
            tabs,
            local,
            remote,
            clock,
            config,
            state: RefCell::new(EngineState {
                status: SyncStatus::Idle,
                restore_status: RestoreStatus::Idle,
                debounce,
                auto_save_running: false,
                last_auto_save: None,
                waiters: Vec::new(),
            }),
            save_gate: Mutex::new(()),
            restore_gate: Mutex::new(()),
            listener: RefCell::new(None),
        }
    }

    pub fn tab_api(&self) -> &T {
        &self.tabs
    }

    pub fn remote_store(&self) -> &S {
        &self.remote
    }

    pub fn status(&self) -> SyncStatus {
        self.state.borrow().status
    }

    pub fn restore_status(&self) -> RestoreStatus {
        self.state.borrow().restore_status
    }

    /// Observe every status transition (drives the toolbar badge)
    pub fn set_status_listener(&self, listener: impl Fn(SyncStatus) + 'static) {
        *self.listener.borrow_mut() = Some(Box::new(listener));
    }

    fn set_status(&self, status: SyncStatus) {
        self.state.borrow_mut().status = status;
        if let Some(listener) = self.listener.borrow().as_ref() {
            listener(status);
        }
    }

    fn set_restore_status(&self, status: RestoreStatus) {
        self.state.borrow_mut().restore_status = status;
    }

    /// Record a local change and (re)start the debounce window
    ///
    /// The caller waits `ticket.delay_ms` and then hands the ticket to
    /// [`fire_debounce`](Self::fire_debounce).
    pub fn notify_change(&self, trigger: ChangeTrigger) -> DebounceTicket {
        debug!("[Auto-Save] Change detected: {:?}", trigger);
        let ticket = self.state.borrow_mut().debounce.arm();
        self.set_status(SyncStatus::Pending);
        ticket
    }

    /// Run the pending auto-save if `ticket` is still the latest one
    ///
    /// Returns `None` when the wake-up was superseded by a later change.
    pub async fn fire_debounce(&self, ticket: DebounceTicket) -> Option<SaveOutcome> {
        {
            let mut state = self.state.borrow_mut();
            if !state.debounce.take_if_current(ticket) {
                return None;
            }
            state.auto_save_running = true;
        }

        let outcome = self.save_cycle().await;

        let waiters = {
            let mut state = self.state.borrow_mut();
            state.auto_save_running = false;
            state.last_auto_save = Some(outcome.clone());
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        Some(outcome)
    }

    /// Publish the local layout now, bypassing the debounce window
    pub async fn force_sync(&self) -> SaveOutcome {
        info!("[Auto-Save] Forced sync requested.");
        self.save_cycle().await
    }

    /// Resolve once the pending or in-flight auto-save settles
    ///
    /// With nothing pending, returns the last auto-save outcome, or
    /// `NoAutoSavePending` if no auto-save has ever run.
    pub async fn wait_for_auto_save(&self) -> SaveOutcome {
        let receiver = {
            let mut state = self.state.borrow_mut();
            if !state.debounce.is_armed() && !state.auto_save_running {
                return state.last_auto_save.clone().unwrap_or(Err(SyncError::NoAutoSavePending));
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            receiver
        };

        receiver.await.unwrap_or(Err(SyncError::Cancelled))
    }

    async fn save_cycle(&self) -> SaveOutcome {
        let _guard = self.save_gate.lock().await;
        self.set_status(SyncStatus::Saving);

        let outcome = self.publish().await;

        let rearmed = self.state.borrow().debounce.is_armed();
        match &outcome {
            Ok(_) if rearmed => self.set_status(SyncStatus::Pending),
            Ok(_) => self.set_status(SyncStatus::Synced),
            Err(e) => {
                error!("[Auto-Save] Save Error: {}", e);
                self.set_status(if rearmed { SyncStatus::Pending } else { SyncStatus::Error });
            }
        }

        outcome
    }

    async fn publish(&self) -> SaveOutcome {
        let device = get_or_create_device(&self.local, self.config.max_device_name_chars).await?;
        publish_snapshot(&self.tabs, &self.remote, &device, self.clock.now_ms(), &self.config).await
    }

    /// Merge groups handed over by the UI, additively
    pub async fn sync_groups(&self, groups: &[GroupSnapshot]) -> Result<SyncReport> {
        info!("[Sync] Starting sync for {} groups...", groups.len());
        self.restore_cycle(async { self.apply_groups(groups, ReconcileMode::Merge).await })
            .await
    }

    /// Pull the selected groups out of another device's record
    ///
    /// Fails with `NotFound` before touching any tab if the key is absent.
    pub async fn restore(&self, key: &str, selected: &[String], mode: ReconcileMode) -> Result<SyncReport> {
        info!("[Restore] Starting restore from {} ({:?})...", key, mode);
        self.restore_cycle(async {
            let record = load_record(&self.remote, key).await?;
            let chosen: Vec<GroupSnapshot> = record
                .groups
                .into_iter()
                .filter(|group| selected.iter().any(|title| *title == group.title))
                .collect();
            info!("[Restore] Found {} selected groups in {}.", chosen.len(), key);
            self.apply_groups(&chosen, mode).await
        })
        .await
    }

    async fn restore_cycle<F>(&self, work: F) -> Result<SyncReport>
    where
        F: Future<Output = Result<SyncReport>>,
    {
        let _guard = self.restore_gate.lock().await;
        self.set_restore_status(RestoreStatus::Restoring);

        let result = work.await;
        match &result {
            Ok(report) => {
                info!("[Sync] Sync process complete: {:?}", report);
                self.set_restore_status(RestoreStatus::Success);
            }
            Err(e) => {
                error!("[Sync] Sync failed: {}", e);
                self.set_restore_status(RestoreStatus::Error);
            }
        }
        result
    }

    /// Match then reconcile each group, strictly one after another
    async fn apply_groups(&self, groups: &[GroupSnapshot], mode: ReconcileMode) -> Result<SyncReport> {
        let local_groups = self.tabs.query_groups(None).await?;
        let mut index = GroupIndex::from_groups(&local_groups, self.config.max_title_chars);
        let mut report = SyncReport::default();

        for remote in groups {
            let target = match resolve_group(&self.tabs, &mut index, remote).await? {
                Resolved::Merged(target) => {
                    report.groups_merged += 1;
                    target
                }
                Resolved::Created(target) => {
                    report.groups_created += 1;
                    report.tabs_created += 1;
                    target
                }
                Resolved::Skipped => {
                    report.groups_skipped += 1;
                    continue;
                }
            };

            let changes = match mode {
                ReconcileMode::Merge => merge_into(&self.tabs, &target, &remote.tabs).await?,
                ReconcileMode::Mirror => mirror_into(&self.tabs, &target, &remote.tabs).await?,
            };
            report.tabs_created += changes.created;
            report.tabs_removed += changes.removed;
        }

        Ok(report)
    }

    /// Describe a remote record's groups and whether each is already present locally
    pub async fn preview(&self, key: &str) -> Result<Vec<GroupPreview>> {
        let record = load_record(&self.remote, key).await?;
        let local_groups = self.tabs.query_groups(None).await?;
        let local_tabs = self.tabs.query_tabs(None).await?;

        let index = GroupIndex::from_groups(&local_groups, self.config.max_title_chars);
        let mut by_group: HashMap<GroupId, Vec<LocalTab>> = HashMap::new();
        for tab in local_tabs {
            if let Some(group) = tab.group_id {
                by_group.entry(group).or_default().push(tab);
            }
        }

        Ok(record
            .groups
            .into_iter()
            .map(|remote| {
                let synced = index
                    .get(&remote.title)
                    .and_then(|target| by_group.get(&target.id))
                    .is_some_and(|tabs| is_synced(&remote.tabs, tabs));
                GroupPreview {
                    tab_count: remote.tabs.len(),
                    color: remote.color,
                    synced,
                    title: remote.title,
                }
            })
            .collect())
    }

    /// Snapshots published by other devices, newest first
    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotEntry>> {
        let device = self.device().await?;
        let all = self.remote.get_all().await?;
        Ok(list_snapshots(all, &state_key(&device.id)))
    }

    pub async fn device(&self) -> Result<Device> {
        get_or_create_device(&self.local, self.config.max_device_name_chars).await
    }

    pub async fn set_device_name(&self, name: &str) -> Result<String> {
        set_device_name(&self.local, name, self.config.max_device_name_chars).await
    }
}
