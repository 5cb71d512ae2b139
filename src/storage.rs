/// Storage keys and the remote snapshot directory
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::host::Store;
use crate::tab_data::RemoteStateRecord;

/// Local-only key holding the write-once device id
pub const DEVICE_ID_KEY: &str = "device_id";
/// Local-only key holding the user-chosen device label
pub const DEVICE_NAME_KEY: &str = "device_name";
/// Prefix of every per-device record in the shared store
pub const STATE_KEY_PREFIX: &str = "state_";

pub fn state_key(device_id: &str) -> String {
    format!("{}{}", STATE_KEY_PREFIX, device_id)
}

/// One row in the list of other devices' snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub key: String,
    pub label: String,
    pub timestamp: u64,
    pub group_count: usize,
}

/// Decode a stored record
pub fn decode_record(value: Value) -> Result<RemoteStateRecord> {
    Ok(serde_json::from_value(value)?)
}

/// Fetch and decode one record, failing with `NotFound` if the key is absent
pub async fn load_record<S: Store + ?Sized>(remote: &S, key: &str) -> Result<RemoteStateRecord> {
    match remote.get(key).await? {
        Some(Value::Null) | None => Err(SyncError::NotFound(key.to_string())),
        Some(value) => decode_record(value),
    }
}

/// Build the directory of snapshots published by other devices, newest first
pub fn list_snapshots(all: Map<String, Value>, own_key: &str) -> Vec<SnapshotEntry> {
    let mut entries: Vec<SnapshotEntry> = all
        .into_iter()
        .filter(|(key, _)| key.starts_with(STATE_KEY_PREFIX) && key != own_key)
        .filter_map(|(key, value)| match decode_record(value) {
            Ok(record) => {
                let label = record
                    .device_name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| key[STATE_KEY_PREFIX.len()..].to_string());
                Some(SnapshotEntry {
                    label,
                    timestamp: record.timestamp,
                    group_count: record.groups.len(),
                    key,
                })
            }
            Err(e) => {
                warn!("Skipping undecodable snapshot {}: {}", key, e);
                None
            }
        })
        .collect();

    // Newest first, then by key for a stable order
    entries.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.key.cmp(&b.key))
    });

    entries
}
