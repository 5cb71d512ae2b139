/// Per-install device identity
use log::info;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::host::Store;
use crate::storage::{DEVICE_ID_KEY, DEVICE_NAME_KEY};
use crate::tab_data::{Device, truncate_chars};

pub const DEVICE_ID_PREFIX: &str = "dev_";

/// Read the device identity, minting and persisting an id on first run
///
/// The id is written with a single put and never rewritten afterwards. Two
/// concurrent first-run calls can each mint an id; the later write wins.
pub async fn get_or_create_device<S: Store + ?Sized>(local: &S, max_name_chars: usize) -> Result<Device> {
    let id = match local.get(DEVICE_ID_KEY).await? {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => {
            let id = format!("{}{}", DEVICE_ID_PREFIX, Uuid::new_v4());
            local.set(DEVICE_ID_KEY, Value::String(id.clone())).await?;
            info!("[Device] Registered new device id {}", id);
            id
        }
    };

    let name = match local.get(DEVICE_NAME_KEY).await? {
        Some(Value::String(name)) if !name.is_empty() => Some(truncate_chars(&name, max_name_chars)),
        _ => None,
    };

    Ok(Device { id, name })
}

/// Store a user-chosen device label, returning what was actually saved
pub async fn set_device_name<S: Store + ?Sized>(local: &S, name: &str, max_name_chars: usize) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SyncError::InvalidCommand("device name must not be empty".to_string()));
    }

    let name = truncate_chars(trimmed, max_name_chars);
    local.set(DEVICE_NAME_KEY, Value::String(name.clone())).await?;
    info!("[Device] Device name set to {:?}", name);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_existing_device_is_not_rewritten() {
        let store = MemoryStore::new();
        store.insert(DEVICE_ID_KEY, json!("test_id"));
        store.insert(DEVICE_NAME_KEY, json!("test_name"));

        let device = block_on(get_or_create_device(&store, 32)).unwrap();

        assert_eq!(device.id, "test_id");
        assert_eq!(device.name.as_deref(), Some("test_name"));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_new_device_id_is_minted_once() {
        let store = MemoryStore::new();

        let first = block_on(get_or_create_device(&store, 32)).unwrap();
        let second = block_on(get_or_create_device(&store, 32)).unwrap();

        assert!(first.id.starts_with("dev_"));
        assert!(first.id.len() > DEVICE_ID_PREFIX.len());
        assert_eq!(first.id, second.id);
        assert_eq!(first.name, None);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.value(DEVICE_ID_KEY), Some(json!(first.id)));
    }

    #[test]
    fn test_minted_ids_differ() {
        let a = block_on(get_or_create_device(&MemoryStore::new(), 32)).unwrap();
        let b = block_on(get_or_create_device(&MemoryStore::new(), 32)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_long_stored_name_is_truncated_on_read() {
        let store = MemoryStore::new();
        store.insert(DEVICE_ID_KEY, json!("dev_x"));
        store.insert(DEVICE_NAME_KEY, json!("n".repeat(50)));

        let device = block_on(get_or_create_device(&store, 32)).unwrap();

        assert_eq!(device.name.map(|n| n.len()), Some(32));
    }

    #[test]
    fn test_set_device_name_trims_and_truncates() {
        let store = MemoryStore::new();

        let saved = block_on(set_device_name(&store, &format!("  {}  ", "x".repeat(40)), 32)).unwrap();

        assert_eq!(saved, "x".repeat(32));
        assert_eq!(store.value(DEVICE_NAME_KEY), Some(json!("x".repeat(32))));
    }

    #[test]
    fn test_set_device_name_rejects_blank() {
        let store = MemoryStore::new();

        let result = block_on(set_device_name(&store, "   ", 32));

        assert!(matches!(result, Err(SyncError::InvalidCommand(_))));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_store_failure_propagates() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        let result = block_on(get_or_create_device(&store, 32));

        assert!(matches!(result, Err(SyncError::Host(_))));
    }
}
