/// Inbound messages from the popup and their responses
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::engine::{ReconcileMode, SyncEngine};
use crate::error::{Result, SyncError};
use crate::host::{Clock, Store, TabApi};
use crate::tab_data::GroupSnapshot;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Merge these groups additively into local state
    SyncGroups { groups: Vec<GroupSnapshot> },
    ForceSync,
    WaitForAutoSave,
    #[serde(rename_all = "camelCase")]
    Restore {
        snapshot_key: String,
        selected_groups: Vec<String>,
        #[serde(default)]
        mirror: bool,
    },
    ListSnapshots,
    #[serde(rename_all = "camelCase")]
    PreviewSnapshot { snapshot_key: String },
    GetDevice,
    SetDeviceName { name: String },
    GetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success {
        #[serde(skip_serializing_if = "Value::is_null")]
        data: Value,
    },
    Error { message: String },
}

pub fn parse_command(message: Value) -> Result<Command> {
    serde_json::from_value(message).map_err(|e| SyncError::InvalidCommand(e.to_string()))
}

fn to_data<V: Serialize>(value: V) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

async fn run<T, S, C>(engine: &SyncEngine<T, S, C>, command: Command) -> Result<Value>
where
    T: TabApi,
    S: Store,
    C: Clock,
{
    match command {
        Command::SyncGroups { groups } => to_data(engine.sync_groups(&groups).await?),
        Command::ForceSync => Ok(json!({ "count": engine.force_sync().await? })),
        Command::WaitForAutoSave => Ok(json!({ "count": engine.wait_for_auto_save().await? })),
        Command::Restore {
            snapshot_key,
            selected_groups,
            mirror,
        } => {
            let mode = if mirror { ReconcileMode::Mirror } else { ReconcileMode::Merge };
            to_data(engine.restore(&snapshot_key, &selected_groups, mode).await?)
        }
        Command::ListSnapshots => to_data(engine.list_snapshots().await?),
        Command::PreviewSnapshot { snapshot_key } => to_data(engine.preview(&snapshot_key).await?),
        Command::GetDevice => to_data(engine.device().await?),
        Command::SetDeviceName { name } => Ok(json!({ "name": engine.set_device_name(&name).await? })),
        Command::GetStatus => Ok(json!({
            "sync": engine.status(),
            "restore": engine.restore_status(),
        })),
    }
}

/// Run one command, turning any failure into an error response
pub async fn dispatch<T, S, C>(engine: &SyncEngine<T, S, C>, message: Value) -> Response
where
    T: TabApi,
    S: Store,
    C: Clock,
{
    let result = match parse_command(message) {
        Ok(command) => run(engine, command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(data) => Response::Success { data },
        Err(e) => {
            error!("[Command] Failed: {}", e);
            Response::Error { message: e.to_string() }
        }
    }
}
