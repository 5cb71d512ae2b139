/// Tab Group Sync - mirrors tab-group layouts across devices
/// Built with Rust + WASM

mod browser;
pub mod commands;
pub mod config;
pub mod debounce;
pub mod device;
pub mod engine;
pub mod error;
pub mod host;
pub mod matcher;
pub mod normalize;
pub mod reconcile;
pub mod snapshot;
pub mod storage;
pub mod tab_data;
#[cfg(test)]
mod testing;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::browser::BrowserEngine;
use crate::config::SyncConfig;
use crate::engine::{ChangeTrigger, TabChangeInfo};

thread_local! {
    static ENGINE: RefCell<Option<Rc<BrowserEngine>>> = const { RefCell::new(None) };
    static DEBOUNCE_TIMER: Cell<Option<i32>> = const { Cell::new(None) };
}

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
}

// Re-export URL normalization for JavaScript access
#[wasm_bindgen]
pub fn normalize_url(url: &str) -> Option<String> {
    normalize::normalize_url(url)
}

fn engine() -> Result<Rc<BrowserEngine>, JsValue> {
    ENGINE
        .with(|slot| slot.borrow().clone())
        .ok_or_else(|| JsValue::from_str("background not started"))
}

/// Wire up the sync engine and publish the startup snapshot
#[wasm_bindgen]
pub fn start_background(config: JsValue) -> Result<(), JsValue> {
    let config: SyncConfig = if config.is_undefined() || config.is_null() {
        SyncConfig::default()
    } else {
        browser::from_js(config).map_err(|e| JsValue::from_str(&e.to_string()))?
    };

    if ENGINE.with(|slot| slot.borrow().is_some()) {
        warn!("Background already started");
        return Ok(());
    }

    wasm_logger::init(wasm_logger::Config::new(config.level()));

    let engine = Rc::new(browser::new_engine(config));
    engine.set_status_listener(browser::show_badge);
    ENGINE.with(|slot| *slot.borrow_mut() = Some(engine.clone()));
    info!("Tab Group Sync started");

    spawn_local(async move {
        let _ = engine.force_sync().await;
    });
    Ok(())
}

/// Forward a host tab/group event; qualifying events schedule an auto-save
#[wasm_bindgen]
pub fn on_browser_event(kind: &str, change_info: JsValue) {
    let change: TabChangeInfo = browser::from_js(change_info).unwrap_or_default();
    let Some(trigger) = ChangeTrigger::from_event(kind, &change) else {
        return;
    };
    let Ok(engine) = engine() else {
        return;
    };

    let ticket = engine.notify_change(trigger);

    // Only the newest timer stays live; clearing one that already fired is a no-op
    if let Some(previous) = DEBOUNCE_TIMER.with(Cell::take) {
        browser::cancel_timer(previous);
    }
    let handle = browser::start_timer(ticket.delay_ms, move || {
        spawn_local(async move {
            engine.fire_debounce(ticket).await;
        });
    });
    DEBOUNCE_TIMER.with(|timer| timer.set(Some(handle)));
}

/// Handle a runtime message from the popup
#[wasm_bindgen]
pub async fn handle_message(message: JsValue) -> Result<JsValue, JsValue> {
    let engine = engine()?;
    let response = match browser::from_js(message) {
        Ok(message) => commands::dispatch(&*engine, message).await,
        Err(e) => commands::Response::Error { message: e.to_string() },
    };
    browser::to_js(&response).map_err(|e| JsValue::from_str(&e.to_string()))
}
