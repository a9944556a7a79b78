//! RPC method handler for the tabrefresh JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches each call to the timer registry or the tab
//! mirror held by [`App`].
//!
//! Malformed requests (unknown method, missing or mistyped params) are
//! `Err`. Operations the registry declines come back as
//! `Ok({"success": false, "error": ...})` so the UI can show them.

use serde_json::{json, Value};
use tracing::debug;

use crate::app::App;
use crate::managers::timer_registry::RefreshOutcome;
use crate::types::tab::{TabId, TabInfo};

fn param_tab_id(params: &Value) -> Result<TabId, String> {
    params
        .get("tabId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| "missing tabId".to_string())
}

fn param_bool(params: &Value, key: &str) -> Result<bool, String> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| format!("missing {}", key))
}

fn success() -> Value {
    json!({"success": true})
}

fn failure(err: impl std::fmt::Display) -> Value {
    json!({"success": false, "error": err.to_string()})
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` with the result payload or `Err(String)` for a
/// malformed request.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    debug!(event = "rpc.method.received", method = method);
    let registry = &app.registry;

    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Timers ───
        "timer.start" => {
            let tab_id = param_tab_id(params)?;
            let interval = params
                .get("interval")
                .and_then(|v| v.as_i64())
                .ok_or("missing interval")?;
            Ok(match registry.start(tab_id, interval).await {
                Ok(()) => success(),
                Err(e) => failure(e),
            })
        }
        "timer.stop" => {
            let tab_id = param_tab_id(params)?;
            Ok(match registry.stop(tab_id).await {
                Ok(()) => success(),
                Err(e) => failure(e),
            })
        }
        "timer.toggle_pause" => {
            let tab_id = param_tab_id(params)?;
            Ok(match registry.toggle_pause(tab_id).await {
                Ok(paused) => json!({"success": true, "paused": paused}),
                Err(e) => failure(e),
            })
        }
        "timer.pause" | "timer.resume" => {
            let tab_id = param_tab_id(params)?;
            let result = if method == "timer.pause" {
                registry.pause(tab_id).await
            } else {
                registry.resume(tab_id).await
            };
            Ok(match result {
                Ok(timer) => json!({"success": true, "paused": timer.paused}),
                Err(e) => failure(e),
            })
        }
        "timer.refresh" => {
            let tab_id = param_tab_id(params)?;
            Ok(match registry.refresh(tab_id).await {
                Ok(outcome) => json!({
                    "success": true,
                    "skipped": outcome == RefreshOutcome::SkippedActiveTab,
                }),
                Err(e) => failure(e),
            })
        }
        "timer.list" => {
            let update = registry.query().await;
            serde_json::to_value(&update).map_err(|e| e.to_string())
        }

        // ─── Preferences ───
        "prefs.set_skip_active_tab" => {
            let value = param_bool(params, "value")?;
            Ok(match registry.set_skip_active_tab(value) {
                Ok(()) => success(),
                Err(e) => failure(e),
            })
        }
        "prefs.get_skip_active_tab" => Ok(json!({"skipActiveTab": registry.skip_active_tab()})),
        "config.get" => serde_json::to_value(&app.config).map_err(|e| e.to_string()),

        // ─── Host tab events ───
        "tabs.updated" => {
            let tab = params.get("tab").cloned().ok_or("missing tab")?;
            let info: TabInfo =
                serde_json::from_value(tab).map_err(|e| format!("invalid tab: {}", e))?;
            app.mirror.upsert_tab(info.clone());
            Ok(match registry.on_tab_updated(&info).await {
                Ok(changed) => json!({"success": true, "timerUpdated": changed}),
                Err(e) => failure(e),
            })
        }
        "tabs.removed" => {
            let tab_id = param_tab_id(params)?;
            // The mirror may never have seen the tab; the timer still goes.
            let _ = app.mirror.remove_tab(tab_id);
            Ok(match registry.on_tab_removed(tab_id).await {
                Ok(removed) => json!({"success": true, "timerRemoved": removed}),
                Err(e) => failure(e),
            })
        }
        "tabs.focused" => {
            let tab_id = match params.get("tabId") {
                None | Some(Value::Null) => None,
                Some(v) => Some(v.as_i64().ok_or("invalid tabId")?),
            };
            app.mirror.set_focused(tab_id);
            Ok(success())
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
