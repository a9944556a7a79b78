//! Tabrefresh RPC bridge: JSON-RPC over stdin/stdout for the browser extension.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"timer.start", "params":{"tabId":7,"interval":30}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Events:   {"event":"ready"}, {"event":"timerUpdate","timers":{...}},
//!           {"event":"reload","tabId":7}

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

use tabrefresh::app::App;
use tabrefresh::logging::init_logging;
use tabrefresh::rpc_handler::handle_method;
use tabrefresh::services::config_engine::{ConfigEngine, ConfigEngineTrait};
use tabrefresh::types::config::RefresherConfig;

/// Serialize every outgoing line through one task so lines never interleave.
fn spawn_writer(mut lines: mpsc::UnboundedReceiver<Value>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(line) = lines.recv().await {
            let mut bytes = line.to_string().into_bytes();
            bytes.push(b'\n');
            if stdout.write_all(&bytes).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut engine = ConfigEngine::new(None);
    let config_result = engine.load();
    let filter = config_result
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| RefresherConfig::default().log_filter);
    init_logging(&filter);
    if let Err(e) = config_result {
        warn!(event = "rpc.config.load_failed_using_defaults", path = engine.get_config_path(), error = %e);
    }

    let mut app = match App::open(&engine) {
        Ok(app) => app,
        Err(e) => {
            error!(event = "rpc.startup.failed", error = %e);
            std::process::exit(1);
        }
    };

    let (out_tx, out_rx) = mpsc::unbounded_channel::<Value>();
    let writer = spawn_writer(out_rx);

    if let Some(mut host_commands) = app.host_commands.take() {
        let out = out_tx.clone();
        tokio::spawn(async move {
            while let Some(command) = host_commands.recv().await {
                match serde_json::to_value(&command) {
                    Ok(value) => {
                        let _ = out.send(value);
                    }
                    Err(e) => warn!(event = "rpc.host_command.encode_failed", error = %e),
                }
            }
        });
    }

    let mut updates = app.registry.subscribe();
    let out = out_tx.clone();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let _ = out.send(json!({"event": "timerUpdate", "timers": update.timers}));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(event = "rpc.updates.lagged", skipped = skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let app = Arc::new(app);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticker = app.broadcaster().spawn(shutdown_rx);

    let _ = out_tx.send(json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    info!(event = "rpc.startup.completed", tick_interval_ms = app.config.tick_interval_ms);

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                info!(event = "rpc.shutdown.signal_received");
                break;
            }
        };
        let line = match line {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(event = "rpc.stdin.read_failed", error = %e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let _ = out_tx.send(json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let params = req.get("params").cloned().unwrap_or(json!({}));

        // Requests run concurrently so a slow host call for one tab does not
        // hold up commands for another.
        let app = Arc::clone(&app);
        let out = out_tx.clone();
        tokio::spawn(async move {
            let response = match handle_method(&app, &method, &params).await {
                Ok(val) => json!({"id": id, "result": val}),
                Err(err) => json!({"id": id, "error": err}),
            };
            let _ = out.send(response);
        });
    }

    let _ = shutdown_tx.send(true);
    let _ = ticker.await;
    if let Err(e) = app.shutdown() {
        error!(event = "rpc.shutdown.flush_failed", error = %e);
    }
    drop(out_tx);
    // Background forwarders hold sender clones; give the writer a moment to drain.
    let _ = tokio::time::timeout(std::time::Duration::from_millis(200), writer).await;
}
