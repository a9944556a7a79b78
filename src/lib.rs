//! Tabrefresh: periodic per-tab reload timers for a browser.
//!
//! The [`managers::timer_registry::TimerRegistry`] owns one timer per tab and
//! persists every change; the [`services::update_broadcaster::UpdateBroadcaster`]
//! ticks on a fixed cadence, performs due reloads and pushes countdown
//! snapshots to listeners.

pub mod app;
pub mod database;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
