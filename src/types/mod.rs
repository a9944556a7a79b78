// Tabrefresh shared type definitions
// Each submodule defines types used across the registry, broadcaster and RPC layer.

pub mod config;
pub mod errors;
pub mod state;
pub mod tab;
pub mod timer;
