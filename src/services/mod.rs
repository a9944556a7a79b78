// Tabrefresh services
// Services provide the collaborators around the registry: time, configuration,
// durable state, the host browser seam and the update broadcaster.

pub mod clock;
pub mod config_engine;
pub mod state_store;
pub mod tab_host;
pub mod update_broadcaster;
