// Tabrefresh state managers
// Managers own mutable state: the mirrored host tabs and the per-tab refresh timers.

pub mod tab_mirror;
pub mod timer_registry;
