//! Periodic simulation passes driven by the host's timers. Each system
//! is a free function over the shared state; none of them read the wall
//! clock.

pub mod capture;
pub mod upkeep;

pub use capture::{run_capture_tick, Occupant};
pub use upkeep::run_upkeep_tick;
