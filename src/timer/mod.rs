pub mod controller;
mod state;

pub use controller::{StepsTimer, TimerSnapshot, DEFAULT_TICK_INTERVAL};
pub use state::TimerStatus;
