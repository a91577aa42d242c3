//! Fishing session: configuration, the state machine and its controller

pub mod anti_idle;
pub mod controller;
pub mod fishing_loop;
pub mod session;

pub use controller::{FishingController, StopOutcome};
pub use fishing_loop::{Collaborators, FishingLoop};
pub use session::{LoopTimings, SessionConfig};
