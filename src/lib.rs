//! Auto Angler - bobber-watching auto fisher
//!
//! Casts the line, finds the bobber on screen by template matching, watches
//! its region for a sudden change and right-clicks it when a fish bites.

pub mod error;
pub mod fishing;
pub mod input;
pub mod log_main;
pub mod screen_reader;
pub mod utils;
pub mod window;

// Re-exports for convenience
pub use error::{ConfigError, ControlError};
pub use fishing::{Collaborators, FishingController, LoopTimings, SessionConfig, StopOutcome};
pub use log_main::{EventLevel, EventLog, LogEvent};
pub use screen_reader::{Capturer, Region, ScreenService};
pub use utils::{path::get_data_dir, FishingState, SessionStatus, Settings};
