//! Settings, key names, data paths and shared session state

pub mod bot_state;
pub mod keybinds;
pub mod path;
pub mod settings;

pub use bot_state::{FishingState, SessionState, SessionStats, SessionStatus};
pub use settings::Settings;
