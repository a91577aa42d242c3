//! State shared between the fishing worker and whoever controls it

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

/// Phase of the cast/detect/react cycle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FishingState {
    Idle,
    WindowActivating,
    Casting,
    SearchingCue,
    WatchingCue,
    Reacting,
    CoolingDown,
    Stopped,
}

impl FishingState {
    /// Get human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            FishingState::Idle => "Idle",
            FishingState::WindowActivating => "Activating game window...",
            FishingState::Casting => "Casting fishing line...",
            FishingState::SearchingCue => "Looking for the bobber...",
            FishingState::WatchingCue => "Watching the bobber...",
            FishingState::Reacting => "Bite! Reeling in...",
            FishingState::CoolingDown => "Cooling down",
            FishingState::Stopped => "Stopped",
        }
    }
}

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SessionStats {
    pub cycles: u32,
    pub catches: u32,
    pub misses: u32,
}

/// Snapshot returned to the control surface
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub running: bool,
    pub state: FishingState,
    pub stats: SessionStats,
}

impl SessionStatus {
    /// Get status as JSON string for a UI
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "running": self.running,
            "state": self.state.description(),
            "stats": self.stats,
        })
        .to_string()
    }
}

/// Per-session shared state.
///
/// The controller is the only writer of `running` (it clears it once to stop);
/// the worker is the only writer of `state` and `stats`.
#[derive(Debug)]
pub struct SessionState {
    running: AtomicBool,
    state: RwLock<FishingState>,
    stats: RwLock<SessionStats>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            state: RwLock::new(FishingState::Idle),
            stats: RwLock::new(SessionStats::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the worker to stop
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn state(&self) -> FishingState {
        *self.state.read()
    }

    pub fn set_state(&self, state: FishingState) {
        *self.state.write() = state;
    }

    pub fn stats(&self) -> SessionStats {
        *self.stats.read()
    }

    pub fn record_cycle(&self, cue_handled: bool) {
        let mut stats = self.stats.write();
        stats.cycles += 1;
        if cue_handled {
            stats.catches += 1;
        } else {
            stats.misses += 1;
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            running: self.is_running(),
            state: self.state(),
            stats: self.stats(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_request() {
        let state = SessionState::new();
        assert!(state.is_running());
        state.request_stop();
        assert!(!state.is_running());
    }

    #[test]
    fn test_record_cycle() {
        let state = SessionState::new();
        state.record_cycle(true);
        state.record_cycle(false);
        state.record_cycle(true);
        assert_eq!(
            state.stats(),
            SessionStats {
                cycles: 3,
                catches: 2,
                misses: 1
            }
        );
    }

    #[test]
    fn test_to_json() {
        let state = SessionState::new();
        state.set_state(FishingState::WatchingCue);
        let json: serde_json::Value = serde_json::from_str(&state.status().to_json()).unwrap();
        assert_eq!(json["running"], true);
        assert_eq!(json["state"], "Watching the bobber...");
        assert_eq!(json["stats"]["catches"], 0);
    }
}
