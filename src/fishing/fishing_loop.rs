//! The cast / find bobber / watch / react cycle

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::anti_idle::AntiIdle;
use super::session::SessionConfig;
use crate::input::{ActionDriver, MouseButton};
use crate::log_main::EventLog;
use crate::screen_reader::{find_best_match, Capturer, CueMatch, RegionWatcher};
use crate::utils::{FishingState, SessionState, SessionStats};
use crate::window::WindowActivator;

/// Longest uninterrupted sleep; every wait observes the stop flag this often
const STOP_CHECK_SLICE: Duration = Duration::from_millis(100);

/// The platform pieces a loop drives
pub struct Collaborators<C, A, W> {
    pub capturer: C,
    pub driver: A,
    pub window: W,
}

/// Loop position plus whatever data the next step needs
#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    WindowActivating,
    Casting,
    SearchingCue { cast_at: Instant },
    WatchingCue { cast_at: Instant, cue: CueMatch },
    Reacting,
    CoolingDown { cue_handled: bool },
    Stopped,
}

impl Phase {
    fn state(&self) -> FishingState {
        match self {
            Phase::Idle => FishingState::Idle,
            Phase::WindowActivating => FishingState::WindowActivating,
            Phase::Casting => FishingState::Casting,
            Phase::SearchingCue { .. } => FishingState::SearchingCue,
            Phase::WatchingCue { .. } => FishingState::WatchingCue,
            Phase::Reacting => FishingState::Reacting,
            Phase::CoolingDown { .. } => FishingState::CoolingDown,
            Phase::Stopped => FishingState::Stopped,
        }
    }
}

/// One session's worth of fishing, run to completion on the calling thread
pub struct FishingLoop<C, A, W> {
    config: SessionConfig,
    capturer: C,
    driver: A,
    window: W,
    shared: Arc<SessionState>,
    events: EventLog,
    session_end: Instant,
    last_bait: Option<Instant>,
    anti_idle: AntiIdle,
}

impl<C, A, W> FishingLoop<C, A, W>
where
    C: Capturer,
    A: ActionDriver,
    W: WindowActivator,
{
    pub fn new(
        config: SessionConfig,
        collaborators: Collaborators<C, A, W>,
        shared: Arc<SessionState>,
        events: EventLog,
    ) -> Self {
        let session_end = Instant::now() + config.session_duration();
        let (min_secs, max_secs) = config.anti_idle_interval;
        Self {
            anti_idle: AntiIdle::new(min_secs, max_secs),
            config,
            capturer: collaborators.capturer,
            driver: collaborators.driver,
            window: collaborators.window,
            shared,
            events,
            session_end,
            last_bait: None,
        }
    }

    /// Run until the session duration elapses or a stop is requested
    pub fn run(mut self) -> SessionStats {
        let mut phase = Phase::Idle;
        self.shared.set_state(phase.state());

        while phase != Phase::Stopped {
            let from = phase.state();
            let next = if self.shared.is_running() {
                self.step(phase)
            } else {
                Phase::Stopped
            };

            if let Phase::CoolingDown { cue_handled } = next {
                self.shared.record_cycle(cue_handled);
            }
            tracing::info!("[LOOP] {:?} -> {:?}", from, next.state());
            self.shared.set_state(next.state());
            phase = next;
        }

        let stats = self.shared.stats();
        self.events.info(format!(
            "Fishing stopped after {} casts ({} bites, {} misses)",
            stats.cycles, stats.catches, stats.misses
        ));
        stats
    }

    fn step(&mut self, phase: Phase) -> Phase {
        let result = match phase {
            Phase::Idle if self.session_over() => Ok(Phase::Stopped),
            Phase::Idle => Ok(Phase::WindowActivating),
            Phase::WindowActivating => self.activate_window(),
            Phase::Casting => self.cast(),
            Phase::SearchingCue { cast_at } => self.search_cue(cast_at),
            Phase::WatchingCue { cast_at, cue } => self.watch_cue(cast_at, &cue),
            Phase::Reacting => self.react(),
            Phase::CoolingDown { cue_handled } => self.cool_down(cue_handled),
            Phase::Stopped => Ok(Phase::Stopped),
        };

        result.unwrap_or_else(|e| {
            self.events.error(format!("Error during fishing: {:#}", e));
            if self.pause(self.config.timings.error_backoff) {
                Phase::CoolingDown { cue_handled: false }
            } else {
                Phase::Stopped
            }
        })
    }

    fn activate_window(&mut self) -> Result<Phase> {
        if self.session_over() {
            self.events.info(format!(
                "Session duration of {} h reached",
                self.config.duration_hours
            ));
            return Ok(Phase::Stopped);
        }

        if self.window.activate(&self.config.window_title) {
            return Ok(Phase::Casting);
        }

        let retry = self.config.timings.window_retry;
        self.events.warn(format!(
            "Window '{}' not found, retrying in {}s",
            self.config.window_title,
            retry.as_secs_f64()
        ));
        Ok(self.wait_then(retry, Phase::WindowActivating))
    }

    fn cast(&mut self) -> Result<Phase> {
        let timings = self.config.timings;

        if let Some(bait_key) = &self.config.bait_key {
            let due = self
                .last_bait
                .map_or(true, |last| last.elapsed() >= timings.bait_interval);
            if due {
                match self.driver.press_key(bait_key) {
                    Ok(()) => self.events.info(format!("Using bait ({})", bait_key)),
                    Err(e) => self.events.warn(format!("Failed to use bait: {:#}", e)),
                }
                self.last_bait = Some(Instant::now());
                if !self.pause(timings.after_bait) {
                    return Ok(Phase::Stopped);
                }
            }
        }

        self.driver
            .press_key(&self.config.cast_key)
            .context("Failed to press cast key")?;
        let cast_at = Instant::now();
        self.events.info("Casting line");

        Ok(self.wait_then(timings.after_cast, Phase::SearchingCue { cast_at }))
    }

    fn search_cue(&mut self, cast_at: Instant) -> Result<Phase> {
        let timings = self.config.timings;

        while cast_at.elapsed() < timings.cue_budget {
            if !self.shared.is_running() {
                return Ok(Phase::Stopped);
            }
            self.check_anti_idle();

            let found = self.capturer.try_capture(None).and_then(|frame| {
                find_best_match(
                    &frame,
                    &self.config.templates,
                    self.config.confidence_threshold,
                )
            });
            if let Some(cue) = found {
                self.events.info(format!(
                    "Found bobber '{}' at ({}, {}), score {:.2}",
                    cue.template_id, cue.top_left.0, cue.top_left.1, cue.score
                ));
                return Ok(Phase::WatchingCue { cast_at, cue });
            }

            tracing::debug!("[SEARCH] No bobber on screen yet");
            if !self.pause(timings.search_retry) {
                return Ok(Phase::Stopped);
            }
        }

        self.events
            .warn("Bobber not found in time, the fish may have bitten already or the cast timed out");
        Ok(Phase::CoolingDown { cue_handled: false })
    }

    fn watch_cue(&mut self, cast_at: Instant, cue: &CueMatch) -> Result<Phase> {
        let timings = self.config.timings;
        let (x, y) = cue.target_point(timings.pointer_inset);

        self.driver
            .move_cursor(x, y, timings.cursor_move)
            .with_context(|| format!("Failed to move pointer to ({}, {})", x, y))?;
        tracing::debug!("[WATCH] Pointer on bobber at ({}, {})", x, y);

        let mut watcher = RegionWatcher::new(&self.capturer, cue.region());
        if !watcher.prime() {
            // The first poll then compares against nothing and reads 0
            tracing::warn!("[WATCH] No baseline for the bobber region, watching anyway");
        }

        while cast_at.elapsed() < timings.cue_budget {
            if !self.pause(timings.watch_poll) {
                return Ok(Phase::Stopped);
            }

            let Some(difference) = watcher.poll() else {
                self.events.warn("Lost the bobber region capture, recasting");
                return Ok(Phase::CoolingDown { cue_handled: false });
            };
            tracing::trace!(
                "[WATCH] difference {:.2} (threshold {:.2})",
                difference,
                self.config.diff_threshold
            );

            if difference > self.config.diff_threshold {
                self.events
                    .info(format!("Bite detected (difference {:.2})", difference));
                return Ok(Phase::Reacting);
            }
        }

        self.events.warn("No bite before the timeout");
        Ok(Phase::CoolingDown { cue_handled: false })
    }

    fn react(&mut self) -> Result<Phase> {
        self.driver
            .click(MouseButton::Right)
            .context("Failed to click on the bobber")?;
        self.events.info("Reeling in");
        // The catch counts even if a stop interrupts this wait
        self.pause(self.config.timings.after_react);
        Ok(Phase::CoolingDown { cue_handled: true })
    }

    fn cool_down(&mut self, cue_handled: bool) -> Result<Phase> {
        if !cue_handled {
            tracing::debug!("[LOOP] Cycle ended without a catch");
        }
        Ok(self.wait_then(self.config.timings.cooldown, Phase::WindowActivating))
    }

    fn session_over(&self) -> bool {
        Instant::now() >= self.session_end
    }

    fn check_anti_idle(&mut self) {
        let now = Instant::now();
        if !self.anti_idle.is_due(now) {
            return;
        }

        match self.driver.press_key(&self.config.anti_idle_key) {
            Ok(()) => self
                .events
                .info(format!("Anti-idle: pressed {}", self.config.anti_idle_key)),
            Err(e) => self.events.warn(format!("Anti-idle press failed: {:#}", e)),
        }
        self.anti_idle.mark(now);
    }

    /// Wait `duration`, then move to `next` unless a stop arrived meanwhile
    fn wait_then(&self, duration: Duration, next: Phase) -> Phase {
        if self.pause(duration) {
            next
        } else {
            Phase::Stopped
        }
    }

    /// Sleep in short slices. Returns false as soon as a stop is requested.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if !self.shared.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(STOP_CHECK_SLICE));
        }
    }
}
