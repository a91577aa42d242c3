//! Start/stop control over a background fishing worker

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::fishing_loop::{Collaborators, FishingLoop};
use super::session::SessionConfig;
use crate::error::ControlError;
use crate::input::ActionDriver;
use crate::log_main::{EventLog, LogEvent};
use crate::screen_reader::Capturer;
use crate::utils::{FishingState, SessionState, SessionStats, SessionStatus};
use crate::window::WindowActivator;

/// How long `stop` waits for the worker to exit
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

const JOIN_POLL: Duration = Duration::from_millis(20);

/// Result of a stop request
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// No worker was running
    NotRunning,
    /// The worker exited within the grace period
    Stopped(SessionStats),
    /// The worker did not exit in time and was left to finish on its own.
    /// `start` is refused until it has exited.
    Abandoned,
    /// The worker panicked
    Panicked,
}

struct Worker {
    handle: JoinHandle<SessionStats>,
    events: EventLog,
}

/// Owns at most one fishing worker at a time
pub struct FishingController {
    worker: Option<Worker>,
    session: Option<Arc<SessionState>>,
    grace_period: Duration,
}

impl FishingController {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            worker: None,
            session: None,
            grace_period,
        }
    }

    /// Spawn a worker for `config`. The returned receiver carries the
    /// session's human-readable events.
    pub fn start<C, A, W>(
        &mut self,
        config: SessionConfig,
        collaborators: Collaborators<C, A, W>,
    ) -> Result<Receiver<LogEvent>, ControlError>
    where
        C: Capturer + Send + 'static,
        A: ActionDriver + Send + 'static,
        W: WindowActivator + Send + 'static,
    {
        if self.is_active() {
            return Err(ControlError::AlreadyRunning);
        }
        // A previous worker that already finished is reaped here
        self.reap();

        let (events, rx) = EventLog::channel();
        events.info(format!(
            "Starting: {} h, difference threshold {:.1}, confidence {:.2}, {} template(s), window '{}'",
            config.duration_hours,
            config.diff_threshold,
            config.confidence_threshold,
            config.templates.len(),
            config.window_title
        ));

        let session = Arc::new(SessionState::new());
        let worker_session = Arc::clone(&session);
        let worker_events = events.clone();
        let handle = thread::Builder::new()
            .name("fishing-loop".to_string())
            .spawn(move || {
                FishingLoop::new(config, collaborators, worker_session, worker_events).run()
            })?;

        tracing::info!("[CONTROL] Fishing worker started");
        self.worker = Some(Worker { handle, events });
        self.session = Some(session);
        Ok(rx)
    }

    /// Ask the worker to stop and wait up to the grace period for it
    pub fn stop(&mut self) -> StopOutcome {
        let Some(worker) = self.worker.take() else {
            return StopOutcome::NotRunning;
        };
        if let Some(session) = &self.session {
            session.request_stop();
        }
        worker.events.info("Stopping...");

        let deadline = Instant::now() + self.grace_period;
        while !worker.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }

        if !worker.handle.is_finished() {
            tracing::error!(
                "[CONTROL] Worker did not stop within {:?}, abandoning it",
                self.grace_period
            );
            worker
                .events
                .error("Fishing worker did not stop in time and was abandoned");
            // Still tracked so no new session overlaps it
            self.worker = Some(worker);
            return StopOutcome::Abandoned;
        }

        match worker.handle.join() {
            Ok(stats) => {
                tracing::info!("[CONTROL] Fishing worker stopped: {:?}", stats);
                StopOutcome::Stopped(stats)
            }
            Err(_) => {
                tracing::error!("[CONTROL] Fishing worker panicked");
                worker.events.error("Fishing worker crashed");
                StopOutcome::Panicked
            }
        }
    }

    /// True while a worker thread is alive
    pub fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Snapshot of the current (or most recent) session
    pub fn status(&self) -> SessionStatus {
        match &self.session {
            Some(session) => {
                let mut status = session.status();
                status.running = status.running && self.is_active();
                status
            }
            None => SessionStatus {
                running: false,
                state: FishingState::Idle,
                stats: SessionStats::default(),
            },
        }
    }

    fn reap(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.handle.join().is_err() {
                tracing::error!("[CONTROL] Previous fishing worker panicked");
            }
        }
    }
}

impl Default for FishingController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FishingController {
    fn drop(&mut self) {
        if self.is_active() {
            if let Some(session) = &self.session {
                session.request_stop();
            }
        }
    }
}
