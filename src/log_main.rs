//! Human-readable session events for the control surface
//!
//! Every event is also written through `tracing`, so the debug log file carries
//! the same lines the user sees.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, Local};

/// Severity of a session event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// One timestamped line for the user
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub level: EventLevel,
    pub message: String,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Sending half of the event stream.
///
/// Sending never fails from the caller's point of view: once the receiver is
/// gone events only reach `tracing`.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    tx: Option<Sender<LogEvent>>,
}

impl EventLog {
    /// Create a connected log and its receiver
    pub fn channel() -> (Self, Receiver<LogEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A log that only writes to `tracing`
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(EventLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(EventLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EventLevel::Error, message.into());
    }

    fn emit(&self, level: EventLevel, message: String) {
        match level {
            EventLevel::Info => tracing::info!("[SESSION] {}", message),
            EventLevel::Warn => tracing::warn!("[SESSION] {}", message),
            EventLevel::Error => tracing::error!("[SESSION] {}", message),
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(LogEvent {
                timestamp: Local::now(),
                level,
                message,
            });
        }
    }
}
