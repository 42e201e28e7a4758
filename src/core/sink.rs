//! Log event delivery
//!
//! The link manager reports everything it does through a sink handed to it
//! at construction, so each front-end decides how messages reach the user:
//! the console forwards to `tracing`, the GUI hands events to the UI thread
//! over a channel.

use chrono::{DateTime, Local};

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Informational message
    Info,
    /// Something degraded but the link keeps working
    Warning,
    /// Operation failed
    Error,
}

impl LogLevel {
    /// Short tag used when rendering an event as text
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A single timestamped message from the link manager
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// When the event was emitted
    pub timestamp: DateTime<Local>,
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
}

impl LogEvent {
    /// Create an event stamped with the current local time
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// Render as a single log line
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.format("%H:%M:%S"),
            self.level.tag(),
            self.message
        )
    }
}

/// Receiver for link manager log output
///
/// Implementations must be safe to call from worker threads; delivery to a
/// UI thread is the sink's responsibility.
pub trait LogSink: Send + Sync {
    /// Deliver one event
    fn log(&self, event: LogEvent);

    /// Emit an informational message
    fn info(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Info, message));
    }

    /// Emit a warning
    fn warn(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Warning, message));
    }

    /// Emit an error
    fn error(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Error, message));
    }
}

/// Sink that forwards to the `tracing` subscriber
///
/// Default for the console front-end and library users.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, event: LogEvent) {
        match event.level {
            LogLevel::Info => tracing::info!("{}", event.message),
            LogLevel::Warning => tracing::warn!("{}", event.message),
            LogLevel::Error => tracing::error!("{}", event.message),
        }
    }
}

/// Sink that hands events to another thread over a channel
///
/// The GUI drains the receiving side on the UI thread; workers never touch
/// UI state directly.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<LogEvent>,
}

impl ChannelSink {
    /// Wrap a channel sender
    pub fn new(tx: crossbeam_channel::Sender<LogEvent>) -> Self {
        Self { tx }
    }
}

impl LogSink for ChannelSink {
    fn log(&self, event: LogEvent) {
        // Receiver gone means the UI is shutting down; nothing to report to.
        let _ = self.tx.send(event);
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: LogEvent) {}
}
