//! Pipeline log streaming via Server-Sent Events (SSE).
//!
//! Every pipeline step reports through the helpers below. Entries are
//! printed to stdout and fanned out on a broadcast channel that the
//! `/api/logs` endpoint relays to connected clients.

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entries buffered per subscriber before the slowest one starts lagging.
pub const LOG_CHANNEL_CAPACITY: usize = 256;

/// Log level for frontend display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Console prefix.
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth, for per-line details under a step
    #[serde(default)]
    pub indent: u8,
    /// RFC 3339, UTC
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Print the entry and send it to all subscribers
    pub fn log(&self, entry: LogEntry) {
        let indent = "   ".repeat(entry.indent as usize);
        println!("{}{} {}", indent, entry.level.prefix(), entry.message);

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::new(LogLevel::Warning, "2 rows skipped").with_indent(1));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "2 rows skipped");
        assert_eq!(entry.indent, 1);
    }

    #[test]
    fn test_entry_json() {
        let entry = LogEntry::new(LogLevel::Success, "done");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "done");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
