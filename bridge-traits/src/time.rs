//! Clock and log forwarding seams.
//!
//! Token expiry and pending-state age are both judged against an injected
//! [`Clock`], so tests pin "now" with [`FixedClock`]. [`LoggerSink`] lets a
//! deployment receive the events `core-runtime::logging` captures without
//! parsing stdout.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::Result;

/// Source of the current time.
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// fn is_past(clock: &dyn Clock, expires_at_millis: i64) -> bool {
///     clock.unix_timestamp_millis() >= expires_at_millis
/// }
/// ```
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock.
#[derive(Debug, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Severity of a forwarded event, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One tracing event as handed to a [`LoggerSink`].
///
/// Field values arrive already redacted when the logging layer has PII
/// redaction enabled.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    /// Name of the innermost span the event was recorded in
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Receiver for events captured by the logging layer.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Events below this level are dropped before an entry is built.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock;
        assert!(clock.unix_timestamp() > 0);
        assert_eq!(clock.now().timestamp(), clock.unix_timestamp());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::from_millis(1_700_000_000_123);
        assert_eq!(clock.unix_timestamp_millis(), 1_700_000_000_123);
        assert_eq!(clock.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_log_entry_fields() {
        let entry = LogEntry::new(LogLevel::Warn, "core_auth", "refresh failed")
            .with_field("session_id", "s-1");

        assert_eq!(entry.target, "core_auth");
        assert_eq!(entry.fields.get("session_id").map(String::as_str), Some("s-1"));
        assert!(entry.span.is_none());
        assert!(LogLevel::Warn > LogLevel::Info);
    }
}
