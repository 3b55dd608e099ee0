//! Alert messages handed to notification channels.

use chrono::Local;
use serde::Serialize;

/// One alert, constructed per event and delivered to every active
/// channel. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage {
    /// Local wall-clock timestamp at construction.
    pub time: String,

    /// Human-readable alert body.
    pub content: String,
}

impl AlertMessage {
    /// Create an alert stamped with the current local time.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            content: content.into(),
        }
    }

    /// Create an alert with an explicit timestamp (for tests).
    pub fn with_time(time: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            content: content.into(),
        }
    }
}
