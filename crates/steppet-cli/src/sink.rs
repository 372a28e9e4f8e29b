//! Notification sink that writes every notification to the log.

use steppet_core::session::NotificationSink;
use steppet_types::Notification;
use tracing::{info, warn};

/// Logs each notification as one JSON line at `info` level.
#[derive(Debug, Default)]
pub struct LogSink {
    emitted: u64,
}

impl LogSink {
    /// Number of notifications received so far.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl NotificationSink for LogSink {
    fn notify(&mut self, notification: &Notification) {
        self.emitted = self.emitted.saturating_add(1);
        match serde_json::to_string(notification) {
            Ok(json) => info!(
                target: "steppet::notification",
                kind = ?notification.kind,
                notification = %json,
                "notification"
            ),
            Err(e) => warn!(
                kind = ?notification.kind,
                error = %e,
                "failed to serialize notification"
            ),
        }
    }
}
