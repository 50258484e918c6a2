use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message surfaced to whoever is driving the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Records notifications for later inspection.
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(notification);
        }
    }
}

/// Emits notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!("{}", notification.message)
            }
            NotificationLevel::Warning => {
                tracing::warn!("{}", notification.message)
            }
            NotificationLevel::Error => {
                tracing::error!("{}", notification.message)
            }
        }
    }
}
