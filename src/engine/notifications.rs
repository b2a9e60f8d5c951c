//! One-shot notifications for transient UI feedback.
//!
//! Each notification is delivered at most once to a single consumer. The
//! receiving half is handed out when the engine is created, so there is
//! nothing to replay to late subscribers.

use futures::Stream;
use serde::Serialize;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A transient success or error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification::Success(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Notification::Success(m) | Notification::Error(m) => m,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = if self.is_error() { "❌" } else { "✅" };
        write!(f, "{} {}", icon, self.message())
    }
}

/// Sending half, owned by the engine.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSender {
    /// Deliver a notification. Dropped silently once the consumer is gone.
    pub fn send(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Receiving half, consumed by the UI.
#[derive(Debug)]
pub struct Notifications {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Notifications {
    /// Take everything queued so far without waiting.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.rx.try_recv() {
            drained.push(notification);
        }
        drained
    }
}

impl Stream for Notifications {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (NotificationSender, Notifications) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, Notifications { rx })
}
