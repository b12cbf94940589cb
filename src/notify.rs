//! # User Notifications
//!
//! Fire-and-forget messages for the presentation layer. Three events reach the
//! user: the camera was denied, a code was detected, a capture was saved.
//! Delivery is best-effort; a notifier that fails or has nobody listening never
//! affects scanning.

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{error, info};

/// Event shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The camera could not be acquired.
    CaptureDenied { reason: String },
    /// A code was decoded and the frame frozen.
    CodeDetected { payload: String },
    /// The frozen capture was written to disk.
    Downloaded { path: PathBuf },
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(self, Notification::CaptureDenied { .. })
    }

    /// Short text suitable for a toast.
    pub fn message(&self) -> &'static str {
        match self {
            Notification::CaptureDenied { .. } => "Camera access was denied",
            Notification::CodeDetected { .. } => "QR code detected",
            Notification::Downloaded { .. } => "Image saved",
        }
    }
}

/// Sink for [`Notification`]s.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::CaptureDenied { reason } => {
                error!(reason = %reason, "{}", notification.message())
            }
            Notification::CodeDetected { payload } => {
                info!(payload = %payload, "{}", notification.message())
            }
            Notification::Downloaded { path } => {
                info!(path = %path.display(), "{}", notification.message())
            }
        }
    }
}

/// Forwards notifications over an unbounded channel. A closed receiver is
/// ignored.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification);
    }
}
