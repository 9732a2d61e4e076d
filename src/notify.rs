//! User-facing notifications gated by a permission setting.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Whether the user allowed notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Fire-and-forget delivery target.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Delivers to the inner sink only while permission is granted.
/// Clones share the permission.
#[derive(Clone)]
pub struct PermissionGate<S> {
    inner: S,
    permission: Arc<RwLock<NotificationPermission>>,
}

impl<S: NotificationSink> PermissionGate<S> {
    pub fn new(inner: S, permission: NotificationPermission) -> Self {
        Self {
            inner,
            permission: Arc::new(RwLock::new(permission)),
        }
    }

    pub fn permission(&self) -> NotificationPermission {
        *self.permission.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_permission(&self, permission: NotificationPermission) {
        tracing::info!("notification permission: {permission:?}");
        *self.permission.write().unwrap_or_else(|e| e.into_inner()) = permission;
    }
}

impl<S: NotificationSink> NotificationSink for PermissionGate<S> {
    fn notify(&self, notification: Notification) {
        if self.permission() == NotificationPermission::Granted {
            self.inner.notify(notification);
        } else {
            tracing::debug!("notification suppressed: {}", notification.title);
        }
    }
}

/// Forwards notifications to the UI.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(
        permission: NotificationPermission,
    ) -> (PermissionGate<ChannelSink>, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PermissionGate::new(ChannelSink::new(tx), permission), rx)
    }

    #[test]
    fn test_only_granted_delivers() {
        for permission in [NotificationPermission::Default, NotificationPermission::Denied] {
            let (gate, mut rx) = gate(permission);
            gate.notify(Notification::new("Job Accepted!", "x"));
            assert!(rx.try_recv().is_err());
        }

        let (gate, mut rx) = gate(NotificationPermission::Granted);
        gate.notify(Notification::new("Job Accepted!", "x"));
        assert_eq!(rx.try_recv().unwrap().title, "Job Accepted!");
    }

    #[test]
    fn test_permission_changes_at_runtime_across_clones() {
        let (gate, mut rx) = gate(NotificationPermission::Default);
        let other = gate.clone();
        other.set_permission(NotificationPermission::Granted);
        gate.notify(Notification::new("a", "b"));
        assert!(rx.try_recv().is_ok());
        gate.set_permission(NotificationPermission::Denied);
        other.notify(Notification::new("a", "b"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ChannelSink::new(tx).notify(Notification::new("a", "b"));
    }
}
