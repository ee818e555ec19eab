/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationVariant {
    Error,
    Success,
}

/// Transient user-facing notification sink (a snack bar in the UI).
pub trait Notifier: Send + Sync {
    fn notify(&self, variant: NotificationVariant, message: &str);
}

/// Writes notifications to the log. Used when no UI sink is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, variant: NotificationVariant, message: &str) {
        match variant {
            NotificationVariant::Error => tracing::warn!(notification = message, "user notification"),
            NotificationVariant::Success => tracing::info!(notification = message, "user notification"),
        }
    }
}
