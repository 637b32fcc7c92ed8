//! User notification channel for failed calls.

/// Receives the user-facing message of every failed backend call.
///
/// The transport calls this once per failure; the return value is not used.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Default notifier: emits a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(notice = message, "user notified of failure");
    }
}
