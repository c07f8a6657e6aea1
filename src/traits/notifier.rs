//! Notifier trait for best-effort result dispatch.

use async_trait::async_trait;

use crate::error::NotifyResult;

/// Dispatches a finished listing to an external channel.
///
/// The pipeline holds this as an *optional* capability, decided once at
/// construction: when absent, the notify stage is a deliberate no-op, not
/// an error. Dispatch is invoked at most once per pipeline run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a compact summary plus a full-detail attachment.
    async fn send(&self, summary: &str, detail: &str) -> NotifyResult<()>;

    /// Notifier name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
