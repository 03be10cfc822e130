//! Best-effort notification seam.

use async_trait::async_trait;

use crate::events::{PublishEvent, ReleaseEvent};

/// Receives domain events after the owning transaction has committed.
///
/// Notification is best-effort by contract: the methods are infallible so
/// that a misbehaving notifier can never roll back the operation that fired
/// it. Implementations that talk to flaky externals must swallow (and log)
/// their own errors.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// A release intake event occurred.
    async fn release_event(&self, event: &ReleaseEvent);

    /// A publish workflow event occurred.
    async fn publish_event(&self, event: &PublishEvent);
}
