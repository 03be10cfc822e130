//! Notifier implementations.

use async_trait::async_trait;
use tracing::info;

use pubgate_core::events::{PublishEvent, ReleaseEvent};
use pubgate_core::traits::notifier::Notifier;

/// Notifier that emits domain events to the tracing pipeline.
///
/// The default wiring for single-node deployments; events land in the
/// structured log stream where they can be shipped and alerted on.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates a new log notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn release_event(&self, event: &ReleaseEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(event = %payload, "release event"),
            Err(e) => info!(error = %e, "release event (unserializable)"),
        }
    }

    async fn publish_event(&self, event: &PublishEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(event = %payload, "publish event"),
            Err(e) => info!(error = %e, "publish event (unserializable)"),
        }
    }
}
