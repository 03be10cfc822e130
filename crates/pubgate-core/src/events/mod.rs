//! Domain events emitted by the intake pipeline and the publish workflow.
//!
//! Events are plain serializable values handed to the [`Notifier`] seam
//! after the owning operation has committed.
//!
//! [`Notifier`]: crate::traits::notifier::Notifier

mod publish;
mod release;

pub use publish::PublishEvent;
pub use release::ReleaseEvent;
