//! Publish request entity.

pub mod model;

pub use model::{Decision, DecisionStatus, PublishRequest};
