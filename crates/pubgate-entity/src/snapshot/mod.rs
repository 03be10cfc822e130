//! Snapshot entity.

pub mod model;

pub use model::Snapshot;
