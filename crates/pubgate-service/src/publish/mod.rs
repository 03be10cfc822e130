//! Publish approval workflow over snapshots and reports.

mod workflow;

pub use workflow::PublishService;
