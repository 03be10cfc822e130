//! PostgreSQL repository implementations.
//!
//! Entities are mapped from rows by hand: the tagged state enums on
//! `ReleaseFile` and `PublishRequest` span several nullable columns, and
//! the conversion is where illegal column combinations are rejected.

pub mod publish_request;
pub mod release;
pub mod report;
pub mod snapshot;
pub mod workspace;
