//! In-memory repository implementations.
//!
//! Functional twins of the PostgreSQL repositories, backed by
//! `tokio::sync::RwLock`-guarded maps. Used for embedded single-node
//! operation and for tests that should not need a running database. The
//! atomicity contracts of the traits hold here through write-lock scope
//! instead of SQL constraints.

mod publish_request;
mod release;
mod report;
mod snapshot;
mod workspace;

pub use publish_request::MemoryPublishRequestRepository;
pub use release::MemoryReleaseRepository;
pub use report::MemoryReportRepository;
pub use snapshot::MemorySnapshotRepository;
pub use workspace::MemoryWorkspaceRepository;
