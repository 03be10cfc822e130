//! # pubgate-service
//!
//! Business logic service layer for PubGate. Each service orchestrates
//! repositories, the placement store, and the notifier seam to implement
//! one stage of the publishing pipeline: release intake, snapshot
//! assembly, and the publish approval workflow.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod notify;
pub mod publish;
pub mod release;
pub mod snapshot;

pub use context::RequestContext;
pub use notify::LogNotifier;
pub use publish::PublishService;
pub use release::ReleaseIntakeService;
pub use snapshot::SnapshotService;
