//! Snapshot assembly: immutable, de-duplicated bundles of release files.

mod assembler;

pub use assembler::SnapshotService;
