//! # pubgate-entity
//!
//! Domain entity models for PubGate: workspaces, releases and their files,
//! snapshots, reports, and publish requests.
//!
//! Entities are plain serde/chrono values. Persistence mapping lives in
//! `pubgate-database`; the tagged state enums here do not correspond 1:1 to
//! columns, so repositories map rows by hand.

pub mod publish;
pub mod release;
pub mod report;
pub mod snapshot;
pub mod workspace;
