//! # pubgate-database
//!
//! Persistence for PubGate. The repository traits in [`traits`] are the
//! seam the service layer works against; [`repositories`] holds the
//! PostgreSQL implementations and [`memory`] the in-memory twins used for
//! embedded single-node operation and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod traits;
