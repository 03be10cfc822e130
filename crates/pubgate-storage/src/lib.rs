//! # pubgate-storage
//!
//! Physical storage for PubGate: the on-disk layout contract, the local
//! filesystem [`StorageProvider`] implementation, and the
//! [`PlacementStore`] that owns integrity-verified, atomically visible
//! file placement.
//!
//! [`StorageProvider`]: pubgate_core::traits::storage::StorageProvider
//! [`PlacementStore`]: crate::placement::PlacementStore

pub mod layout;
pub mod placement;
pub mod providers;
