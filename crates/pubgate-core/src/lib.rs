//! # pubgate-core
//!
//! Core crate for PubGate. Contains the seam traits, configuration
//! schemas, typed identifiers, the content digest module, domain events,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other PubGate crates.

pub mod config;
pub mod digest;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
