//! Shared type definitions: typed identifiers.

pub mod id;
