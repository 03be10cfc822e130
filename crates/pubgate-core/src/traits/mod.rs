//! Seam traits implemented by other PubGate crates.

pub mod notifier;
pub mod storage;
