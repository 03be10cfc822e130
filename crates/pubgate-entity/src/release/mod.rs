//! Release and release-file entities.

pub mod file;
pub mod model;

pub use file::{FileState, ReleaseFile, UploadedMeta};
pub use model::{CreateRelease, Release};
