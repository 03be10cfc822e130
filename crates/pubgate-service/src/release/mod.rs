//! Release intake: content-addressed batch creation and verified upload.

mod intake;

pub use intake::{ReleaseIntakeService, ReleaseStatus};
