//! Publishing: target selection, credentials, and upload of an artifact set.
//!
//! Exactly one target is chosen per run. Uploads go through the external
//! upload tool; a failed upload is reported as-is and never retried.

mod credential;
mod target;
mod twine;

pub use credential::Credential;
pub use target::{PRODUCTION_REGISTRY_URL, PublishTarget, TargetKind, select_target};
pub use twine::{PublishReceipt, classify_upload_failure, publish};
