//! Edit engine for fixflow.
//!
//! Responsibilities:
//! - Merge every fix proposal for a unit into one conflict-free edit set.
//! - Apply that set in a single pass, or not at all.
//! - Describe the change: unified diff preview and sha256 before/after.

mod batch;
mod diff;
mod error;

pub use batch::{AcceptedEdit, BatchFixApplier, BatchOutcome, apply_edits, validate_edit};
pub use diff::{file_change, render_patch, sha256_hex};
pub use error::{EditError, EditResult};
