//! Domain logic: decide *which* rules run, in *what* order, and *who* fixes each diagnostic.
//!
//! This crate owns ordering and dispatch. It does not own how edits land in a unit;
//! that's the `fixflow-edit` crate. It does not drive units through passes; that's
//! `fixflow-core`.

mod collector;
mod dispatch;
mod error;
mod expander;
mod registry;

pub use collector::{CollectedDiagnostics, DiagnosticCollector};
pub use dispatch::{DispatchOutcome, DispatchReport, FixDispatchTable};
pub use error::{DispatchError, RegistryError};
pub use expander::{ConfigurationExpander, Expansion};
pub use registry::{BoundRule, RuleRegistry, RuleSet};
