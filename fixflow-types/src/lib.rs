//! Shared DTOs (schemas-as-code) for the fixflow workspace.
//!
//! # Design constraints
//! - Everything here is plain data: no plug-in traits, no I/O.
//! - Report types are serialized to disk; prefer adding optional fields over changing
//!   semantics.

pub mod diagnostic;
pub mod edit;
pub mod report;
pub mod rule;

pub use diagnostic::{Diagnostic, DiagnosticDescriptor, FixProposal, Severity, UnitId};
pub use edit::{Edit, Span};
pub use rule::{PreprocessorConfiguration, RuleCategory, RuleMeta};

/// Schema identifiers.
pub mod schema {
    pub const FIXFLOW_RUN_REPORT_V1: &str = "fixflow.run_report.v1";
    pub const FIXFLOW_RULE_LIST_V1: &str = "fixflow.rule_list.v1";
}
