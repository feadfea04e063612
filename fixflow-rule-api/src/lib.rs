//! Plug-in surface for fixflow.
//!
//! This crate owns the *shape* of everything the pipeline treats as a black box:
//! source units and their opaque syntax/semantic views, the three rule kinds, fixers,
//! and the analysis provider that builds units and compilations. It contains no
//! orchestration; that lives in `fixflow-domain` and `fixflow-core`.

mod cancel;
mod context;
mod facts;
mod isolation;
mod options;
mod provider;
mod rule;
mod unit;

pub use cancel::{CancellationToken, Cancelled};
pub use context::CompilationContext;
pub use facts::Facts;
pub use isolation::call_plugin;
pub use options::RuleOptions;
pub use provider::AnalysisProvider;
pub use rule::{Analyzer, Fixer, LocalSemanticRule, SyntaxRule};
pub use unit::SourceUnit;

pub use fixflow_types::{
    Diagnostic, DiagnosticDescriptor, Edit, FixProposal, PreprocessorConfiguration,
    RuleCategory, RuleMeta, Severity, Span, UnitId,
};
