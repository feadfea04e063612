use crate::cancel::CancellationToken;
use crate::context::CompilationContext;
use crate::facts::Facts;
use crate::options::RuleOptions;
use crate::unit::SourceUnit;
use fixflow_types::{Diagnostic, DiagnosticDescriptor, FixProposal, RuleMeta};

/// Tree-to-tree transform with no context beyond the unit itself.
///
/// Returns the rewritten text, or `None` when the unit is already in shape. Returning
/// `None` once the rule's condition holds is what makes the pipeline idempotent.
pub trait SyntaxRule: Send + Sync {
    fn meta(&self) -> RuleMeta;

    fn process(&self, unit: &SourceUnit, options: &RuleOptions) -> anyhow::Result<Option<String>>;
}

/// Transform that may also query the unit's own semantic facts.
pub trait LocalSemanticRule: Send + Sync {
    fn meta(&self) -> RuleMeta;

    fn process(
        &self,
        unit: &SourceUnit,
        semantics: &Facts,
        options: &RuleOptions,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>>;
}

/// Analyzer half of a global-semantic rule.
///
/// Called once per unit of the compilation; the collector aggregates, orders and
/// deduplicates what it returns.
pub trait Analyzer: Send + Sync {
    fn meta(&self) -> RuleMeta;

    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor>;

    fn analyze(
        &self,
        unit: &SourceUnit,
        context: &CompilationContext,
        options: &RuleOptions,
    ) -> anyhow::Result<Vec<Diagnostic>>;
}

/// Fixer half of a global-semantic rule.
pub trait Fixer: Send + Sync {
    fn id(&self) -> &str;

    /// Diagnostic ids this fixer resolves. Two fixers may not claim the same id.
    fn fixable_diagnostic_ids(&self) -> Vec<String>;

    /// Propose edits for one diagnostic. An empty vector means "no safe fix exists".
    fn propose(
        &self,
        diagnostic: &Diagnostic,
        unit: &SourceUnit,
        context: &CompilationContext,
    ) -> anyhow::Result<Vec<FixProposal>>;
}
