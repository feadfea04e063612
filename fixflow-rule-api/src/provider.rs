use crate::cancel::CancellationToken;
use crate::context::CompilationContext;
use crate::facts::Facts;
use crate::unit::SourceUnit;
use fixflow_types::{PreprocessorConfiguration, UnitId};

/// External analysis provider: parses units, answers per-unit semantic queries and builds
/// whole-project compilations.
///
/// Implementations must be deterministic for identical inputs and must honour the
/// cancellation token in any call that can take long.
pub trait AnalysisProvider: Send + Sync {
    fn parse(
        &self,
        id: &UnitId,
        text: &str,
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SourceUnit>;

    fn unit_semantics(&self, unit: &SourceUnit, cancel: &CancellationToken)
    -> anyhow::Result<Facts>;

    fn compile(
        &self,
        project: &str,
        units: &[SourceUnit],
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<CompilationContext>;

    /// New snapshot of `unit` with `text`, under the unit's own configuration.
    fn reparse(
        &self,
        unit: &SourceUnit,
        text: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SourceUnit> {
        self.parse(unit.id(), text, unit.configuration(), cancel)
    }

    /// Same text, re-derived as if `configuration`'s symbols were defined.
    fn derive(
        &self,
        unit: &SourceUnit,
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SourceUnit> {
        self.parse(unit.id(), unit.text(), configuration, cancel)
    }
}
