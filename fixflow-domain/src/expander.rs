use anyhow::Context;
use fixflow_rule_api::{
    AnalysisProvider, CancellationToken, CompilationContext, PreprocessorConfiguration,
    SourceUnit,
};
use tracing::{debug, warn};

/// Fans one compilation out over the conditional-compilation variants it must be
/// processed under.
///
/// The implicit base configuration always comes first; supplied configurations follow in
/// their given order. Derivation reads the input and builds new snapshots, so deriving
/// two configurations from the same input is independent and safe to do concurrently.
pub struct ConfigurationExpander<'a> {
    provider: &'a dyn AnalysisProvider,
    configurations: Vec<PreprocessorConfiguration>,
    skipped: Vec<PreprocessorConfiguration>,
}

impl<'a> ConfigurationExpander<'a> {
    /// Explicit empty configurations and repeats (same symbol list) are folded away with
    /// a warning.
    pub fn new(
        provider: &'a dyn AnalysisProvider,
        supplied: impl IntoIterator<Item = PreprocessorConfiguration>,
    ) -> Self {
        let mut configurations = vec![PreprocessorConfiguration::base()];
        let mut skipped = Vec::new();
        for cfg in supplied {
            if let Some(same) = configurations.iter().find(|c| c.symbols == cfg.symbols) {
                warn!(
                    configuration = cfg.name.as_str(),
                    same_as = same.name.as_str(),
                    "skipping configuration with the same symbols as an earlier one"
                );
                skipped.push(cfg);
                continue;
            }
            configurations.push(cfg);
        }
        debug!(
            configurations = configurations.len(),
            skipped = skipped.len(),
            "expanded configurations"
        );
        Self {
            provider,
            configurations,
            skipped,
        }
    }

    /// Every configuration in processing order, base first.
    pub fn configurations(&self) -> &[PreprocessorConfiguration] {
        &self.configurations
    }

    /// Supplied configurations that repeated an earlier symbol set.
    pub fn skipped(&self) -> &[PreprocessorConfiguration] {
        &self.skipped
    }

    /// Re-derive one unit as if `configuration`'s symbols (and only those) were defined.
    pub fn derive_unit(
        &self,
        unit: &SourceUnit,
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SourceUnit> {
        if unit.configuration() == configuration {
            return Ok(unit.clone());
        }
        self.provider
            .derive(unit, configuration, cancel)
            .with_context(|| format!("derive {} under {}", unit.id(), configuration.name))
    }

    /// Build a fresh compilation for `configuration` from `base`'s unit texts.
    pub fn derive(
        &self,
        base: &CompilationContext,
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<CompilationContext> {
        if base.configuration() == configuration {
            return Ok(base.clone());
        }
        let mut units = Vec::with_capacity(base.units().len());
        for unit in base.units() {
            cancel.check()?;
            units.push(self.derive_unit(unit, configuration, cancel)?);
        }
        self.provider
            .compile(base.project(), &units, configuration, cancel)
            .with_context(|| format!("compile {} under {}", base.project(), configuration.name))
    }

    /// Lazily derive a compilation per configuration. Nothing is parsed until the
    /// iterator is advanced, and `base` is never modified.
    pub fn expand<'b>(
        &'b self,
        base: &'b CompilationContext,
        cancel: &'b CancellationToken,
    ) -> Expansion<'b, 'a> {
        Expansion {
            expander: self,
            base,
            cancel,
            next: 0,
        }
    }
}

/// Iterator returned by [`ConfigurationExpander::expand`].
pub struct Expansion<'b, 'a> {
    expander: &'b ConfigurationExpander<'a>,
    base: &'b CompilationContext,
    cancel: &'b CancellationToken,
    next: usize,
}

impl Iterator for Expansion<'_, '_> {
    type Item = (PreprocessorConfiguration, anyhow::Result<CompilationContext>);

    fn next(&mut self) -> Option<Self::Item> {
        let cfg = self.expander.configurations.get(self.next)?.clone();
        self.next += 1;
        let derived = self.expander.derive(self.base, &cfg, self.cancel);
        Some((cfg, derived))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.expander.configurations.len() - self.next;
        (left, Some(left))
    }
}
