use crate::registry::BoundRule;
use fixflow_rule_api::{
    Analyzer, CancellationToken, Cancelled, CompilationContext, Diagnostic, call_plugin,
};
use fixflow_types::report::PipelineWarning;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Flat, deduplicated diagnostics for one compilation plus the analyzer failures that
/// were recovered while producing them.
#[derive(Debug, Clone, Default)]
pub struct CollectedDiagnostics {
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<PipelineWarning>,
}

/// Runs every enabled analyzer once over a compilation and aggregates what they report.
///
/// Output order is analyzer order, then unit order within the compilation, then source
/// order (span start, then length) within a unit. Analyzers run concurrently; the order
/// does not depend on scheduling.
pub struct DiagnosticCollector<'a> {
    analyzers: &'a [BoundRule<dyn Analyzer>],
}

impl<'a> DiagnosticCollector<'a> {
    pub fn new(analyzers: &'a [BoundRule<dyn Analyzer>]) -> Self {
        Self { analyzers }
    }

    pub fn collect(
        &self,
        context: &CompilationContext,
        cancel: &CancellationToken,
    ) -> Result<CollectedDiagnostics, Cancelled> {
        let per_analyzer = self
            .analyzers
            .par_iter()
            .map(|analyzer| {
                cancel.check()?;
                Ok(run_analyzer(analyzer, context))
            })
            .collect::<Result<Vec<_>, Cancelled>>()?;

        let mut out = CollectedDiagnostics::default();
        let mut seen = HashSet::new();
        for collected in per_analyzer {
            for d in collected.diagnostics {
                if seen.insert((d.rule_id.clone(), d.unit.clone(), d.span, d.message.clone())) {
                    out.diagnostics.push(d);
                }
            }
            out.failures.extend(collected.failures);
        }

        debug!(
            project = context.project(),
            configuration = context.configuration().name.as_str(),
            diagnostics = out.diagnostics.len(),
            failures = out.failures.len(),
            "collected diagnostics"
        );
        Ok(out)
    }
}

fn run_analyzer(analyzer: &BoundRule<dyn Analyzer>, context: &CompilationContext) -> CollectedDiagnostics {
    let mut out = CollectedDiagnostics::default();
    let configuration = &context.configuration().name;

    for unit in context.units() {
        let result = call_plugin(|| analyzer.rule.analyze(unit, context, &analyzer.options));
        let mut found = match result {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    analyzer = analyzer.id(),
                    unit = %unit.id(),
                    configuration = configuration.as_str(),
                    "analyzer failed: {err:#}"
                );
                out.failures.push(PipelineWarning::AnalyzerFailure {
                    analyzer_id: analyzer.id().to_string(),
                    unit: unit.id().clone(),
                    configuration: configuration.clone(),
                    message: format!("{err:#}"),
                });
                continue;
            }
        };

        // A diagnostic must point into the compilation it was computed from.
        if let Some(stray) = found.iter().find(|d| context.unit(&d.unit).is_none()) {
            out.failures.push(PipelineWarning::AnalyzerFailure {
                analyzer_id: analyzer.id().to_string(),
                unit: unit.id().clone(),
                configuration: configuration.clone(),
                message: format!("reported a diagnostic for unknown unit `{}`", stray.unit),
            });
            found.retain(|d| context.unit(&d.unit).is_some());
        }

        out.diagnostics.extend(found);
    }

    // Stable: equal spans keep the order the analyzer reported them in.
    out.diagnostics.sort_by_key(|d| {
        (
            context.unit_index(&d.unit).unwrap_or(usize::MAX),
            d.span.start,
            d.span.len,
        )
    });
    out
}
