use crate::error::DispatchError;
use fixflow_rule_api::{
    CompilationContext, Diagnostic, FixProposal, Fixer, call_plugin,
};
use fixflow_types::report::PipelineWarning;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of dispatching one diagnostic.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The mapped fixer ran. An empty vector means it found no safe correction.
    Proposed(Vec<FixProposal>),
    /// No fixer claims this diagnostic id.
    Unfixable,
    /// The mapped fixer failed (error or panic).
    Failed(PipelineWarning),
}

/// Aggregated outcome of dispatching a pass's diagnostics, in diagnostic order.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub proposals: Vec<FixProposal>,
    pub unfixable: Vec<Diagnostic>,
    pub failures: Vec<PipelineWarning>,
}

/// Diagnostic id → fixer, built once per run.
pub struct FixDispatchTable {
    fixers: Vec<Arc<dyn Fixer>>,
    by_diagnostic: BTreeMap<String, usize>,
}

impl FixDispatchTable {
    /// Fails when two fixers claim the same diagnostic id. A fixer repeating an id in its
    /// own list is not a conflict.
    pub fn build(fixers: &[Arc<dyn Fixer>]) -> Result<Self, DispatchError> {
        let mut by_diagnostic: BTreeMap<String, usize> = BTreeMap::new();
        for (idx, fixer) in fixers.iter().enumerate() {
            for diagnostic_id in fixer.fixable_diagnostic_ids() {
                match by_diagnostic.get(&diagnostic_id) {
                    Some(&owner) if owner != idx => {
                        return Err(DispatchError::DuplicateFixerMapping {
                            diagnostic_id,
                            first: fixers[owner].id().to_string(),
                            second: fixer.id().to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        by_diagnostic.insert(diagnostic_id, idx);
                    }
                }
            }
        }
        debug!(
            fixers = fixers.len(),
            diagnostic_ids = by_diagnostic.len(),
            "built fix dispatch table"
        );
        Ok(Self {
            fixers: fixers.to_vec(),
            by_diagnostic,
        })
    }

    pub fn fixer_for(&self, diagnostic_id: &str) -> Option<&dyn Fixer> {
        self.by_diagnostic
            .get(diagnostic_id)
            .map(|&idx| self.fixers[idx].as_ref())
    }

    /// Every diagnostic id that has a fixer, sorted.
    pub fn diagnostic_ids(&self) -> impl Iterator<Item = &str> {
        self.by_diagnostic.keys().map(String::as_str)
    }

    pub fn dispatch(&self, diagnostic: &Diagnostic, context: &CompilationContext) -> DispatchOutcome {
        let Some(fixer) = self.fixer_for(&diagnostic.rule_id) else {
            return DispatchOutcome::Unfixable;
        };
        let failed = |message: String| {
            warn!(
                fixer = fixer.id(),
                diagnostic = diagnostic.rule_id.as_str(),
                unit = %diagnostic.unit,
                "fixer failed: {message}"
            );
            DispatchOutcome::Failed(PipelineWarning::FixerFailure {
                fixer_id: fixer.id().to_string(),
                diagnostic_id: diagnostic.rule_id.clone(),
                unit: diagnostic.unit.clone(),
                message,
            })
        };

        let Some(unit) = context.unit(&diagnostic.unit) else {
            return failed(format!("unit `{}` is not part of the compilation", diagnostic.unit));
        };

        match call_plugin(|| fixer.propose(diagnostic, unit, context)) {
            Ok(mut proposals) => {
                if let Some(stray) = proposals.iter().find(|p| context.unit(&p.unit).is_none()) {
                    return failed(format!("proposed edits for unknown unit `{}`", stray.unit));
                }
                // Conflicts are attributed to the diagnostic that was dispatched.
                for p in &mut proposals {
                    p.diagnostic_id.clone_from(&diagnostic.rule_id);
                }
                DispatchOutcome::Proposed(proposals)
            }
            Err(err) => failed(format!("{err:#}")),
        }
    }

    /// Dispatch every diagnostic. Fixers run concurrently; the report keeps diagnostic order.
    pub fn dispatch_all(&self, diagnostics: &[Diagnostic], context: &CompilationContext) -> DispatchReport {
        let outcomes: Vec<DispatchOutcome> = diagnostics
            .par_iter()
            .map(|d| self.dispatch(d, context))
            .collect();

        let mut report = DispatchReport::default();
        for (diagnostic, outcome) in diagnostics.iter().zip(outcomes) {
            match outcome {
                DispatchOutcome::Proposed(mut proposals) => report.proposals.append(&mut proposals),
                DispatchOutcome::Unfixable => report.unfixable.push(diagnostic.clone()),
                DispatchOutcome::Failed(warning) => report.failures.push(warning),
            }
        }
        report
    }
}

impl std::fmt::Debug for FixDispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map: BTreeMap<&str, &str> = self
            .by_diagnostic
            .iter()
            .map(|(k, &idx)| (k.as_str(), self.fixers[idx].id()))
            .collect();
        f.debug_struct("FixDispatchTable").field("by_diagnostic", &map).finish()
    }
}
