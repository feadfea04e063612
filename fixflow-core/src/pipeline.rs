//! The orchestrator: drives every unit of every project through the passes, once per
//! preprocessor configuration.
//!
//! Per configuration the order is fixed: derive units → syntax pass → local-semantic
//! pass → global-semantic pass (collect → dispatch → batch apply). Configuration `k`
//! starts from the units left by configuration `k - 1`, re-derived with only its own
//! symbols, so results merge back without any configuration observing another's
//! symbols. Structural passes never interleave with the global pass: diagnostics are
//! always computed over the unit text the batch is then applied to.

use crate::adapters::TracingReportSink;
use crate::error::PipelineError;
use crate::events::PipelineEvent;
use crate::ports::{PersistenceSink, ProjectInput, ReportSink};
use crate::settings::RunMode;
use chrono::Utc;
use fixflow_domain::{ConfigurationExpander, DiagnosticCollector, FixDispatchTable, RuleSet};
use fixflow_edit::{BatchFixApplier, file_change};
use fixflow_rule_api::{
    AnalysisProvider, CancellationToken, Cancelled, Facts, PreprocessorConfiguration,
    SourceUnit, call_plugin,
};
use fixflow_types::report::{
    PassKind, PassReport, PipelineWarning, RunReport, UnfixableDiagnostic, UnitReport,
    UnitStatus,
};
use fixflow_types::{Diagnostic, FixProposal, UnitId};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

/// Diagnostics still reported for a project under one configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationDiagnostics {
    pub project: String,
    pub configuration: String,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<PipelineWarning>,
}

/// An explicitly constructed pipeline context. Nothing survives between runs except
/// what the caller keeps.
pub struct Pipeline {
    rules: RuleSet,
    dispatch: FixDispatchTable,
    provider: Arc<dyn AnalysisProvider>,
    configurations: Vec<PreprocessorConfiguration>,
    events: Arc<dyn ReportSink>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    file_names: Vec<String>,
    mode: RunMode,
}

impl Pipeline {
    /// Fails when two fixers claim the same diagnostic id.
    pub fn new(rules: RuleSet, provider: Arc<dyn AnalysisProvider>) -> Result<Self, PipelineError> {
        let dispatch = FixDispatchTable::build(rules.fixers())?;
        Ok(Self {
            rules,
            dispatch,
            provider,
            configurations: Vec::new(),
            events: Arc::new(TracingReportSink),
            persistence: None,
            file_names: Vec::new(),
            mode: RunMode::Format,
        })
    }

    /// Configurations to run after the implicit base one.
    pub fn with_configurations(
        mut self,
        configurations: impl IntoIterator<Item = PreprocessorConfiguration>,
    ) -> Self {
        self.configurations = configurations.into_iter().collect();
        self
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn with_persistence(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.persistence = Some(sink);
        self
    }

    /// Only units whose file name matches one of `names` (case-insensitive) are rewritten,
    /// reported and persisted. Every unit still takes part in the project compilation.
    /// Empty means every unit.
    pub fn with_file_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.file_names = names.into_iter().collect();
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn emit(&self, event: PipelineEvent) {
        self.events.emit(&event);
    }

    fn accepts(&self, unit: &UnitId) -> bool {
        self.file_names.is_empty()
            || self
                .file_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(unit.file_name()))
    }

    /// Run every project through every pass under every configuration.
    ///
    /// Per-unit failures are report data. The only errors are cancellation (carrying
    /// the report so far) and nothing else: construction errors surfaced in [`Pipeline::new`].
    pub fn run(
        &self,
        projects: &[ProjectInput],
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let mut report = RunReport::new(Uuid::new_v4().to_string(), Utc::now().to_rfc3339());
        let expander =
            ConfigurationExpander::new(self.provider.as_ref(), self.configurations.iter().cloned());
        report.configurations = expander
            .configurations()
            .iter()
            .map(|c| c.name.clone())
            .collect();

        self.emit(PipelineEvent::RunStarted {
            run_id: report.run_id.clone(),
            projects: projects.len(),
            configurations: report.configurations.clone(),
        });

        let mut cancelled = false;
        for project in projects {
            let _span = info_span!("project", project = project.name.as_str()).entered();
            let mut states: Vec<UnitState> = project
                .units
                .iter()
                .map(|u| {
                    UnitState::new(&project.name, u.id.clone(), u.text.clone(), self.accepts(&u.id))
                })
                .collect();
            let selected = states.iter().filter(|s| s.selected).count();
            debug!(
                units = selected,
                context_only = states.len() - selected,
                "project loaded"
            );

            if let Err(Cancelled) = self.drive(project, &mut states, &expander, cancel) {
                for s in states.iter_mut().filter(|s| s.in_flight()) {
                    s.report.status = UnitStatus::Cancelled;
                }
                cancelled = true;
            }
            states.retain(|s| s.selected);
            self.finish_units(&project.name, &mut states, !cancelled);
            report.units.extend(states.into_iter().map(UnitState::into_report));
            if cancelled {
                break;
            }
        }

        report.cancelled = cancelled;
        report.summarize();
        report.duration_ms = elapsed_ms(started);
        report.ended_at = Some(Utc::now().to_rfc3339());
        self.emit(PipelineEvent::RunFinished {
            duration_ms: report.duration_ms,
            cancelled,
            summary: report.summary.clone(),
        });

        if cancelled {
            return Err(PipelineError::Cancelled {
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    fn drive(
        &self,
        project: &ProjectInput,
        states: &mut [UnitState],
        expander: &ConfigurationExpander<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        for cfg in expander.configurations() {
            cancel.check()?;
            let _span = info_span!("configuration", configuration = cfg.name.as_str()).entered();

            let derived = states
                .par_iter_mut()
                .filter(|s| s.in_flight())
                .try_for_each(|s| self.derive(s, expander, cfg, cancel));
            derived?;

            self.structural_pass(&project.name, states, cfg, PassKind::Syntax, cancel)?;
            self.structural_pass(&project.name, states, cfg, PassKind::LocalSemantic, cancel)?;
            let global = self.global_pass(&project.name, states, cfg, cancel);
            self.flush_warnings(states);
            global?;
        }
        Ok(())
    }

    fn derive(
        &self,
        state: &mut UnitState,
        expander: &ConfigurationExpander<'_>,
        cfg: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let result = match &state.current {
            Some(unit) => call_plugin(|| expander.derive_unit(unit, cfg, cancel)),
            None => call_plugin(|| {
                self.provider
                    .parse(&state.report.unit, &state.original, cfg, cancel)
            }),
        };
        match result {
            Ok(unit) => state.current = Some(unit),
            Err(err) => {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                state.fail(format!("parse under `{}`: {err:#}", cfg.name));
            }
        }
        Ok(())
    }

    fn structural_pass(
        &self,
        project: &str,
        states: &mut [UnitState],
        cfg: &PreprocessorConfiguration,
        kind: PassKind,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let has_rules = match kind {
            PassKind::Syntax => !self.rules.syntax_rules().is_empty(),
            PassKind::LocalSemantic => !self.rules.local_rules().is_empty(),
            PassKind::GlobalSemantic => false,
        };
        if !has_rules {
            return Ok(());
        }

        let units = states.iter().filter(|s| s.rewritable()).count();
        self.emit(PipelineEvent::PassStarted {
            project: project.to_string(),
            configuration: cfg.name.clone(),
            kind,
            units,
        });
        let started = Instant::now();

        let result = states
            .par_iter_mut()
            .filter(|s| s.rewritable())
            .try_for_each(|s| match kind {
                PassKind::Syntax => self.syntax_rules(s, cfg, cancel),
                _ => self.local_rules(s, cfg, cancel),
            });
        self.flush_warnings(states);
        result?;

        self.emit(PipelineEvent::PassFinished {
            project: project.to_string(),
            configuration: cfg.name.clone(),
            kind,
            units,
            duration_ms: elapsed_ms(started),
        });
        Ok(())
    }

    fn syntax_rules(
        &self,
        state: &mut UnitState,
        cfg: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let started = Instant::now();
        let mut pass = PassReport::new(PassKind::Syntax, &cfg.name);

        for rule in self.rules.syntax_rules() {
            cancel.check()?;
            let Some(unit) = state.current.clone() else {
                break;
            };
            match call_plugin(|| rule.rule.process(&unit, &rule.options)) {
                Ok(Some(text)) if text != unit.text() => {
                    if !self.replace(state, &unit, &text, rule.id(), cancel)? {
                        break;
                    }
                    pass.rules_applied.push(rule.id().to_string());
                }
                Ok(_) => {}
                Err(err) => state.rule_failed(rule.id(), &cfg.name, &err),
            }
        }

        pass.duration_ms = elapsed_ms(started);
        state.report.passes.push(pass);
        Ok(())
    }

    fn local_rules(
        &self,
        state: &mut UnitState,
        cfg: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        let started = Instant::now();
        let mut pass = PassReport::new(PassKind::LocalSemantic, &cfg.name);
        // Computed lazily, invalidated whenever a rule changes the unit.
        let mut semantics: Option<Facts> = None;

        for rule in self.rules.local_rules() {
            cancel.check()?;
            let Some(unit) = state.current.clone() else {
                break;
            };
            let facts = match &semantics {
                Some(facts) => facts.clone(),
                None => match call_plugin(|| self.provider.unit_semantics(&unit, cancel)) {
                    Ok(facts) => {
                        semantics = Some(facts.clone());
                        facts
                    }
                    Err(err) => {
                        if cancel.is_cancelled() {
                            return Err(Cancelled);
                        }
                        state.fail(format!("semantic model under `{}`: {err:#}", cfg.name));
                        break;
                    }
                },
            };

            match call_plugin(|| rule.rule.process(&unit, &facts, &rule.options, cancel)) {
                Ok(Some(text)) if text != unit.text() => {
                    if !self.replace(state, &unit, &text, rule.id(), cancel)? {
                        break;
                    }
                    semantics = None;
                    pass.rules_applied.push(rule.id().to_string());
                }
                Ok(_) => {}
                Err(err) => {
                    if cancel.is_cancelled() {
                        return Err(Cancelled);
                    }
                    state.rule_failed(rule.id(), &cfg.name, &err);
                }
            }
        }

        pass.duration_ms = elapsed_ms(started);
        state.report.passes.push(pass);
        Ok(())
    }

    /// Swap in a new snapshot for `text`. Returns false when the provider could not
    /// parse it; the unit is then failed.
    fn replace(
        &self,
        state: &mut UnitState,
        unit: &SourceUnit,
        text: &str,
        produced_by: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, Cancelled> {
        match call_plugin(|| self.provider.reparse(unit, text, cancel)) {
            Ok(next) => {
                state.current = Some(next);
                Ok(true)
            }
            Err(err) => {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                state.fail(format!("reparse after `{produced_by}`: {err:#}"));
                Ok(false)
            }
        }
    }

    fn global_pass(
        &self,
        project: &str,
        states: &mut [UnitState],
        cfg: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        if self.rules.analyzers().is_empty() || !states.iter().any(UnitState::rewritable) {
            return Ok(());
        }
        // The compilation always covers the whole project; the filter only narrows what is fixed.
        let units: Vec<SourceUnit> = states
            .iter()
            .filter(|s| s.in_flight())
            .filter_map(|s| s.current.clone())
            .collect();

        cancel.check()?;
        let started = Instant::now();
        self.emit(PipelineEvent::PassStarted {
            project: project.to_string(),
            configuration: cfg.name.clone(),
            kind: PassKind::GlobalSemantic,
            units: units.len(),
        });

        let context = match call_plugin(|| self.provider.compile(project, &units, cfg, cancel)) {
            Ok(context) => context,
            Err(err) => {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                let reason = format!("compile `{project}` under `{}`: {err:#}", cfg.name);
                warn!(configuration = cfg.name.as_str(), "{reason}");
                for s in states.iter_mut().filter(|s| s.rewritable()) {
                    s.fail(reason.clone());
                }
                return Ok(());
            }
        };

        let collected = DiagnosticCollector::new(self.rules.analyzers()).collect(&context, cancel)?;
        self.emit(PipelineEvent::DiagnosticsCollected {
            project: project.to_string(),
            configuration: cfg.name.clone(),
            count: collected.diagnostics.len(),
        });
        let dispatched = self.dispatch.dispatch_all(&collected.diagnostics, &context);

        let index: BTreeMap<UnitId, usize> = states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.selected)
            .map(|(i, s)| (s.report.unit.clone(), i))
            .collect();
        for warning in collected.failures.into_iter().chain(dispatched.failures) {
            if let Some(&i) = index.get(warning.unit()) {
                states[i].report.warnings.push(warning);
            }
        }
        for diagnostic in dispatched.unfixable {
            if let Some(&i) = index.get(&diagnostic.unit) {
                self.emit(PipelineEvent::UnfixableDiagnostic {
                    diagnostic: diagnostic.clone(),
                    configuration: cfg.name.clone(),
                });
                states[i].report.unfixable.push(UnfixableDiagnostic {
                    diagnostic,
                    configuration: cfg.name.clone(),
                });
            }
        }

        let mut by_unit: BTreeMap<UnitId, Vec<FixProposal>> = BTreeMap::new();
        for proposal in dispatched.proposals {
            by_unit.entry(proposal.unit.clone()).or_default().push(proposal);
        }

        // Serialized per unit: each unit's batch lands before the next configuration reads it.
        for state in states.iter_mut().filter(|s| s.rewritable()) {
            cancel.check()?;
            let Some(unit) = state.current.clone() else {
                continue;
            };
            let mut pass = PassReport::new(PassKind::GlobalSemantic, &cfg.name);
            pass.diagnostics = collected
                .diagnostics
                .iter()
                .filter(|d| &d.unit == unit.id())
                .count() as u64;

            let proposals = by_unit.remove(unit.id()).unwrap_or_default();
            let outcome = BatchFixApplier::apply(unit.id(), unit.text(), &proposals);
            pass.edits_applied = outcome.accepted.len() as u64;
            for accepted in &outcome.accepted {
                if !pass.rules_applied.contains(&accepted.diagnostic_id) {
                    pass.rules_applied.push(accepted.diagnostic_id.clone());
                }
            }
            for conflict in &outcome.conflicts {
                self.emit(PipelineEvent::ConflictingFix {
                    conflict: conflict.clone(),
                });
            }
            let changed = outcome.changed(unit.text());
            state.report.conflicts.extend(outcome.conflicts);
            if changed {
                self.replace(state, &unit, &outcome.text, "batch fix", cancel)?;
            }
            pass.duration_ms = elapsed_ms(started);
            state.report.passes.push(pass);
        }

        self.emit(PipelineEvent::PassFinished {
            project: project.to_string(),
            configuration: cfg.name.clone(),
            kind: PassKind::GlobalSemantic,
            units: units.len(),
            duration_ms: elapsed_ms(started),
        });
        Ok(())
    }

    /// Emit warnings recorded since the last flush, in unit order.
    fn flush_warnings(&self, states: &mut [UnitState]) {
        for state in states.iter_mut() {
            for warning in &state.report.warnings[state.warnings_emitted..] {
                self.emit(PipelineEvent::Warning {
                    warning: warning.clone(),
                });
            }
            state.warnings_emitted = state.report.warnings.len();
        }
    }

    /// Record changes, persist when allowed and emit per-unit outcomes.
    fn finish_units(&self, project: &str, states: &mut [UnitState], persist: bool) {
        for state in states.iter_mut() {
            if state.report.is_done() {
                let text = state.final_text().to_string();
                if text != state.original {
                    state.report.change =
                        file_change(&patch_path(project, &state.report.unit), &state.original, &text);
                    state.report.changed = true;
                    if persist && self.mode == RunMode::Format {
                        if let Some(sink) = &self.persistence {
                            if let Err(err) = sink.persist(project, &state.report.unit, &text) {
                                state.fail(format!("persist: {err:#}"));
                                state.report.change = None;
                                state.report.changed = false;
                            }
                        }
                    }
                }
            }
            state.report.duration_ms = elapsed_ms(state.started);

            match &state.report.status {
                UnitStatus::Done => self.emit(PipelineEvent::UnitFinished {
                    project: project.to_string(),
                    unit: state.report.unit.clone(),
                    changed: state.report.changed,
                    duration_ms: state.report.duration_ms,
                }),
                UnitStatus::Failed { reason } => self.emit(PipelineEvent::UnitFailed {
                    project: project.to_string(),
                    unit: state.report.unit.clone(),
                    reason: reason.clone(),
                }),
                UnitStatus::Cancelled => {}
            }
        }
    }

    /// Diagnostics the enabled analyzers still report for `projects`, per configuration,
    /// without fixing anything. Configurations are derived lazily from the base compilation.
    pub fn diagnose(
        &self,
        projects: &[ProjectInput],
        cancel: &CancellationToken,
    ) -> Result<Vec<ConfigurationDiagnostics>, PipelineError> {
        let expander =
            ConfigurationExpander::new(self.provider.as_ref(), self.configurations.iter().cloned());
        let mut out = Vec::new();
        for project in projects {
            match self.diagnose_project(project, &expander, cancel) {
                Ok(mut found) => out.append(&mut found),
                Err(Cancelled) => {
                    let mut report =
                        RunReport::new(Uuid::new_v4().to_string(), Utc::now().to_rfc3339());
                    report.cancelled = true;
                    return Err(PipelineError::Cancelled {
                        report: Box::new(report),
                    });
                }
            }
        }
        Ok(out)
    }

    fn diagnose_project(
        &self,
        project: &ProjectInput,
        expander: &ConfigurationExpander<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConfigurationDiagnostics>, Cancelled> {
        let base = PreprocessorConfiguration::base();
        let mut units = Vec::new();
        for input in &project.units {
            cancel.check()?;
            match call_plugin(|| self.provider.parse(&input.id, &input.text, &base, cancel)) {
                Ok(unit) => units.push(unit),
                Err(err) => {
                    if cancel.is_cancelled() {
                        return Err(Cancelled);
                    }
                    warn!(unit = %input.id, "skipping unit: {err:#}");
                }
            }
        }
        if units.is_empty() || self.rules.analyzers().is_empty() {
            return Ok(Vec::new());
        }

        let base_context =
            match call_plugin(|| self.provider.compile(&project.name, &units, &base, cancel)) {
                Ok(context) => context,
                Err(err) => {
                    if cancel.is_cancelled() {
                        return Err(Cancelled);
                    }
                    warn!(project = project.name.as_str(), "skipping project: {err:#}");
                    return Ok(Vec::new());
                }
            };

        let collector = DiagnosticCollector::new(self.rules.analyzers());
        let mut out = Vec::new();
        for (cfg, context) in expander.expand(&base_context, cancel) {
            cancel.check()?;
            let context = match context {
                Ok(context) => context,
                Err(err) => {
                    if cancel.is_cancelled() {
                        return Err(Cancelled);
                    }
                    warn!(configuration = cfg.name.as_str(), "skipping configuration: {err:#}");
                    continue;
                }
            };
            let collected = collector.collect(&context, cancel)?;
            out.push(ConfigurationDiagnostics {
                project: project.name.clone(),
                configuration: cfg.name,
                diagnostics: collected
                    .diagnostics
                    .into_iter()
                    .filter(|d| self.accepts(&d.unit))
                    .collect(),
                failures: collected
                    .failures
                    .into_iter()
                    .filter(|f| self.accepts(f.unit()))
                    .collect(),
            });
        }
        Ok(out)
    }
}

struct UnitState {
    report: UnitReport,
    original: String,
    /// Latest snapshot; `None` before the first parse and after failure.
    current: Option<SourceUnit>,
    started: Instant,
    warnings_emitted: usize,
    /// Passes the file-name filter. Unselected units are parsed and compiled but never
    /// rewritten or reported.
    selected: bool,
}

impl UnitState {
    fn new(project: &str, id: UnitId, text: String, selected: bool) -> Self {
        Self {
            report: UnitReport::new(id, project, String::new()),
            original: text,
            current: None,
            started: Instant::now(),
            warnings_emitted: 0,
            selected,
        }
    }

    fn in_flight(&self) -> bool {
        self.report.is_done()
    }

    fn rewritable(&self) -> bool {
        self.selected && self.in_flight()
    }

    fn fail(&mut self, reason: String) {
        debug!(unit = %self.report.unit, "unit failed: {reason}");
        self.report.status = UnitStatus::Failed { reason };
        self.current = None;
    }

    fn rule_failed(&mut self, rule_id: &str, configuration: &str, err: &anyhow::Error) {
        self.report.warnings.push(PipelineWarning::RuleFailure {
            rule_id: rule_id.to_string(),
            unit: self.report.unit.clone(),
            configuration: configuration.to_string(),
            message: format!("{err:#}"),
        });
    }

    /// Final text if the unit completed, the original text otherwise.
    fn final_text(&self) -> &str {
        match (&self.report.status, &self.current) {
            (UnitStatus::Done, Some(unit)) => unit.text(),
            _ => &self.original,
        }
    }

    fn into_report(mut self) -> UnitReport {
        self.report.text = self.final_text().to_string();
        self.report
    }
}

/// Path used in patches: the unit id, below its project unless the project is the
/// working directory.
fn patch_path(project: &str, unit: &UnitId) -> String {
    match project.trim_end_matches('/') {
        "" | "." => unit.to_string(),
        root => format!("{root}/{unit}"),
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
