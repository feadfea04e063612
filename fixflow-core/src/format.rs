//! Settings-driven entry point shared by the CLI and embedders.
//!
//! Loads projects through a [`UnitSource`], applies the rule map and option bags to the
//! registry, runs the pipeline and, in check mode, collects what the analyzers still
//! report under every configuration.

use crate::error::PipelineError;
use crate::pipeline::{ConfigurationDiagnostics, Pipeline};
use crate::ports::{PersistenceSink, ProjectInput, ReportSink, UnitInput, UnitSource};
use crate::settings::{FormatSettings, RunMode};
use fixflow_domain::{RegistryError, RuleRegistry};
use fixflow_render::render_run_md;
use fixflow_rule_api::{AnalysisProvider, CancellationToken};
use fixflow_types::report::RunReport;
use std::sync::Arc;
use tracing::debug;

/// Outcome of [`run_format`].
#[derive(Debug)]
pub struct FormatOutcome {
    pub report: RunReport,
    /// Unified diff over every changed unit, in report order.
    pub patch: String,
    /// Markdown summary of the run.
    pub summary_md: String,
    /// Check mode only: diagnostics still reported after the run, per configuration.
    pub remaining: Vec<ConfigurationDiagnostics>,
    /// Check mode: something would change or stays unresolved.
    /// Format mode: something stays unresolved (conflicts, unfixable, failed units).
    pub needs_attention: bool,
}

/// Apply the rule map and option bags from `settings`.
///
/// Disables are applied before enables, so re-enabling a rule may take an order key
/// another rule just released.
pub fn apply_rule_settings(
    registry: &mut RuleRegistry,
    settings: &FormatSettings,
) -> Result<(), RegistryError> {
    for (id, _) in settings.rules.iter().filter(|(_, enabled)| !**enabled) {
        registry.toggle(id, false)?;
    }
    for (id, _) in settings.rules.iter().filter(|(_, enabled)| **enabled) {
        registry.toggle(id, true)?;
    }
    for (id, options) in &settings.rule_options {
        registry.set_options(id, options.clone())?;
    }
    Ok(())
}

/// Run the format (or check) pipeline.
///
/// Fails before any unit is processed on an unknown rule id, a duplicate order key, a
/// duplicate fixer mapping or an unreadable project.
pub fn run_format(
    settings: &FormatSettings,
    mut registry: RuleRegistry,
    provider: Arc<dyn AnalysisProvider>,
    source: &dyn UnitSource,
    persistence: Option<Arc<dyn PersistenceSink>>,
    events: Arc<dyn ReportSink>,
    cancel: &CancellationToken,
) -> Result<FormatOutcome, PipelineError> {
    apply_rule_settings(&mut registry, settings)?;

    let mut pipeline = Pipeline::new(registry.build(), provider)?
        .with_configurations(settings.configurations.iter().cloned())
        .with_file_names(settings.file_names.iter().cloned())
        .with_mode(settings.mode)
        .with_report_sink(events);
    if let Some(sink) = persistence {
        pipeline = pipeline.with_persistence(sink);
    }

    let projects = source.load_projects().map_err(PipelineError::UnitSource)?;
    debug!(
        projects = projects.len(),
        units = projects.iter().map(|p| p.units.len()).sum::<usize>(),
        "loaded projects"
    );

    let report = pipeline.run(&projects, cancel)?;

    let patch: String = report
        .units
        .iter()
        .filter_map(|u| u.change.as_ref())
        .map(|c| c.patch.as_str())
        .collect();

    let remaining = match settings.mode {
        RunMode::Check => pipeline
            .diagnose(&final_projects(&report), cancel)?
            .into_iter()
            .filter(|d| !d.diagnostics.is_empty())
            .collect(),
        RunMode::Format => Vec::new(),
    };

    let needs_attention = match settings.mode {
        RunMode::Check => {
            report.summary.units_changed > 0 || report.has_unresolved() || !remaining.is_empty()
        }
        RunMode::Format => report.has_unresolved(),
    };

    Ok(FormatOutcome {
        summary_md: render_run_md(&report),
        report,
        patch,
        remaining,
        needs_attention,
    })
}

/// Completed units with their final text, regrouped by project in report order.
fn final_projects(report: &RunReport) -> Vec<ProjectInput> {
    let mut projects: Vec<ProjectInput> = Vec::new();
    for unit in report.units.iter().filter(|u| u.is_done()) {
        let input = UnitInput {
            id: unit.unit.clone(),
            text: unit.text.clone(),
        };
        match projects.last_mut() {
            Some(project) if project.name == unit.project => project.units.push(input),
            _ => projects.push(ProjectInput {
                name: unit.project.clone(),
                units: vec![input],
            }),
        }
    }
    projects
}
