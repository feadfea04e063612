//! Default port implementations: filesystem, in-memory and `tracing`.

use crate::events::PipelineEvent;
use crate::ports::{PersistenceSink, ProjectInput, ReportSink, UnitInput, UnitSource};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fixflow_types::UnitId;
use fs_err as fs;
use glob::glob;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Loads one project per root directory, picking units by glob pattern.
///
/// Unit ids are root-relative paths with `/` separators; units are sorted by id so the
/// project order never depends on directory iteration order.
#[derive(Debug, Clone)]
pub struct FsUnitSource {
    pub roots: Vec<Utf8PathBuf>,
    pub include: Vec<String>,
}

impl FsUnitSource {
    pub fn new(roots: Vec<Utf8PathBuf>, include: Vec<String>) -> Self {
        Self { roots, include }
    }

    fn load_project(&self, root: &Utf8Path) -> anyhow::Result<ProjectInput> {
        if !root.is_dir() {
            anyhow::bail!("project root {} is not a directory", root);
        }

        let mut files = BTreeSet::new();
        for pattern in &self.include {
            let full = format!("{}/{}", glob::Pattern::escape(root.as_str()), pattern);
            debug!(pattern = %full, "scanning for units");
            for entry in glob(&full).with_context(|| format!("glob {full}"))? {
                let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
                let path = Utf8PathBuf::from_path_buf(path)
                    .map_err(|p| anyhow::anyhow!("non UTF-8 path {}", p.display()))?;
                if path.is_file() {
                    files.insert(path);
                }
            }
        }

        let mut units = Vec::with_capacity(files.len());
        for path in files {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            let id = rel.as_str().replace('\\', "/");
            let text = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
            units.push(UnitInput::new(id, text));
        }
        units.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(ProjectInput {
            name: root.to_string(),
            units,
        })
    }
}

impl UnitSource for FsUnitSource {
    fn load_projects(&self) -> anyhow::Result<Vec<ProjectInput>> {
        self.roots.iter().map(|root| self.load_project(root)).collect()
    }
}

/// In-memory unit source for embedding and testing. Units are sorted by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitSource {
    projects: Vec<ProjectInput>,
}

impl InMemoryUnitSource {
    pub fn new(mut projects: Vec<ProjectInput>) -> Self {
        for p in &mut projects {
            p.units.sort_by(|a, b| a.id.cmp(&b.id));
        }
        Self { projects }
    }
}

impl UnitSource for InMemoryUnitSource {
    fn load_projects(&self) -> anyhow::Result<Vec<ProjectInput>> {
        Ok(self.projects.clone())
    }
}

/// Writes units back below their project root (the project name is the root path).
#[derive(Debug, Clone, Default)]
pub struct FsPersistenceSink;

impl PersistenceSink for FsPersistenceSink {
    fn persist(&self, project: &str, unit: &UnitId, text: &str) -> anyhow::Result<()> {
        let path = Utf8Path::new(project).join(unit.as_str());
        fs::write(&path, text).with_context(|| format!("write {}", path))?;
        debug!(path = %path, "persisted unit");
        Ok(())
    }
}

/// Keeps persisted texts in memory, keyed by (project, unit).
#[derive(Debug, Default)]
pub struct MemoryPersistenceSink {
    written: Mutex<BTreeMap<(String, UnitId), String>>,
}

impl MemoryPersistenceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> BTreeMap<(String, UnitId), String> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl PersistenceSink for MemoryPersistenceSink {
    fn persist(&self, project: &str, unit: &UnitId, text: &str) -> anyhow::Result<()> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| anyhow::anyhow!("persistence sink poisoned"))?;
        written.insert((project.to_string(), unit.clone()), text.to_string());
        Ok(())
    }
}

/// Forwards events to `tracing`: warnings for anything a human should look at, `info`
/// for run boundaries, `debug` for the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::ConflictingFix { conflict } => warn!(
                unit = %conflict.unit,
                diagnostic = conflict.diagnostic_id.as_str(),
                span = %conflict.span,
                "conflicting fix not applied"
            ),
            PipelineEvent::UnfixableDiagnostic {
                diagnostic,
                configuration,
            } => warn!(
                unit = %diagnostic.unit,
                diagnostic = diagnostic.rule_id.as_str(),
                span = %diagnostic.span,
                configuration = configuration.as_str(),
                "no fixer for diagnostic"
            ),
            PipelineEvent::Warning { warning } => warn!(
                unit = %warning.unit(),
                code = warning.code(),
                "{}",
                warning.message()
            ),
            PipelineEvent::UnitFailed {
                project,
                unit,
                reason,
            } => warn!(project = project.as_str(), unit = %unit, "unit failed: {reason}"),
            PipelineEvent::RunStarted {
                run_id,
                projects,
                configurations,
            } => info!(
                run_id = run_id.as_str(),
                projects,
                configurations = ?configurations,
                "run started"
            ),
            PipelineEvent::RunFinished {
                duration_ms,
                cancelled,
                summary,
            } => info!(
                duration_ms,
                cancelled,
                units = summary.units_total,
                changed = summary.units_changed,
                failed = summary.units_failed,
                "run finished"
            ),
            other => debug!(event = other.name(), "{}", describe(other)),
        }
    }
}

fn describe(event: &PipelineEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| event.name().to_string())
}

/// Records every event; for tests and embedders that render reports themselves.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemoryReportSink {
    fn emit(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
