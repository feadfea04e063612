//! Port traits abstracting all I/O away from the pipeline.

use crate::events::PipelineEvent;
use fixflow_types::UnitId;

/// One project: a named set of units compiled together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInput {
    pub name: String,
    pub units: Vec<UnitInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInput {
    pub id: UnitId,
    pub text: String,
}

impl UnitInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(id),
            text: text.into(),
        }
    }
}

/// Source of projects and their unit texts.
pub trait UnitSource {
    fn load_projects(&self) -> anyhow::Result<Vec<ProjectInput>>;
}

/// Receives the final text of every unit the run changed.
pub trait PersistenceSink: Send + Sync {
    fn persist(&self, project: &str, unit: &UnitId, text: &str) -> anyhow::Result<()>;
}

/// Receives structured pipeline events.
pub trait ReportSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}
