//! Structured pipeline events: what happened, as data. Formatting belongs to the sink.

use fixflow_types::report::{ConflictingFix, PassKind, PipelineWarning, RunSummary};
use fixflow_types::{Diagnostic, UnitId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: String,
        projects: usize,
        configurations: Vec<String>,
    },
    PassStarted {
        project: String,
        configuration: String,
        kind: PassKind,
        units: usize,
    },
    PassFinished {
        project: String,
        configuration: String,
        kind: PassKind,
        units: usize,
        duration_ms: u64,
    },
    DiagnosticsCollected {
        project: String,
        configuration: String,
        count: usize,
    },
    ConflictingFix {
        conflict: ConflictingFix,
    },
    UnfixableDiagnostic {
        diagnostic: Diagnostic,
        configuration: String,
    },
    Warning {
        warning: PipelineWarning,
    },
    UnitFailed {
        project: String,
        unit: UnitId,
        reason: String,
    },
    UnitFinished {
        project: String,
        unit: UnitId,
        changed: bool,
        duration_ms: u64,
    },
    RunFinished {
        duration_ms: u64,
        cancelled: bool,
        summary: RunSummary,
    },
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. } => "run_started",
            PipelineEvent::PassStarted { .. } => "pass_started",
            PipelineEvent::PassFinished { .. } => "pass_finished",
            PipelineEvent::DiagnosticsCollected { .. } => "diagnostics_collected",
            PipelineEvent::ConflictingFix { .. } => "conflicting_fix",
            PipelineEvent::UnfixableDiagnostic { .. } => "unfixable_diagnostic",
            PipelineEvent::Warning { .. } => "warning",
            PipelineEvent::UnitFailed { .. } => "unit_failed",
            PipelineEvent::UnitFinished { .. } => "unit_finished",
            PipelineEvent::RunFinished { .. } => "run_finished",
        }
    }

    /// Whether a human should look at this event.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            PipelineEvent::ConflictingFix { .. }
                | PipelineEvent::UnfixableDiagnostic { .. }
                | PipelineEvent::Warning { .. }
                | PipelineEvent::UnitFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = PipelineEvent::DiagnosticsCollected {
            project: "p".into(),
            configuration: "default".into(),
            count: 2,
        };
        let json = serde_json::to_value(&ev).expect("serialize");
        assert_eq!(json["event"], ev.name());
        assert_eq!(json["count"], 2);
        assert!(!ev.is_warning());
    }
}
