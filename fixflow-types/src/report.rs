use crate::diagnostic::{Diagnostic, UnitId};
use crate::edit::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub run_id: String,
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default)]
    pub duration_ms: u64,

    #[serde(default)]
    pub configurations: Vec<String>,

    #[serde(default)]
    pub units: Vec<UnitReport>,

    #[serde(default)]
    pub cancelled: bool,

    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(run_id: String, started_at: String) -> Self {
        Self {
            schema: crate::schema::FIXFLOW_RUN_REPORT_V1.to_string(),
            run_id,
            started_at,
            ended_at: None,
            duration_ms: 0,
            configurations: vec![],
            units: vec![],
            cancelled: false,
            summary: RunSummary::default(),
        }
    }

    pub fn unit(&self, id: &UnitId) -> Option<&UnitReport> {
        self.units.iter().find(|u| &u.unit == id)
    }

    /// Recompute `summary` from `units`.
    pub fn summarize(&mut self) {
        let mut summary = RunSummary {
            units_total: self.units.len() as u64,
            ..RunSummary::default()
        };
        for u in &self.units {
            match u.status {
                UnitStatus::Done => {}
                UnitStatus::Failed { .. } => summary.units_failed += 1,
                UnitStatus::Cancelled => summary.units_cancelled += 1,
            }
            if u.changed {
                summary.units_changed += 1;
            }
            summary.diagnostics += u.passes.iter().map(|p| p.diagnostics).sum::<u64>();
            summary.edits_applied += u.passes.iter().map(|p| p.edits_applied).sum::<u64>();
            summary.conflicts += u.conflicts.len() as u64;
            summary.unfixable += u.unfixable.len() as u64;
            summary.warnings += u.warnings.len() as u64;
        }
        self.summary = summary;
    }

    /// Whether the run left anything for a human to look at.
    pub fn has_unresolved(&self) -> bool {
        self.summary.conflicts > 0 || self.summary.unfixable > 0 || self.summary.units_failed > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub units_total: u64,
    pub units_changed: u64,
    pub units_failed: u64,

    #[serde(default)]
    pub units_cancelled: u64,

    pub diagnostics: u64,
    pub edits_applied: u64,
    pub conflicts: u64,
    pub unfixable: u64,
    pub warnings: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: UnitId,
    pub project: String,
    pub status: UnitStatus,
    pub changed: bool,

    /// Final text of the unit. Not serialized; persistence owns the bytes.
    #[serde(skip)]
    pub text: String,

    #[serde(default)]
    pub passes: Vec<PassReport>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictingFix>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unfixable: Vec<UnfixableDiagnostic>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PipelineWarning>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<FileChange>,

    #[serde(default)]
    pub duration_ms: u64,
}

impl UnitReport {
    pub fn new(unit: UnitId, project: impl Into<String>, text: String) -> Self {
        Self {
            unit,
            project: project.into(),
            status: UnitStatus::Done,
            changed: false,
            text,
            passes: vec![],
            conflicts: vec![],
            unfixable: vec![],
            warnings: vec![],
            change: None,
            duration_ms: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, UnitStatus::Done)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UnitStatus {
    Done,
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Syntax,
    LocalSemantic,
    GlobalSemantic,
}

impl PassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PassKind::Syntax => "syntax",
            PassKind::LocalSemantic => "local_semantic",
            PassKind::GlobalSemantic => "global_semantic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub kind: PassKind,
    pub configuration: String,
    pub duration_ms: u64,

    /// Rules whose output changed the unit, in invocation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_applied: Vec<String>,

    #[serde(default)]
    pub diagnostics: u64,

    #[serde(default)]
    pub edits_applied: u64,
}

impl PassReport {
    pub fn new(kind: PassKind, configuration: impl Into<String>) -> Self {
        Self {
            kind,
            configuration: configuration.into(),
            duration_ms: 0,
            rules_applied: vec![],
            diagnostics: 0,
            edits_applied: 0,
        }
    }
}

/// A proposed edit that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingFix {
    pub diagnostic_id: String,
    pub unit: UnitId,
    pub span: Span,
    pub reason: ConflictReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictReason {
    /// Overlaps an edit that was accepted earlier in the same batch.
    Overlap {
        accepted_diagnostic_id: String,
        accepted_span: Span,
    },
    /// Span is outside the text or splits a character.
    InvalidEdit { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfixableDiagnostic {
    pub diagnostic: Diagnostic,
    pub configuration: String,
}

/// Recovered failures of plug-in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineWarning {
    AnalyzerFailure {
        analyzer_id: String,
        unit: UnitId,
        configuration: String,
        message: String,
    },
    FixerFailure {
        fixer_id: String,
        diagnostic_id: String,
        unit: UnitId,
        message: String,
    },
    RuleFailure {
        rule_id: String,
        unit: UnitId,
        configuration: String,
        message: String,
    },
}

impl PipelineWarning {
    pub fn unit(&self) -> &UnitId {
        match self {
            PipelineWarning::AnalyzerFailure { unit, .. }
            | PipelineWarning::FixerFailure { unit, .. }
            | PipelineWarning::RuleFailure { unit, .. } => unit,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PipelineWarning::AnalyzerFailure { .. } => "analyzer_failure",
            PipelineWarning::FixerFailure { .. } => "fixer_failure",
            PipelineWarning::RuleFailure { .. } => "rule_failure",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PipelineWarning::AnalyzerFailure { message, .. }
            | PipelineWarning::FixerFailure { message, .. }
            | PipelineWarning::RuleFailure { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub before_sha256: String,
    pub after_sha256: String,
    pub before_bytes: u64,
    pub after_bytes: u64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub patch: String,
}
