use crate::edit::{Edit, Span};
use serde::{Deserialize, Serialize};

/// Stable identifier of a source unit inside a project (normally a root-relative path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component, used by file-name filters.
    pub fn file_name(&self) -> &str {
        self.0.rsplit(['/', '\\']).next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// What an analyzer advertises it can report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticDescriptor {
    pub id: String,
    pub title: String,
    pub severity: Severity,
}

impl DiagnosticDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            severity,
        }
    }

    /// Build a diagnostic for this descriptor at `span` in `unit`.
    pub fn at(&self, unit: &UnitId, span: Span) -> Diagnostic {
        Diagnostic {
            rule_id: self.id.clone(),
            severity: self.severity,
            message: self.title.clone(),
            unit: unit.clone(),
            span,
        }
    }
}

/// A located, rule-attributed finding. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic id; also the key fixers register for.
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub unit: UnitId,
    pub span: Span,
}

impl Diagnostic {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Edits a fixer proposes for one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixProposal {
    pub diagnostic_id: String,
    pub unit: UnitId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub edits: Vec<Edit>,
}

impl FixProposal {
    pub fn for_diagnostic(diagnostic: &Diagnostic, edits: Vec<Edit>) -> Self {
        Self {
            diagnostic_id: diagnostic.rule_id.clone(),
            unit: diagnostic.unit.clone(),
            title: None,
            edits,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(UnitId::new("src/a/B.cs").file_name(), "B.cs");
        assert_eq!(UnitId::new("src\\win\\C.cs").file_name(), "C.cs");
        assert_eq!(UnitId::new("D.cs").file_name(), "D.cs");
    }

    #[test]
    fn descriptor_builds_located_diagnostic() {
        let desc = DiagnosticDescriptor::new("FF0001", "Remove qualifier", Severity::Warning);
        let unit = UnitId::new("a.cs");
        let d = desc.at(&unit, Span::new(3, 4));
        assert_eq!(d.rule_id, "FF0001");
        assert_eq!(d.unit, unit);
        assert_eq!(d.span, Span::new(3, 4));
        assert_eq!(d.message, "Remove qualifier");
    }
}
