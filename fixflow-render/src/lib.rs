//! Rendering helpers (markdown and plain text) for human-readable output.

use fixflow_types::report::{ConflictReason, RunReport, UnitReport, UnitStatus};
use fixflow_types::{DiagnosticDescriptor, RuleMeta};

pub fn render_run_md(report: &RunReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("# fixflow run\n\n");
    out.push_str(&format!(
        "- Units: {} (changed {}, failed {}, cancelled {})\n",
        s.units_total, s.units_changed, s.units_failed, s.units_cancelled
    ));
    out.push_str(&format!(
        "- Diagnostics: {} (edits applied {})\n",
        s.diagnostics, s.edits_applied
    ));
    out.push_str(&format!(
        "- Conflicts: {}\n- Unfixable: {}\n- Warnings: {}\n",
        s.conflicts, s.unfixable, s.warnings
    ));
    out.push_str(&format!(
        "- Configurations: {}\n",
        if report.configurations.is_empty() {
            "-".to_string()
        } else {
            report.configurations.join(", ")
        }
    ));
    out.push_str(&format!("- Duration: {} ms\n", report.duration_ms));
    if report.cancelled {
        out.push_str("- Cancelled: `true`\n");
    }
    out.push('\n');

    out.push_str("## Units\n\n");
    if report.units.is_empty() {
        out.push_str("_No units processed._\n");
        return out;
    }

    for (i, unit) in report.units.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, unit_label(unit)));
        out.push_str(&format!("- Status: `{}`\n", status_label(&unit.status)));
        if let UnitStatus::Failed { reason } = &unit.status {
            out.push_str(&format!("- Reason: {}\n", reason));
        }
        out.push_str(&format!("- Changed: `{}`\n", unit.changed));
        if let Some(change) = &unit.change {
            out.push_str(&format!(
                "- sha256: {} → {}\n",
                short(&change.before_sha256),
                short(&change.after_sha256)
            ));
        }
        out.push_str(&format!("- Duration: {} ms\n", unit.duration_ms));

        if !unit.conflicts.is_empty() {
            out.push_str("\n**Conflicting fixes**\n\n");
            for c in &unit.conflicts {
                let why = match &c.reason {
                    ConflictReason::Overlap {
                        accepted_diagnostic_id,
                        accepted_span,
                    } => format!("overlaps `{}` at {}", accepted_diagnostic_id, accepted_span),
                    ConflictReason::InvalidEdit { message } => format!("invalid edit: {}", message),
                };
                out.push_str(&format!("- `{}` at {}: {}\n", c.diagnostic_id, c.span, why));
            }
        }

        if !unit.unfixable.is_empty() {
            out.push_str("\n**Unfixable diagnostics**\n\n");
            for u in &unit.unfixable {
                out.push_str(&format!(
                    "- `{}` at {} (`{}`): {}\n",
                    u.diagnostic.rule_id, u.diagnostic.span, u.configuration, u.diagnostic.message
                ));
            }
        }

        if !unit.warnings.is_empty() {
            out.push_str("\n**Warnings**\n\n");
            for w in &unit.warnings {
                out.push_str(&format!("- `{}`: {}\n", w.code(), w.message()));
            }
        }

        out.push('\n');
    }

    out
}

/// Aligned plain-text listing for `fixflow list`.
pub fn render_rule_list(
    rules: &[RuleMeta],
    descriptors: &[(String, DiagnosticDescriptor)],
) -> String {
    let mut out = String::new();

    if !rules.is_empty() {
        let width = rules.iter().map(|r| r.id.len()).max().unwrap_or(0);
        out.push_str("Rules:\n");
        for r in rules {
            out.push_str(&format!(
                "  {:<width$}  {:<15} {:>5}  {:<8} {}\n",
                r.id,
                r.category.as_str(),
                r.order,
                if r.enabled { "enabled" } else { "disabled" },
                r.description,
            ));
        }
    }

    if !descriptors.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        let width = descriptors.iter().map(|(_, d)| d.id.len()).max().unwrap_or(0);
        out.push_str("Analyzers:\n");
        for (analyzer, d) in descriptors {
            out.push_str(&format!(
                "  {:<width$}  {:<8} {} ({})\n",
                d.id,
                d.severity.as_str(),
                d.title,
                analyzer,
            ));
        }
    }

    out
}

fn unit_label(unit: &UnitReport) -> String {
    match unit.project.trim_end_matches('/') {
        "" | "." => format!("`{}`", unit.unit),
        project => format!("`{}/{}`", project, unit.unit),
    }
}

fn status_label(s: &UnitStatus) -> &'static str {
    match s {
        UnitStatus::Done => "done",
        UnitStatus::Failed { .. } => "failed",
        UnitStatus::Cancelled => "cancelled",
    }
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
