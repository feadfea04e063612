use crate::error::{EditError, EditResult};
use fixflow_types::report::{ConflictReason, ConflictingFix};
use fixflow_types::{Edit, FixProposal, UnitId};
use tracing::debug;

/// An edit that made it into the applied set, with the diagnostic it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedEdit {
    pub diagnostic_id: String,
    pub edit: Edit,
}

/// Result of one batch application: the new text plus a record of every proposed edit
/// that did not land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub text: String,
    /// Accepted edits, ascending by span.
    pub accepted: Vec<AcceptedEdit>,
    /// Accepted edits that rewrite a range to its current text. They win overlaps like
    /// any other edit but are not spliced.
    pub unchanged: Vec<AcceptedEdit>,
    pub conflicts: Vec<ConflictingFix>,
}

impl BatchOutcome {
    pub fn changed(&self, original: &str) -> bool {
        self.text != original
    }
}

/// Merges all fix proposals for one unit into a conflict-free edit set and applies it
/// atomically.
///
/// 1. Flatten every edit of every proposal addressed to the unit, in arrival order.
/// 2. Reject edits that do not fit the text (`InvalidEdit`).
/// 3. Stable-sort by span start.
/// 4. Accept greedily; an edit overlapping an already accepted one is reported as a
///    conflict carrying both diagnostic ids. Edits that would not change anything take
///    part in this step too.
/// 5. Apply the accepted set, minus its no-op edits, right-to-left on a copy of the text.
///
/// Every proposed edit ends up in exactly one of `accepted`, `unchanged` or `conflicts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchFixApplier;

impl BatchFixApplier {
    pub fn apply(unit: &UnitId, text: &str, proposals: &[FixProposal]) -> BatchOutcome {
        let mut conflicts = Vec::new();
        let mut candidates: Vec<AcceptedEdit> = Vec::new();

        for proposal in proposals.iter().filter(|p| &p.unit == unit) {
            for edit in &proposal.edits {
                if let Err(err) = validate_edit(text, edit) {
                    conflicts.push(ConflictingFix {
                        diagnostic_id: proposal.diagnostic_id.clone(),
                        unit: unit.clone(),
                        span: edit.span,
                        reason: ConflictReason::InvalidEdit {
                            message: err.to_string(),
                        },
                    });
                    continue;
                }
                candidates.push(AcceptedEdit {
                    diagnostic_id: proposal.diagnostic_id.clone(),
                    edit: edit.clone(),
                });
            }
        }

        candidates.sort_by_key(|c| c.edit.span.start);

        let mut accepted: Vec<AcceptedEdit> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let clash = accepted
                .iter()
                .rev()
                .find(|a| a.edit.conflicts_with(&candidate.edit));
            match clash {
                Some(winner) => conflicts.push(ConflictingFix {
                    diagnostic_id: candidate.diagnostic_id,
                    unit: unit.clone(),
                    span: candidate.edit.span,
                    reason: ConflictReason::Overlap {
                        accepted_diagnostic_id: winner.diagnostic_id.clone(),
                        accepted_span: winner.edit.span,
                    },
                }),
                None => accepted.push(candidate),
            }
        }

        let (unchanged, mut accepted): (Vec<_>, Vec<_>) = accepted
            .into_iter()
            .partition(|a| a.edit.is_noop_for(text));
        // An insertion and a replacement may share a start; the insertion goes first.
        accepted.sort_by_key(|a| (a.edit.span.start, a.edit.span.len));
        let text = splice_right_to_left(text, accepted.iter().map(|a| &a.edit));

        debug!(
            unit = %unit,
            accepted = accepted.len(),
            unchanged = unchanged.len(),
            conflicts = conflicts.len(),
            "applied batch"
        );
        BatchOutcome {
            text,
            accepted,
            unchanged,
            conflicts,
        }
    }
}

/// Check that `edit` fits `text`: in range and on character boundaries.
pub fn validate_edit(text: &str, edit: &Edit) -> EditResult<()> {
    let span = edit.span;
    let end = span
        .start
        .checked_add(span.len)
        .filter(|&end| end <= text.len())
        .ok_or(EditError::OutOfBounds {
            span,
            len: text.len(),
        })?;
    if !text.is_char_boundary(span.start) || !text.is_char_boundary(end) {
        return Err(EditError::NotCharBoundary { span });
    }
    Ok(())
}

/// Apply a set of edits that must all be valid and mutually non-overlapping.
///
/// Unlike [`BatchFixApplier::apply`], nothing is rejected silently or recorded: the
/// first problem fails the whole call and `text` is left as it was.
pub fn apply_edits(text: &str, edits: &[Edit]) -> EditResult<String> {
    for edit in edits {
        validate_edit(text, edit)?;
    }
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.span.start, e.span.len));
    // An insertion can sit inside a replacement that starts several edits earlier, so
    // neighbours alone are not enough.
    for (i, later) in sorted.iter().enumerate() {
        if let Some(earlier) = sorted[..i].iter().find(|e| e.conflicts_with(later)) {
            return Err(EditError::Overlap {
                span: later.span,
                other: earlier.span,
            });
        }
    }
    Ok(splice_right_to_left(text, sorted.into_iter()))
}

/// `edits` must be validated, non-overlapping and ascending by (start, len).
fn splice_right_to_left<'e>(text: &str, edits: impl DoubleEndedIterator<Item = &'e Edit>) -> String {
    let mut out = text.to_string();
    for edit in edits.rev() {
        out.replace_range(edit.span.start..edit.span.end(), &edit.replacement);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixflow_types::{DiagnosticDescriptor, Severity, Span};
    use pretty_assertions::assert_eq;

    fn unit() -> UnitId {
        UnitId::new("a.cs")
    }

    fn proposal(diagnostic_id: &str, edits: Vec<Edit>) -> FixProposal {
        let d = DiagnosticDescriptor::new(diagnostic_id, diagnostic_id, Severity::Warning)
            .at(&unit(), Span::empty(0));
        FixProposal::for_diagnostic(&d, edits)
    }

    const TEXT: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

    #[test]
    fn overlapping_proposals_accept_exactly_one_and_report_the_other() {
        let first = proposal("D1", vec![Edit::replace(10, 15, "-----")]);
        let second = proposal("D2", vec![Edit::replace(12, 20, "++++++++")]);

        let out = BatchFixApplier::apply(&unit(), TEXT, &[first, second]);
        assert_eq!(out.text, "0123456789-----fghijklmnopqrstuvwxyz");
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].diagnostic_id, "D1");
        assert_eq!(
            out.conflicts,
            vec![ConflictingFix {
                diagnostic_id: "D2".into(),
                unit: unit(),
                span: Span::between(12, 20),
                reason: ConflictReason::Overlap {
                    accepted_diagnostic_id: "D1".into(),
                    accepted_span: Span::between(10, 15),
                },
            }]
        );
    }

    #[test]
    fn earlier_start_wins_regardless_of_arrival() {
        let late_but_earlier = proposal("EARLY", vec![Edit::replace(10, 15, "x")]);
        let first_but_later = proposal("LATE", vec![Edit::replace(12, 20, "y")]);
        let out = BatchFixApplier::apply(&unit(), TEXT, &[first_but_later, late_but_earlier]);
        assert_eq!(out.accepted[0].diagnostic_id, "EARLY");
        assert_eq!(out.conflicts[0].diagnostic_id, "LATE");
    }

    #[test]
    fn same_start_ties_go_to_arrival_order() {
        let a = proposal("A", vec![Edit::replace(3, 5, "a")]);
        let b = proposal("B", vec![Edit::replace(3, 4, "b")]);
        let out = BatchFixApplier::apply(&unit(), TEXT, &[a, b]);
        assert_eq!(out.accepted[0].diagnostic_id, "A");
        assert_eq!(out.conflicts[0].diagnostic_id, "B");
    }

    #[test]
    fn disjoint_edits_all_land_in_one_pass() {
        let p = proposal(
            "D",
            vec![
                Edit::replace(30, 36, "END"),
                Edit::insert(0, ">>"),
                Edit::delete(10, 20),
            ],
        );
        let out = BatchFixApplier::apply(&unit(), TEXT, &[p]);
        assert_eq!(out.text, ">>0123456789klmnopqrstEND");
        assert!(out.conflicts.is_empty());
        let starts: Vec<usize> = out.accepted.iter().map(|a| a.edit.span.start).collect();
        assert_eq!(starts, vec![0, 10, 30]);
    }

    #[test]
    fn insertion_at_replacement_boundary_lands_before_it() {
        let p = proposal("D", vec![Edit::replace(2, 4, "XY"), Edit::insert(2, "!")]);
        let out = BatchFixApplier::apply(&unit(), "abcdef", &[p]);
        assert_eq!(out.text, "ab!XYef");
        assert!(out.conflicts.is_empty());
    }

    #[test]
    fn invalid_edits_are_reported_not_applied() {
        let text = "héllo";
        let p = proposal(
            "D",
            vec![
                Edit::replace(2, 3, "e"),
                Edit::replace(4, 40, "!"),
                Edit::replace(0, 1, "H"),
            ],
        );
        let out = BatchFixApplier::apply(&unit(), text, &[p]);
        assert_eq!(out.text, "Héllo");
        assert_eq!(out.conflicts.len(), 2);
        assert!(out.conflicts.iter().all(|c| matches!(
            c.reason,
            ConflictReason::InvalidEdit { .. }
        )));
    }

    #[test]
    fn noop_edits_are_not_spliced() {
        let noop = proposal("NOOP", vec![Edit::replace(0, 5, "01234")]);
        let real = proposal("REAL", vec![Edit::replace(6, 8, "X")]);
        let out = BatchFixApplier::apply(&unit(), TEXT, &[noop, real]);
        assert!(out.conflicts.is_empty());
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.unchanged.len(), 1);
        assert_eq!(out.unchanged[0].diagnostic_id, "NOOP");
        assert!(out.text.starts_with("012345X89a"));
    }

    #[test]
    fn noop_edit_overlapping_a_real_one_is_still_a_conflict() {
        let noop = proposal("FIRST", vec![Edit::replace(10, 15, "abcde")]);
        let real = proposal("SECOND", vec![Edit::replace(12, 20, "XXXXXXXX")]);
        let out = BatchFixApplier::apply(&unit(), TEXT, &[noop, real]);

        assert!(out.accepted.is_empty());
        assert_eq!(out.unchanged.len(), 1);
        assert_eq!(out.unchanged[0].diagnostic_id, "FIRST");
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].diagnostic_id, "SECOND");
        assert_eq!(
            out.conflicts[0].reason,
            ConflictReason::Overlap {
                accepted_diagnostic_id: "FIRST".into(),
                accepted_span: Span::between(10, 15),
            }
        );
        assert_eq!(out.text, TEXT);
    }

    #[test]
    fn proposals_for_other_units_are_ignored() {
        let mut p = proposal("D", vec![Edit::replace(0, 1, "Z")]);
        p.unit = UnitId::new("other.cs");
        let out = BatchFixApplier::apply(&unit(), TEXT, &[p]);
        assert_eq!(out.text, TEXT);
        assert!(!out.changed(TEXT));
    }

    #[test]
    fn strict_apply_rejects_overlaps_and_inside_insertions() {
        assert_eq!(
            apply_edits("abcdef", &[Edit::insert(6, "!"), Edit::replace(0, 1, "A")]),
            Ok("Abcdef!".to_string())
        );
        assert!(matches!(
            apply_edits("abcdef", &[Edit::replace(0, 4, ""), Edit::insert(2, "x")]),
            Err(EditError::Overlap { .. })
        ));
        assert!(matches!(
            apply_edits("abcdef", &[Edit::replace(0, 4, ""), Edit::replace(1, 2, "")]),
            Err(EditError::Overlap { .. })
        ));
        assert_eq!(
            apply_edits("ab", &[Edit::replace(1, 9, "")]),
            Err(EditError::OutOfBounds {
                span: Span::between(1, 9),
                len: 2
            })
        );
    }
}
