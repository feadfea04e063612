#![no_main]

use arbitrary::Arbitrary;
use fixflow_edit::{BatchFixApplier, apply_edits};
use fixflow_types::{DiagnosticDescriptor, Edit, FixProposal, Severity, Span, UnitId};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct RawEdit {
    start: u16,
    len: u8,
    replacement: String,
}

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    proposals: Vec<Vec<RawEdit>>,
}

fuzz_target!(|input: Input| {
    let unit = UnitId::new("fuzz.cs");
    let proposals: Vec<FixProposal> = input
        .proposals
        .into_iter()
        .enumerate()
        .map(|(i, edits)| {
            let d = DiagnosticDescriptor::new(format!("F{i}"), "fuzz", Severity::Info)
                .at(&unit, Span::empty(0));
            let edits = edits
                .into_iter()
                .map(|e| Edit::new(Span::new(e.start as usize, e.len as usize), e.replacement))
                .collect();
            FixProposal::for_diagnostic(&d, edits)
        })
        .collect();

    let out = BatchFixApplier::apply(&unit, &input.text, &proposals);

    for (i, a) in out.accepted.iter().enumerate() {
        for b in &out.accepted[i + 1..] {
            assert!(!a.edit.conflicts_with(&b.edit), "{:?} vs {:?}", a.edit, b.edit);
        }
    }
    let edits: Vec<Edit> = out.accepted.iter().map(|a| a.edit.clone()).collect();
    let strict = apply_edits(&input.text, &edits).expect("accepted edits apply strictly");
    assert_eq!(strict, out.text);
});
