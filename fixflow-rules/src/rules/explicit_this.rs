use crate::provider::ProjectSemantics;
use crate::text::{TextTree, ident_at, ident_occurrences};
use fixflow_rule_api::{
    Analyzer, CompilationContext, Diagnostic, DiagnosticDescriptor, Edit, FixProposal, Fixer,
    RuleCategory, RuleMeta, RuleOptions, Severity, SourceUnit, Span,
};

pub const EXPLICIT_THIS_ID: &str = "FF0001";

fn descriptor() -> DiagnosticDescriptor {
    DiagnosticDescriptor::new(
        EXPLICIT_THIS_ID,
        "Don't use explicit 'this' for private fields",
        Severity::Warning,
    )
}

fn tree(unit: &SourceUnit) -> anyhow::Result<&TextTree> {
    unit.tree::<TextTree>()
        .ok_or_else(|| anyhow::anyhow!("{} has no text tree", unit.id()))
}

/// Reports `this.field` where `field` is a private field of the project.
pub struct ExplicitThisAnalyzer;

impl ExplicitThisAnalyzer {
    pub const RULE_ID: &'static str = "explicit-this";
    const DESCRIPTION: &'static str = "Reports explicit 'this.' qualification of private fields";
    pub const ORDER: u32 = 10;
}

impl Analyzer for ExplicitThisAnalyzer {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new(
            Self::RULE_ID,
            Self::DESCRIPTION,
            RuleCategory::GlobalSemantic,
            Self::ORDER,
        )
    }

    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
        vec![descriptor()]
    }

    fn analyze(
        &self,
        unit: &SourceUnit,
        context: &CompilationContext,
        _options: &RuleOptions,
    ) -> anyhow::Result<Vec<Diagnostic>> {
        let semantics = context
            .semantics::<ProjectSemantics>()
            .ok_or_else(|| anyhow::anyhow!("compilation of {} has no project semantics", context.project()))?;
        if semantics.private_fields.is_empty() {
            return Ok(Vec::new());
        }

        let text = unit.text();
        let desc = descriptor();
        let mut out = Vec::new();
        for line in tree(unit)?.lines().iter().filter(|l| l.is_code()) {
            let code = line.code(text);
            for at in ident_occurrences(&code, "this") {
                if code.as_bytes().get(at + 4) != Some(&b'.') {
                    continue;
                }
                if code[..at].ends_with(['.', '@']) {
                    continue;
                }
                let Some(name) = ident_at(&code, at + 5) else {
                    continue;
                };
                if semantics.private_fields.contains(name) {
                    let span = Span::new(line.start + at, 5 + name.len());
                    out.push(desc.at(unit.id(), span).with_message(format!(
                        "Don't use explicit 'this' for private field '{name}'"
                    )));
                }
            }
        }
        Ok(out)
    }
}

/// Drops the `this.` qualifier.
///
/// Declines (no proposal) when the bare name also appears unqualified anywhere in the
/// unit outside field declarations, since it may then bind to a local or parameter.
pub struct ExplicitThisFixer;

impl ExplicitThisFixer {
    pub const FIXER_ID: &'static str = "explicit-this-fixer";
}

fn used_unqualified(unit: &SourceUnit, name: &str) -> anyhow::Result<bool> {
    let text = unit.text();
    for line in tree(unit)?.lines().iter().filter(|l| l.is_code()) {
        let code = line.code(text);
        let trimmed = code.trim();
        if trimmed.starts_with("private ") && trimmed.ends_with(';') && !trimmed.contains('(') {
            continue;
        }
        // `x.name` is a member access; anything else is a bare use.
        if ident_occurrences(&code, name).any(|at| !code[..at].trim_end().ends_with('.')) {
            return Ok(true);
        }
    }
    Ok(false)
}

impl Fixer for ExplicitThisFixer {
    fn id(&self) -> &str {
        Self::FIXER_ID
    }

    fn fixable_diagnostic_ids(&self) -> Vec<String> {
        vec![EXPLICIT_THIS_ID.to_string()]
    }

    fn propose(
        &self,
        diagnostic: &Diagnostic,
        unit: &SourceUnit,
        _context: &CompilationContext,
    ) -> anyhow::Result<Vec<FixProposal>> {
        let span = diagnostic.span;
        let Some(found) = unit.text().get(span.start..span.end()) else {
            anyhow::bail!("diagnostic span {span} is outside {}", unit.id());
        };
        let Some(name) = found.strip_prefix("this.") else {
            anyhow::bail!("expected `this.` at {span} in {}, found `{found}`", unit.id());
        };
        if used_unqualified(unit, name)? {
            return Ok(Vec::new());
        }
        let mut proposal = FixProposal::for_diagnostic(
            diagnostic,
            vec![Edit::delete(span.start, span.start + "this.".len())],
        );
        proposal.title = Some(format!("Remove 'this.' from '{name}'"));
        Ok(vec![proposal])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextProvider;
    use fixflow_rule_api::{
        AnalysisProvider, CancellationToken, PreprocessorConfiguration, UnitId,
    };
    use pretty_assertions::assert_eq;

    fn compile(text: &str) -> CompilationContext {
        let cancel = CancellationToken::new();
        let base = PreprocessorConfiguration::base();
        let unit = TextProvider
            .parse(&UnitId::new("c.cs"), text, &base, &cancel)
            .expect("parse");
        TextProvider
            .compile("p", &[unit], &base, &cancel)
            .expect("compile")
    }

    fn diagnostics(ctx: &CompilationContext) -> Vec<Diagnostic> {
        ExplicitThisAnalyzer
            .analyze(&ctx.units()[0], ctx, &RuleOptions::new())
            .expect("analyze")
    }

    const CLASS: &str = "class C\n{\n    private int _count;\n    public int Total;\n    void M()\n    {\n        this._count++;\n        this.Total++;\n        var s = \"this._count\"; // this._count\n    }\n}\n";

    #[test]
    fn reports_private_fields_only_outside_literals() {
        let ctx = compile(CLASS);
        let found = diagnostics(&ctx);
        assert_eq!(found.len(), 1);
        let d = &found[0];
        assert_eq!(d.rule_id, EXPLICIT_THIS_ID);
        assert_eq!(&CLASS[d.span.start..d.span.end()], "this._count");
        assert_eq!(d.message, "Don't use explicit 'this' for private field '_count'");
    }

    #[test]
    fn block_comments_and_verbatim_strings_are_not_code() {
        let text = "class C\n{\n    private int _count;\n    void M()\n    {\n        /* this._count\n           this._count */\n        var p = @\"C:\\this._count\n\"\" this._count\";\n        this._count++;\n    }\n}\n";
        let ctx = compile(text);
        let found = diagnostics(&ctx);
        assert_eq!(found.len(), 1);
        let start = text.find("this._count++").expect("code use");
        assert_eq!(found[0].span, Span::new(start, "this._count".len()));
    }

    #[test]
    fn fixer_removes_the_qualifier() {
        let ctx = compile(CLASS);
        let d = diagnostics(&ctx).remove(0);
        let proposals = ExplicitThisFixer
            .propose(&d, &ctx.units()[0], &ctx)
            .expect("propose");
        assert_eq!(proposals.len(), 1);
        assert_eq!(
            proposals[0].edits,
            vec![Edit::delete(d.span.start, d.span.start + 5)]
        );
    }

    #[test]
    fn fixer_declines_when_a_parameter_shadows_the_field() {
        let text = "class C\n{\n    private int name;\n    C(int name)\n    {\n        this.name = name;\n    }\n}\n";
        let ctx = compile(text);
        let found = diagnostics(&ctx);
        assert_eq!(found.len(), 1);
        let proposals = ExplicitThisFixer
            .propose(&found[0], &ctx.units()[0], &ctx)
            .expect("propose");
        assert!(proposals.is_empty());
    }

    #[test]
    fn fixer_rejects_stale_spans() {
        let ctx = compile(CLASS);
        let mut d = diagnostics(&ctx).remove(0);
        d.span = Span::new(0, 5);
        let err = ExplicitThisFixer
            .propose(&d, &ctx.units()[0], &ctx)
            .expect_err("stale span");
        assert!(err.to_string().contains("expected `this.`"));
    }
}
