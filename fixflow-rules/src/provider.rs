//! Reference [`AnalysisProvider`]: the syntax view is a [`TextTree`], per-unit semantics
//! are declared fields, project semantics merge them across units.

use crate::text::{TextTree, ident_at};
use fixflow_rule_api::{
    AnalysisProvider, CancellationToken, CompilationContext, Facts, PreprocessorConfiguration,
    SourceUnit, UnitId,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Field names declared in one unit's active code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSemantics {
    /// Declared with an explicit `private` modifier.
    pub private_fields: BTreeSet<String>,
    /// Declared `public`, `internal` or `protected`.
    pub visible_fields: BTreeSet<String>,
}

impl UnitSemantics {
    pub fn from_unit(text: &str, tree: &TextTree) -> Self {
        let mut out = Self::default();
        for line in tree.lines().iter().filter(|l| l.is_code()) {
            let code = line.code(text);
            let Some((modifiers, name)) = field_declaration(&code) else {
                continue;
            };
            if modifiers.contains(&"const") {
                continue;
            }
            if modifiers.contains(&"private") {
                out.private_fields.insert(name.to_string());
            } else if modifiers
                .iter()
                .any(|m| matches!(*m, "public" | "internal" | "protected"))
            {
                out.visible_fields.insert(name.to_string());
            }
        }
        out
    }
}

/// Cross-unit view: private fields of the whole project (partial types span units).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSemantics {
    /// A name declared private in one place and visible in another is left out.
    pub private_fields: BTreeSet<String>,
}

impl ProjectSemantics {
    pub fn merge<'a>(units: impl IntoIterator<Item = &'a UnitSemantics>) -> Self {
        let mut private = BTreeSet::new();
        let mut visible = BTreeSet::new();
        for u in units {
            private.extend(u.private_fields.iter().cloned());
            visible.extend(u.visible_fields.iter().cloned());
        }
        Self {
            private_fields: private.difference(&visible).cloned().collect(),
        }
    }
}

/// `modifiers type name [= value];` on one line, without parentheses.
fn field_declaration(code: &str) -> Option<(Vec<&str>, &str)> {
    let code = code.trim();
    let body = code.strip_suffix(';')?;
    if body.contains('(') || body.contains('{') {
        return None;
    }
    let decl = body.split('=').next()?.trim();
    let tokens: Vec<&str> = decl.split_whitespace().collect();
    // At least a modifier, a type and a name.
    if tokens.len() < 3 {
        return None;
    }
    let name = tokens[tokens.len() - 1];
    if ident_at(name, 0) != Some(name) {
        return None;
    }
    let modifiers: Vec<&str> = tokens[..tokens.len() - 2]
        .iter()
        .copied()
        .filter(|t| MODIFIERS.contains(t))
        .collect();
    if modifiers.is_empty() {
        return None;
    }
    Some((modifiers, name))
}

const MODIFIERS: &[&str] = &[
    "private",
    "public",
    "internal",
    "protected",
    "static",
    "readonly",
    "volatile",
    "const",
    "new",
];

/// Deterministic, line-oriented provider for C#-like sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextProvider;

impl TextProvider {
    fn tree(unit: &SourceUnit) -> anyhow::Result<&TextTree> {
        unit.tree::<TextTree>()
            .ok_or_else(|| anyhow::anyhow!("{} was not parsed by the text provider", unit.id()))
    }

    fn semantics_of(unit: &SourceUnit) -> anyhow::Result<UnitSemantics> {
        Ok(UnitSemantics::from_unit(unit.text(), Self::tree(unit)?))
    }
}

impl AnalysisProvider for TextProvider {
    fn parse(
        &self,
        id: &UnitId,
        text: &str,
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SourceUnit> {
        cancel.check()?;
        let tree = TextTree::parse(text, configuration)
            .map_err(|err| anyhow::anyhow!("{id}: {err}"))?;
        debug!(unit = %id, configuration = configuration.name.as_str(), lines = tree.lines().len(), "parsed unit");
        Ok(SourceUnit::new(
            id.clone(),
            text,
            configuration.clone(),
            Facts::new(tree),
        ))
    }

    fn unit_semantics(
        &self,
        unit: &SourceUnit,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Facts> {
        cancel.check()?;
        Ok(Facts::new(Self::semantics_of(unit)?))
    }

    fn compile(
        &self,
        project: &str,
        units: &[SourceUnit],
        configuration: &PreprocessorConfiguration,
        cancel: &CancellationToken,
    ) -> anyhow::Result<CompilationContext> {
        let mut per_unit = Vec::with_capacity(units.len());
        for unit in units {
            cancel.check()?;
            if unit.configuration() != configuration {
                anyhow::bail!(
                    "{} is parsed under `{}`, not `{}`",
                    unit.id(),
                    unit.configuration().name,
                    configuration.name
                );
            }
            per_unit.push(Self::semantics_of(unit)?);
        }
        let semantics = ProjectSemantics::merge(&per_unit);
        debug!(
            project,
            configuration = configuration.name.as_str(),
            private_fields = semantics.private_fields.len(),
            "compiled project"
        );
        Ok(CompilationContext::new(
            project,
            configuration.clone(),
            units.to_vec(),
            Facts::new(semantics),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(provider: &TextProvider, id: &str, text: &str, symbols: &[&str]) -> SourceUnit {
        let cfg = PreprocessorConfiguration::from_symbols(
            symbols.iter().map(|s| s.to_string()).collect(),
        );
        provider
            .parse(&UnitId::new(id), text, &cfg, &CancellationToken::new())
            .expect("parse")
    }

    #[test]
    fn field_declarations() {
        assert_eq!(
            field_declaration("    private int _count = 0;"),
            Some((vec!["private"], "_count"))
        );
        assert_eq!(
            field_declaration("private static readonly List<int> items;"),
            Some((vec!["private", "static", "readonly"], "items"))
        );
        assert_eq!(field_declaration("int local = 5;"), None);
        assert_eq!(field_declaration("private void Run();"), None);
        assert_eq!(field_declaration("return x;"), None);
    }

    #[test]
    fn unit_semantics_skip_inactive_code() {
        let provider = TextProvider;
        let text = "class C {\n    private int a;\n#if DEBUG\n    private int b;\n#endif\n    public int c;\n}\n";
        let base = parse(&provider, "c.cs", text, &[]);
        let facts = provider
            .unit_semantics(&base, &CancellationToken::new())
            .expect("semantics");
        let sem = facts.get::<UnitSemantics>().expect("unit semantics");
        assert_eq!(sem.private_fields, BTreeSet::from(["a".to_string()]));
        assert_eq!(sem.visible_fields, BTreeSet::from(["c".to_string()]));

        let debug = parse(&provider, "c.cs", text, &["DEBUG"]);
        let sem = TextProvider::semantics_of(&debug).expect("semantics");
        assert!(sem.private_fields.contains("b"));
    }

    #[test]
    fn project_semantics_drop_ambiguous_names() {
        let provider = TextProvider;
        let cancel = CancellationToken::new();
        let a = parse(&provider, "a.cs", "partial class C {\n  private int x;\n  private int y;\n}\n", &[]);
        let b = parse(&provider, "b.cs", "class D {\n  public int y;\n}\n", &[]);
        let ctx = provider
            .compile("p", &[a, b], &PreprocessorConfiguration::base(), &cancel)
            .expect("compile");
        let sem = ctx.semantics::<ProjectSemantics>().expect("project semantics");
        assert_eq!(sem.private_fields, BTreeSet::from(["x".to_string()]));
    }

    #[test]
    fn compile_rejects_mixed_configurations() {
        let provider = TextProvider;
        let a = parse(&provider, "a.cs", "x\n", &["DEBUG"]);
        let err = provider
            .compile("p", &[a], &PreprocessorConfiguration::base(), &CancellationToken::new())
            .expect_err("mismatch");
        assert!(err.to_string().contains("parsed under `DEBUG`"));
    }

    #[test]
    fn unbalanced_directive_is_a_parse_error() {
        let err = TextProvider
            .parse(
                &UnitId::new("bad.cs"),
                "#if A\nclass C {}\n",
                &PreprocessorConfiguration::base(),
                &CancellationToken::new(),
            )
            .expect_err("unterminated");
        assert!(err.to_string().starts_with("bad.cs: unterminated"));
    }
}
