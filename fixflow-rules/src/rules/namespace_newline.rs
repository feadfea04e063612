use crate::text::TextTree;
use fixflow_rule_api::{RuleCategory, RuleMeta, RuleOptions, SourceUnit, SyntaxRule};

/// Exactly one blank line between the first namespace declaration and whatever precedes
/// it (usings, a header comment, a directive).
pub struct NewlineBeforeFirstNamespace;

impl NewlineBeforeFirstNamespace {
    pub const RULE_ID: &'static str = "newline-before-first-namespace";
    const DESCRIPTION: &'static str =
        "Ensures exactly one blank line before the first namespace declaration";
    pub const ORDER: u32 = 20;
}

fn is_namespace(line: &str) -> bool {
    line.trim_start()
        .strip_prefix("namespace")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

impl SyntaxRule for NewlineBeforeFirstNamespace {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new(
            Self::RULE_ID,
            Self::DESCRIPTION,
            RuleCategory::Syntax,
            Self::ORDER,
        )
    }

    fn process(&self, unit: &SourceUnit, _options: &RuleOptions) -> anyhow::Result<Option<String>> {
        let text = unit.text();
        let tree = unit
            .tree::<TextTree>()
            .ok_or_else(|| anyhow::anyhow!("{} has no text tree", unit.id()))?;
        let lines = tree.lines();

        let Some(ns) = lines
            .iter()
            .position(|l| l.is_code() && is_namespace(l.text(text)))
        else {
            return Ok(None);
        };
        // Nothing but blank lines before it: leave the file start alone.
        let Some(prev) = lines[..ns].iter().rposition(|l| !l.is_blank(text)) else {
            return Ok(None);
        };

        let newline = match lines[prev].line_break(text) {
            "" => tree.newline(text),
            brk => brk,
        };
        let mut out = String::with_capacity(text.len() + newline.len());
        out.push_str(&text[..lines[prev].next]);
        out.push_str(newline);
        out.push_str(&text[lines[ns].start..]);

        Ok((out != text).then_some(out))
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

    fn run(text: &str) -> Option<String> {
        let unit = TextProvider
            .parse(
                &UnitId::new("a.cs"),
                text,
                &PreprocessorConfiguration::base(),
                &CancellationToken::new(),
            )
            .expect("parse");
        NewlineBeforeFirstNamespace
            .process(&unit, &RuleOptions::new())
            .expect("process")
    }

    #[test]
    fn inserts_missing_blank_line() {
        assert_eq!(
            run("using System;\nnamespace N\n{\n}\n").as_deref(),
            Some("using System;\n\nnamespace N\n{\n}\n")
        );
    }

    #[test]
    fn collapses_extra_blank_lines_and_keeps_crlf() {
        assert_eq!(
            run("using System;\r\n\r\n  \r\n\r\nnamespace N {}\r\n").as_deref(),
            Some("using System;\r\n\r\nnamespace N {}\r\n")
        );
    }

    #[test]
    fn already_formatted_and_namespace_first_are_untouched() {
        assert_eq!(run("// header\n\nnamespace N {}\n"), None);
        assert_eq!(run("namespace N {}\n"), None);
        assert_eq!(run("\n\nnamespace N {}\n"), None);
        assert_eq!(run("class NamespaceLike {}\n"), None);
    }

    #[test]
    fn namespace_in_inactive_region_is_ignored() {
        let text = "using A;\n#if NEVER\nnamespace Hidden {}\n#endif\nnamespace Real {}\n";
        assert_eq!(
            run(text).as_deref(),
            Some("using A;\n#if NEVER\nnamespace Hidden {}\n#endif\n\nnamespace Real {}\n")
        );
    }
}
