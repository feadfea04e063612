use crate::text::TextTree;
use fixflow_rule_api::{
    CancellationToken, Facts, LocalSemanticRule, RuleCategory, RuleMeta, RuleOptions, SourceUnit,
};

/// Whitespace normalization of active code: trailing whitespace is removed and, with the
/// `indent-size` option, leading tabs become that many spaces.
///
/// Inactive regions and directive lines are left exactly as written; they are formatted
/// under the configuration that activates them.
pub struct FormatDocument;

impl FormatDocument {
    pub const RULE_ID: &'static str = "format-document";
    const DESCRIPTION: &'static str = "Normalizes whitespace in active code";
    pub const ORDER: u32 = 10;
    pub const INDENT_OPTION: &'static str = "indent-size";
}

fn expand_leading_tabs(line: &str, width: usize) -> String {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    let (indent, rest) = line.split_at(indent_len);
    let mut out = String::with_capacity(line.len());
    for c in indent.chars() {
        if c == '\t' {
            out.extend(std::iter::repeat_n(' ', width));
        } else {
            out.push(c);
        }
    }
    out.push_str(rest);
    out
}

impl LocalSemanticRule for FormatDocument {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new(
            Self::RULE_ID,
            Self::DESCRIPTION,
            RuleCategory::LocalSemantic,
            Self::ORDER,
        )
    }

    fn process(
        &self,
        unit: &SourceUnit,
        _semantics: &Facts,
        options: &RuleOptions,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<String>> {
        cancel.check()?;
        let indent = match options.get(Self::INDENT_OPTION) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                anyhow::anyhow!("option `{}` must be a number, got `{raw}`: {e}", Self::INDENT_OPTION)
            })?),
            None => None,
        };

        let text = unit.text();
        let tree = unit
            .tree::<TextTree>()
            .ok_or_else(|| anyhow::anyhow!("{} has no text tree", unit.id()))?;

        let mut out = String::with_capacity(text.len());
        for line in tree.lines() {
            let content = line.text(text);
            if line.is_code() {
                let trimmed = content.trim_end();
                match indent {
                    Some(width) => out.push_str(&expand_leading_tabs(trimmed, width)),
                    None => out.push_str(trimmed),
                }
            } else {
                out.push_str(content);
            }
            out.push_str(line.line_break(text));
        }

        Ok((out != text).then_some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextProvider;
    use fixflow_rule_api::{AnalysisProvider, PreprocessorConfiguration, UnitId};
    use pretty_assertions::assert_eq;

    fn run(text: &str, options: RuleOptions) -> anyhow::Result<Option<String>> {
        let cancel = CancellationToken::new();
        let unit = TextProvider
            .parse(&UnitId::new("a.cs"), text, &PreprocessorConfiguration::base(), &cancel)
            .expect("parse");
        FormatDocument.process(&unit, &Facts::none(), &options, &cancel)
    }

    #[test]
    fn trims_active_code_only() {
        let text = "class C {   \n#if NEVER\n  keep   \n#endif  \n}\t\r\n";
        assert_eq!(
            run(text, RuleOptions::new()).expect("run").as_deref(),
            Some("class C {\n#if NEVER\n  keep   \n#endif  \n}\r\n")
        );
    }

    #[test]
    fn expands_leading_tabs_when_configured() {
        let options = RuleOptions::new().with(FormatDocument::INDENT_OPTION, "4");
        assert_eq!(
            run("\t\tx = 1;\t// c\n", options).expect("run").as_deref(),
            Some("        x = 1;\t// c\n")
        );
    }

    #[test]
    fn clean_text_is_untouched_and_bad_option_fails() {
        assert_eq!(run("a\nb", RuleOptions::new()).expect("run"), None);
        let options = RuleOptions::new().with(FormatDocument::INDENT_OPTION, "wide");
        let err = run("a\n", options).expect_err("bad option");
        assert!(err.to_string().contains("indent-size"));
    }
}
