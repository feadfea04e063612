use crate::text::TextTree;
use fixflow_rule_api::{RuleCategory, RuleMeta, RuleOptions, SourceUnit, SyntaxRule};

/// Starts every unit with the configured header comment followed by one blank line.
///
/// Reads the `header` option; without it the rule does nothing. A leading `//` block
/// that mentions "copyright" (or already equals the header) is replaced, anything else is
/// kept below the new header.
pub struct CopyrightHeader;

impl CopyrightHeader {
    pub const RULE_ID: &'static str = "copyright-header";
    const DESCRIPTION: &'static str = "Ensures every unit starts with the configured copyright header";
    pub const ORDER: u32 = 10;
    pub const HEADER_OPTION: &'static str = "header";
}

fn header_lines(header: &str) -> Vec<String> {
    header
        .lines()
        .map(str::trim_end)
        .map(|line| {
            if line.trim_start().starts_with("//") {
                line.to_string()
            } else if line.is_empty() {
                "//".to_string()
            } else {
                format!("// {line}")
            }
        })
        .collect()
}

impl SyntaxRule for CopyrightHeader {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new(
            Self::RULE_ID,
            Self::DESCRIPTION,
            RuleCategory::Syntax,
            Self::ORDER,
        )
    }

    fn process(&self, unit: &SourceUnit, options: &RuleOptions) -> anyhow::Result<Option<String>> {
        let Some(header) = options.get(Self::HEADER_OPTION).filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };
        let wanted = header_lines(header);
        let text = unit.text();
        let tree = unit
            .tree::<TextTree>()
            .ok_or_else(|| anyhow::anyhow!("{} has no text tree", unit.id()))?;
        let lines = tree.lines();
        let newline = tree.newline(text);

        let block = lines
            .iter()
            .take_while(|l| l.text(text).trim_start().starts_with("//"))
            .count();
        let existing: Vec<&str> = lines[..block].iter().map(|l| l.text(text).trim_end()).collect();
        let replaces = block > 0
            && (existing == wanted
                || existing.iter().any(|l| l.to_ascii_lowercase().contains("copyright")));

        let body_from = if replaces { block } else { 0 };
        let body_start = lines[body_from..]
            .iter()
            .find(|l| !l.is_blank(text))
            .map(|l| l.start)
            .unwrap_or(text.len());
        let body = &text[body_start..];

        let mut out = wanted.join(newline);
        out.push_str(newline);
        if !body.is_empty() {
            out.push_str(newline);
            out.push_str(body);
        }

        Ok((out != text).then_some(out))
    }
}
