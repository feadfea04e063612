//! Reference analysis provider and built-in rules for fixflow.
//!
//! [`TextProvider`] is a line-oriented stand-in for a real compiler front end: it
//! resolves `#if` regions per configuration and knows which fields are private. It is
//! what the CLI runs with; embedders with a real parser bring their own
//! [`AnalysisProvider`](fixflow_rule_api::AnalysisProvider).

mod provider;
pub mod rules;
pub mod text;

pub use provider::{ProjectSemantics, TextProvider, UnitSemantics};

use fixflow_domain::{RegistryError, RuleRegistry};
use rules::{
    CopyrightHeader, ExplicitThisAnalyzer, ExplicitThisFixer, FormatDocument,
    NewlineBeforeFirstNamespace,
};

/// Registry holding every built-in rule, all enabled.
pub fn builtin_registry() -> Result<RuleRegistry, RegistryError> {
    let mut registry = RuleRegistry::new();
    registry
        .register_syntax(CopyrightHeader)?
        .register_syntax(NewlineBeforeFirstNamespace)?
        .register_local(FormatDocument)?
        .register_analyzer(ExplicitThisAnalyzer)?
        .register_fixer(ExplicitThisFixer);
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixflow_types::RuleCategory;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_rules_are_ordered_per_category() {
        let registry = builtin_registry().expect("registry");
        let ids: Vec<(RuleCategory, String)> = registry
            .rules()
            .into_iter()
            .map(|m| (m.category, m.id))
            .collect();
        assert_eq!(
            ids,
            vec![
                (RuleCategory::Syntax, "copyright-header".to_string()),
                (RuleCategory::Syntax, "newline-before-first-namespace".to_string()),
                (RuleCategory::LocalSemantic, "format-document".to_string()),
                (RuleCategory::GlobalSemantic, "explicit-this".to_string()),
            ]
        );
        let descriptors = registry.diagnostic_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].1.id, rules::EXPLICIT_THIS_ID);
    }
}
