use serde::{Deserialize, Serialize};

/// Which pass a rule belongs to.
///
/// Passes always run in declaration order: every syntax rule sees the tree before any
/// semantic rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Syntax,
    LocalSemantic,
    GlobalSemantic,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 3] = [
        RuleCategory::Syntax,
        RuleCategory::LocalSemantic,
        RuleCategory::GlobalSemantic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleCategory::Syntax => "syntax",
            RuleCategory::LocalSemantic => "local_semantic",
            RuleCategory::GlobalSemantic => "global_semantic",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain-data rule metadata. Order keys are unique among enabled rules of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub id: String,
    pub description: String,
    pub category: RuleCategory,
    pub order: u32,
    pub enabled: bool,
}

impl RuleMeta {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        category: RuleCategory,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            category,
            order,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// One conditional-compilation variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreprocessorConfiguration {
    pub name: String,

    #[serde(default)]
    pub symbols: Vec<String>,
}

impl PreprocessorConfiguration {
    pub const BASE_NAME: &'static str = "default";

    /// The implicit configuration with no symbols defined.
    pub fn base() -> Self {
        Self {
            name: Self::BASE_NAME.to_string(),
            symbols: Vec::new(),
        }
    }

    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            symbols,
        }
    }

    /// Named after its symbols, e.g. `DEBUG+TRACE`.
    pub fn from_symbols(symbols: Vec<String>) -> Self {
        let name = if symbols.is_empty() {
            Self::BASE_NAME.to_string()
        } else {
            symbols.join("+")
        };
        Self { name, symbols }
    }

    pub fn is_base(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn defines(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_name_derives_from_symbols() {
        let cfg = PreprocessorConfiguration::from_symbols(vec!["DEBUG".into(), "TRACE".into()]);
        assert_eq!(cfg.name, "DEBUG+TRACE");
        assert!(cfg.defines("TRACE"));
        assert!(!cfg.defines("RELEASE"));
        assert!(PreprocessorConfiguration::from_symbols(vec![]).is_base());
    }

    #[test]
    fn categories_order_by_pass() {
        let mut cats = vec![
            RuleCategory::GlobalSemantic,
            RuleCategory::Syntax,
            RuleCategory::LocalSemantic,
        ];
        cats.sort();
        assert_eq!(cats, RuleCategory::ALL.to_vec());
    }
}
