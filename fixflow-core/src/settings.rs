//! Clap-free settings for the format and check pipelines.

use camino::Utf8PathBuf;
use fixflow_rule_api::{PreprocessorConfiguration, RuleOptions};
use std::collections::BTreeMap;

/// Whether a run may persist its results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Format,
    /// Same passes, nothing persisted; the caller learns what would change.
    Check,
}

#[derive(Debug, Clone)]
pub struct FormatSettings {
    /// One project per root.
    pub roots: Vec<Utf8PathBuf>,
    /// Glob patterns relative to each root.
    pub include: Vec<String>,
    /// When non-empty, only units with one of these file names are processed.
    pub file_names: Vec<String>,
    /// Additional configurations; the base configuration is implicit.
    pub configurations: Vec<PreprocessorConfiguration>,
    /// Rule id → enabled.
    pub rules: BTreeMap<String, bool>,
    /// Rule id → option bag.
    pub rule_options: BTreeMap<String, RuleOptions>,
    pub mode: RunMode,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            roots: vec![Utf8PathBuf::from(".")],
            include: vec!["**/*.cs".to_string()],
            file_names: Vec::new(),
            configurations: Vec::new(),
            rules: BTreeMap::new(),
            rule_options: BTreeMap::new(),
            mode: RunMode::default(),
        }
    }
}
