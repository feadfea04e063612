//! Configuration file loading for fixflow.
//!
//! Discovers and loads `fixflow.toml` from the first project root (or an explicit path).
//! Merges config file settings with CLI arguments: CLI wins for toggles and options, CLI
//! lists extend file lists.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fixflow_core::settings::{FormatSettings, RunMode};
use fixflow_rule_api::{PreprocessorConfiguration, RuleOptions};
use fixflow_types::RuleMeta;
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeMap;
use toml_edit::{Array, DocumentMut, Item, Table, value};
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "fixflow.toml";

/// Top-level configuration from fixflow.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixflowConfig {
    pub rules: RulesConfig,
    pub preprocessor: PreprocessorConfig,
    pub files: FilesConfig,
}

/// `[rules]`: `<rule-id> = <bool>` plus `[rules.options.<rule-id>]` bags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Option values of any scalar type; they reach rules as strings.
    pub options: BTreeMap<String, BTreeMap<String, toml::Value>>,

    #[serde(flatten)]
    pub toggles: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    /// Symbol sets, one per extra configuration. The base configuration is implicit.
    pub configurations: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Glob patterns relative to each root. Empty means the built-in default.
    pub include: Vec<String>,
    /// Optional file-name filter.
    pub names: Vec<String>,
}

/// Discover `fixflow.toml` in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<FixflowConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<FixflowConfig> {
    let config: FixflowConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return the default if there is none.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<FixflowConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(FixflowConfig::default()),
    }
}

/// Settings given on the command line, already parsed.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub roots: Vec<Utf8PathBuf>,
    pub rules: Vec<(String, bool)>,
    pub options: Vec<RuleOption>,
    pub configurations: Vec<Vec<String>>,
    pub include: Vec<String>,
    pub file_names: Vec<String>,
    pub mode: RunMode,
}

/// `<rule>.<key>=<value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOption {
    pub rule: String,
    pub key: String,
    pub value: String,
}

/// Builder for merging the config file with CLI arguments.
pub struct ConfigMerger {
    config: FixflowConfig,
}

impl ConfigMerger {
    pub fn new(config: FixflowConfig) -> Self {
        Self { config }
    }

    /// Rule ids are lowercased so a CLI toggle replaces a file toggle regardless of case.
    pub fn merge(self, cli: CliOverrides) -> FormatSettings {
        let defaults = FormatSettings::default();

        let mut rules = BTreeMap::new();
        for (id, enabled) in self.config.rules.toggles {
            rules.insert(id.to_ascii_lowercase(), enabled);
        }
        for (id, enabled) in cli.rules {
            rules.insert(id.to_ascii_lowercase(), enabled);
        }

        let mut rule_options: BTreeMap<String, RuleOptions> = BTreeMap::new();
        for (rule, bag) in self.config.rules.options {
            let options = rule_options.entry(rule.to_ascii_lowercase()).or_default();
            for (key, v) in bag {
                options.insert(key, option_value(&v));
            }
        }
        for opt in cli.options {
            rule_options
                .entry(opt.rule.to_ascii_lowercase())
                .or_default()
                .insert(opt.key, opt.value);
        }

        let mut symbol_sets = self.config.preprocessor.configurations;
        extend_unique(&mut symbol_sets, cli.configurations);
        let configurations = symbol_sets
            .into_iter()
            .map(PreprocessorConfiguration::from_symbols)
            .collect();

        let mut include = self.config.files.include;
        extend_unique(&mut include, cli.include);
        if include.is_empty() {
            include = defaults.include;
        }

        let mut file_names = self.config.files.names;
        extend_unique(&mut file_names, cli.file_names);

        FormatSettings {
            roots: if cli.roots.is_empty() {
                defaults.roots
            } else {
                cli.roots
            },
            include,
            file_names,
            configurations,
            rules,
            rule_options,
            mode: cli.mode,
        }
    }
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, more: Vec<T>) {
    for item in more {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

fn option_value(v: &toml::Value) -> String {
    match v {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse `--rule <id>=<true|false>` entries.
pub fn parse_rule_toggles(entries: &[String]) -> anyhow::Result<Vec<(String, bool)>> {
    entries
        .iter()
        .map(|entry| {
            let (id, enabled) = split_key_value(entry, "rule toggle")?;
            let enabled = match enabled.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => anyhow::bail!(
                    "invalid rule toggle '{}': expected true or false, got '{}'",
                    entry,
                    enabled
                ),
            };
            Ok((id.to_string(), enabled))
        })
        .collect()
}

/// Parse `--option <rule>.<key>=<value>` entries.
pub fn parse_rule_options(entries: &[String]) -> anyhow::Result<Vec<RuleOption>> {
    entries
        .iter()
        .map(|entry| {
            let (path, value) = split_key_value(entry, "rule option")?;
            let Some((rule, key)) = path.split_once('.').filter(|(r, k)| !r.is_empty() && !k.is_empty())
            else {
                anyhow::bail!("invalid rule option '{}': expected <rule>.<key>=<value>", entry);
            };
            Ok(RuleOption {
                rule: rule.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Parse `--configuration DEBUG,TRACE` entries into symbol sets.
pub fn parse_configurations(entries: &[String]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}

fn split_key_value<'a>(entry: &'a str, what: &str) -> anyhow::Result<(&'a str, &'a str)> {
    let mut parts = entry.splitn(2, '=');
    let key = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("invalid {} '{}': missing key", what, entry))?;
    let value = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("invalid {} '{}': missing value", what, entry))?;
    Ok((key, value))
}

/// Commented default `fixflow.toml` listing every rule with its default state.
pub fn export_options(rules: &[RuleMeta]) -> String {
    let mut doc = DocumentMut::new();

    let mut rule_table = Table::new();
    rule_table.decor_mut().set_prefix(
        "# Rules by id (case-insensitive); `false` disables a rule.\n\
         # Option bags go in [rules.options.<rule-id>].\n",
    );
    for meta in rules {
        rule_table.insert(&meta.id, value(meta.enabled));
        if let Some(mut key) = rule_table.key_mut(&meta.id) {
            key.leaf_decor_mut().set_prefix(format!(
                "# {} ({}, order {})\n",
                meta.description, meta.category, meta.order
            ));
        }
    }
    doc.insert("rules", Item::Table(rule_table));

    let mut preprocessor = Table::new();
    preprocessor
        .decor_mut()
        .set_prefix("\n# Extra symbol sets; the configuration without symbols always runs first.\n");
    preprocessor.insert("configurations", value(Array::new()));
    doc.insert("preprocessor", Item::Table(preprocessor));

    let mut files = Table::new();
    files.decor_mut().set_prefix("\n");
    let mut include = Array::new();
    for pattern in FormatSettings::default().include {
        include.push(pattern);
    }
    files.insert("include", value(include));
    files.insert("names", value(Array::new()));
    doc.insert("files", Item::Table(files));

    doc.to_string()
}
