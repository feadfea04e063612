use crate::error::RegistryError;
use fixflow_rule_api::{Analyzer, Fixer, LocalSemanticRule, RuleOptions, SyntaxRule};
use fixflow_types::{DiagnosticDescriptor, RuleCategory, RuleMeta};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
enum RuleImpl {
    Syntax(Arc<dyn SyntaxRule>),
    Local(Arc<dyn LocalSemanticRule>),
    Analyzer(Arc<dyn Analyzer>),
}

#[derive(Clone)]
struct Entry {
    meta: RuleMeta,
    rule: RuleImpl,
    options: RuleOptions,
}

/// Explicit, startup-time registration list for every rule the pipeline may run.
///
/// The registry is mutable while the run is being configured (toggles, option bags);
/// [`RuleRegistry::build`] freezes it into the [`RuleSet`] a pipeline run consumes.
///
/// Ordering inside a category is by order key, ties broken by registration sequence.
/// Only enabled rules must hold distinct order keys.
#[derive(Default)]
pub struct RuleRegistry {
    entries: Vec<Entry>,
    fixers: Vec<Arc<dyn Fixer>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_syntax<R: SyntaxRule + 'static>(
        &mut self,
        rule: R,
    ) -> Result<&mut Self, RegistryError> {
        let meta = rule.meta();
        self.insert(meta, RuleCategory::Syntax, RuleImpl::Syntax(Arc::new(rule)))
    }

    pub fn register_local<R: LocalSemanticRule + 'static>(
        &mut self,
        rule: R,
    ) -> Result<&mut Self, RegistryError> {
        let meta = rule.meta();
        self.insert(meta, RuleCategory::LocalSemantic, RuleImpl::Local(Arc::new(rule)))
    }

    /// Register the analyzer half of a global-semantic rule.
    pub fn register_analyzer<A: Analyzer + 'static>(
        &mut self,
        analyzer: A,
    ) -> Result<&mut Self, RegistryError> {
        let meta = analyzer.meta();
        self.insert(
            meta,
            RuleCategory::GlobalSemantic,
            RuleImpl::Analyzer(Arc::new(analyzer)),
        )
    }

    /// Register the fixer half of a global-semantic rule.
    ///
    /// Fixer-to-diagnostic uniqueness is checked when the dispatch table is built.
    pub fn register_fixer<F: Fixer + 'static>(&mut self, fixer: F) -> &mut Self {
        self.fixers.push(Arc::new(fixer));
        self
    }

    fn insert(
        &mut self,
        mut meta: RuleMeta,
        category: RuleCategory,
        rule: RuleImpl,
    ) -> Result<&mut Self, RegistryError> {
        // The registration call, not the rule's own metadata, decides the pass.
        meta.category = category;

        if self.position(&meta.id).is_some() {
            return Err(RegistryError::DuplicateRuleId(meta.id));
        }
        if meta.enabled {
            self.check_order_key(&meta, None)?;
        }

        debug!(
            rule = meta.id.as_str(),
            category = category.as_str(),
            order = meta.order,
            enabled = meta.enabled,
            "registered rule"
        );
        self.entries.push(Entry {
            meta,
            rule,
            options: RuleOptions::default(),
        });
        Ok(self)
    }

    fn position(&self, rule_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.meta.id.eq_ignore_ascii_case(rule_id))
    }

    fn check_order_key(&self, meta: &RuleMeta, skip: Option<usize>) -> Result<(), RegistryError> {
        let clash = self.entries.iter().enumerate().find(|(idx, e)| {
            Some(*idx) != skip
                && e.meta.enabled
                && e.meta.category == meta.category
                && e.meta.order == meta.order
        });
        match clash {
            Some((_, existing)) => Err(RegistryError::DuplicateOrderKey {
                category: meta.category,
                order: meta.order,
                rule_id: meta.id.clone(),
                existing: existing.meta.id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Enable or disable a rule by id (case-insensitive).
    ///
    /// Re-enabling fails with `DuplicateOrderKey` when another enabled rule of the same
    /// category has taken the order key in the meantime.
    pub fn toggle(&mut self, rule_id: &str, enabled: bool) -> Result<(), RegistryError> {
        let idx = self
            .position(rule_id)
            .ok_or_else(|| RegistryError::UnknownRule(rule_id.to_string()))?;

        if enabled && !self.entries[idx].meta.enabled {
            self.check_order_key(&self.entries[idx].meta, Some(idx))?;
        }
        self.entries[idx].meta.enabled = enabled;
        debug!(rule = rule_id, enabled, "toggled rule");
        Ok(())
    }

    /// Attach the option bag a rule receives at invocation time.
    pub fn set_options(&mut self, rule_id: &str, options: RuleOptions) -> Result<(), RegistryError> {
        let idx = self
            .position(rule_id)
            .ok_or_else(|| RegistryError::UnknownRule(rule_id.to_string()))?;
        self.entries[idx].options = options;
        Ok(())
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.position(rule_id).is_some()
    }

    pub fn meta(&self, rule_id: &str) -> Option<&RuleMeta> {
        self.position(rule_id).map(|idx| &self.entries[idx].meta)
    }

    /// Every registered rule, enabled or not, in category / order key / registration order.
    pub fn rules(&self) -> Vec<RuleMeta> {
        self.sorted(|_| true)
            .into_iter()
            .map(|idx| self.entries[idx].meta.clone())
            .collect()
    }

    /// Enabled rules of one category, ascending by order key.
    pub fn rules_in_order(&self, category: RuleCategory) -> Vec<RuleMeta> {
        self.sorted(|e| e.meta.enabled && e.meta.category == category)
            .into_iter()
            .map(|idx| self.entries[idx].meta.clone())
            .collect()
    }

    /// Descriptors advertised by every analyzer (enabled or not), keyed by analyzer id.
    pub fn diagnostic_descriptors(&self) -> Vec<(String, DiagnosticDescriptor)> {
        let mut out = Vec::new();
        for idx in self.sorted(|e| matches!(e.rule, RuleImpl::Analyzer(_))) {
            let entry = &self.entries[idx];
            if let RuleImpl::Analyzer(analyzer) = &entry.rule {
                for desc in analyzer.supported_diagnostics() {
                    out.push((entry.meta.id.clone(), desc));
                }
            }
        }
        out
    }

    pub fn fixers(&self) -> &[Arc<dyn Fixer>] {
        &self.fixers
    }

    fn sorted(&self, keep: impl Fn(&Entry) -> bool) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.entries.len())
            .filter(|&i| keep(&self.entries[i]))
            .collect();
        // Stable: equal keys keep registration sequence.
        idx.sort_by_key(|&i| (self.entries[i].meta.category, self.entries[i].meta.order));
        idx
    }

    /// Freeze the current registrations into an immutable per-run snapshot.
    pub fn build(&self) -> RuleSet {
        let mut set = RuleSet {
            syntax: Vec::new(),
            local: Vec::new(),
            analyzers: Vec::new(),
            fixers: self.fixers.clone(),
            metas: self.rules(),
        };

        for idx in self.sorted(|e| e.meta.enabled) {
            let entry = &self.entries[idx];
            let meta = entry.meta.clone();
            let options = entry.options.clone();
            match &entry.rule {
                RuleImpl::Syntax(rule) => set.syntax.push(BoundRule {
                    meta,
                    rule: Arc::clone(rule),
                    options,
                }),
                RuleImpl::Local(rule) => set.local.push(BoundRule {
                    meta,
                    rule: Arc::clone(rule),
                    options,
                }),
                RuleImpl::Analyzer(rule) => set.analyzers.push(BoundRule {
                    meta,
                    rule: Arc::clone(rule),
                    options,
                }),
            }
        }
        set
    }
}

/// A rule together with the metadata and option bag it runs with.
pub struct BoundRule<R: ?Sized> {
    pub meta: RuleMeta,
    pub rule: Arc<R>,
    pub options: RuleOptions,
}

impl<R: ?Sized> Clone for BoundRule<R> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            rule: Arc::clone(&self.rule),
            options: self.options.clone(),
        }
    }
}

impl<R: ?Sized> BoundRule<R> {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

/// Immutable rule snapshot for one pipeline run. Enabled rules only, already ordered.
#[derive(Clone)]
pub struct RuleSet {
    syntax: Vec<BoundRule<dyn SyntaxRule>>,
    local: Vec<BoundRule<dyn LocalSemanticRule>>,
    analyzers: Vec<BoundRule<dyn Analyzer>>,
    fixers: Vec<Arc<dyn Fixer>>,
    metas: Vec<RuleMeta>,
}

impl RuleSet {
    pub fn syntax_rules(&self) -> &[BoundRule<dyn SyntaxRule>] {
        &self.syntax
    }

    pub fn local_rules(&self) -> &[BoundRule<dyn LocalSemanticRule>] {
        &self.local
    }

    pub fn analyzers(&self) -> &[BoundRule<dyn Analyzer>] {
        &self.analyzers
    }

    pub fn fixers(&self) -> &[Arc<dyn Fixer>] {
        &self.fixers
    }

    /// Metadata of every registered rule, including disabled ones.
    pub fn rules(&self) -> &[RuleMeta] {
        &self.metas
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("syntax", &self.syntax.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field("local", &self.local.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field(
                "analyzers",
                &self.analyzers.iter().map(|r| r.id()).collect::<Vec<_>>(),
            )
            .field("fixers", &self.fixers.iter().map(|f| f.id()).collect::<Vec<_>>())
            .finish()
    }
}
