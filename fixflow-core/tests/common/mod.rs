//! Shared fixtures: a line-oriented in-memory provider and a handful of small rules.
#![allow(dead_code)]

use fixflow_core::ports::{ProjectInput, UnitInput};
use fixflow_rule_api::{
    Analyzer, AnalysisProvider, CancellationToken, CompilationContext, Diagnostic,
    DiagnosticDescriptor, Edit, Facts, FixProposal, Fixer, PreprocessorConfiguration,
    RuleCategory, RuleMeta, RuleOptions, Severity, SourceUnit, Span, SyntaxRule, UnitId,
};

/// Text is the whole model. Parsing fails on units containing `UNPARSEABLE`.
pub struct MemProvider;

impl AnalysisProvider for MemProvider {
    fn parse(
        &self,
        id: &UnitId,
        text: &str,
        configuration: &PreprocessorConfiguration,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<SourceUnit> {
        if text.contains("UNPARSEABLE") {
            anyhow::bail!("cannot parse {id}");
        }
        Ok(SourceUnit::new(
            id.clone(),
            text,
            configuration.clone(),
            Facts::none(),
        ))
    }

    fn unit_semantics(&self, _: &SourceUnit, _: &CancellationToken) -> anyhow::Result<Facts> {
        Ok(Facts::none())
    }

    fn compile(
        &self,
        project: &str,
        units: &[SourceUnit],
        configuration: &PreprocessorConfiguration,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<CompilationContext> {
        Ok(CompilationContext::new(
            project,
            configuration.clone(),
            units.to_vec(),
            Facts::none(),
        ))
    }
}

pub fn project(name: &str, units: &[(&str, &str)]) -> ProjectInput {
    ProjectInput {
        name: name.to_string(),
        units: units.iter().map(|(id, text)| UnitInput::new(*id, *text)).collect(),
    }
}

/// Strips trailing spaces from every line.
pub struct TrimTrailing;

impl SyntaxRule for TrimTrailing {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new("trim-trailing", "Remove trailing spaces", RuleCategory::Syntax, 10)
    }

    fn process(&self, unit: &SourceUnit, _: &RuleOptions) -> anyhow::Result<Option<String>> {
        let out = unit
            .text()
            .split('\n')
            .map(|l| l.trim_end_matches(' '))
            .collect::<Vec<_>>()
            .join("\n");
        Ok((out != unit.text()).then_some(out))
    }
}

/// Reports every `TODO` as `T001`.
pub struct TodoAnalyzer;

pub fn todo_descriptor() -> DiagnosticDescriptor {
    DiagnosticDescriptor::new("T001", "Unresolved TODO", Severity::Warning)
}

impl Analyzer for TodoAnalyzer {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new("todo", "Find TODO markers", RuleCategory::GlobalSemantic, 10)
    }

    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
        vec![todo_descriptor()]
    }

    fn analyze(
        &self,
        unit: &SourceUnit,
        _: &CompilationContext,
        _: &RuleOptions,
    ) -> anyhow::Result<Vec<Diagnostic>> {
        let desc = todo_descriptor();
        Ok(unit
            .text()
            .match_indices("TODO")
            .map(|(at, m)| desc.at(unit.id(), Span::new(at, m.len())))
            .collect())
    }
}

/// Rewrites `TODO` to `done`; lowercase so a fix can never complete a new marker.
pub struct TodoFixer;

impl Fixer for TodoFixer {
    fn id(&self) -> &str {
        "todo-fixer"
    }

    fn fixable_diagnostic_ids(&self) -> Vec<String> {
        vec!["T001".to_string()]
    }

    fn propose(
        &self,
        diagnostic: &Diagnostic,
        _: &SourceUnit,
        _: &CompilationContext,
    ) -> anyhow::Result<Vec<FixProposal>> {
        Ok(vec![FixProposal::for_diagnostic(
            diagnostic,
            vec![Edit::new(diagnostic.span, "done")],
        )])
    }
}

/// Reports a fixed span on every unit, with a fixer replacing it by `replacement`.
pub struct FixedSpan {
    pub id: &'static str,
    pub order: u32,
    pub span: Span,
    pub replacement: &'static str,
}

impl Analyzer for FixedSpan {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new(self.id, "Fixed span", RuleCategory::GlobalSemantic, self.order)
    }

    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
        vec![DiagnosticDescriptor::new(self.id, "Fixed span", Severity::Info)]
    }

    fn analyze(
        &self,
        unit: &SourceUnit,
        _: &CompilationContext,
        _: &RuleOptions,
    ) -> anyhow::Result<Vec<Diagnostic>> {
        if unit.text().len() < self.span.end() {
            return Ok(Vec::new());
        }
        Ok(vec![
            DiagnosticDescriptor::new(self.id, "Fixed span", Severity::Info).at(unit.id(), self.span),
        ])
    }
}

impl Fixer for FixedSpan {
    fn id(&self) -> &str {
        self.id
    }

    fn fixable_diagnostic_ids(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }

    fn propose(
        &self,
        diagnostic: &Diagnostic,
        _: &SourceUnit,
        _: &CompilationContext,
    ) -> anyhow::Result<Vec<FixProposal>> {
        Ok(vec![FixProposal::for_diagnostic(
            diagnostic,
            vec![Edit::new(diagnostic.span, self.replacement)],
        )])
    }
}

/// Fails on one unit, reports `B001` at the start of every other unit. No fixer.
pub struct BrittleAnalyzer {
    pub fails_on: &'static str,
}

impl Analyzer for BrittleAnalyzer {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new("brittle", "Fails on one unit", RuleCategory::GlobalSemantic, 20)
    }

    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
        vec![DiagnosticDescriptor::new("B001", "Brittle", Severity::Info)]
    }

    fn analyze(
        &self,
        unit: &SourceUnit,
        _: &CompilationContext,
        _: &RuleOptions,
    ) -> anyhow::Result<Vec<Diagnostic>> {
        if unit.id().as_str() == self.fails_on {
            panic!("analyzer bug on {}", unit.id());
        }
        Ok(vec![
            DiagnosticDescriptor::new("B001", "Brittle", Severity::Info)
                .at(unit.id(), Span::empty(0)),
        ])
    }
}

/// Reports the symbols of the configuration it runs under as the diagnostic message.
pub struct SymbolProbe;

impl Analyzer for SymbolProbe {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new("symbol-probe", "Echo configuration", RuleCategory::GlobalSemantic, 30)
    }

    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
        vec![DiagnosticDescriptor::new("P001", "Symbols", Severity::Info)]
    }

    fn analyze(
        &self,
        unit: &SourceUnit,
        context: &CompilationContext,
        _: &RuleOptions,
    ) -> anyhow::Result<Vec<Diagnostic>> {
        assert_eq!(unit.configuration(), context.configuration());
        let symbols = unit.configuration().symbols.join(",");
        Ok(vec![
            DiagnosticDescriptor::new("P001", "Symbols", Severity::Info)
                .at(unit.id(), Span::empty(0))
                .with_message(symbols),
        ])
    }
}

/// Cancels the shared token the first time it runs.
pub struct CancelOnFirstUse {
    pub token: CancellationToken,
}

impl SyntaxRule for CancelOnFirstUse {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new("cancel", "Cancel the run", RuleCategory::Syntax, 20)
    }

    fn process(&self, unit: &SourceUnit, _: &RuleOptions) -> anyhow::Result<Option<String>> {
        self.token.cancel();
        Ok(Some(format!("{}// touched\n", unit.text())))
    }
}
