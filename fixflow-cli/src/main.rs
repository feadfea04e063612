mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use fixflow_core::adapters::{FsPersistenceSink, FsUnitSource, TracingReportSink};
use fixflow_core::format::{FormatOutcome, run_format};
use fixflow_core::ports::PersistenceSink;
use fixflow_core::settings::RunMode;
use fixflow_core::{CancellationToken, PipelineError};
use fixflow_render::render_rule_list;
use fixflow_rules::{TextProvider, builtin_registry};
use fixflow_types::schema::FIXFLOW_RULE_LIST_V1;
use fs_err as fs;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "fixflow",
    version,
    about = "Rule-driven source formatter: syntax rules, semantic rules, then conflict-checked fixes."
)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every pass and write changed units back to disk.
    Format(RunArgs),
    /// Run every pass without writing; exit 2 if anything would change.
    Check(RunArgs),
    /// List registered rules and the diagnostics analyzers report.
    List(ListArgs),
    /// Print a commented default fixflow.toml.
    ExportOptions(ExportOptionsArgs),
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// Project roots, one project each (default: current directory).
    roots: Vec<Utf8PathBuf>,

    /// Config file (default: <first root>/fixflow.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Enable or disable a rule by id (repeatable).
    #[arg(long = "rule", value_name = "ID=BOOL")]
    rules: Vec<String>,

    /// Set a rule option (repeatable).
    #[arg(long = "option", value_name = "RULE.KEY=VALUE")]
    options: Vec<String>,

    /// Extra preprocessor configuration as comma-separated symbols (repeatable).
    #[arg(long = "configuration", value_name = "SYMBOLS")]
    configurations: Vec<String>,

    /// Glob pattern selecting units, relative to each root (repeatable).
    #[arg(long)]
    include: Vec<String>,

    /// Only process units with this file name (repeatable).
    #[arg(long = "file", value_name = "NAME")]
    file_names: Vec<String>,

    /// Write the unified diff of all changes to this file.
    #[arg(long)]
    patch: Option<Utf8PathBuf>,

    /// Write the JSON run report to this file.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct ListArgs {
    /// Only list analyzer diagnostics.
    #[arg(long, default_value_t = false)]
    analyzers: bool,

    /// Only list rules.
    #[arg(long, default_value_t = false)]
    rules: bool,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ExportOptionsArgs {
    /// Write to this file instead of stdout.
    #[arg(long)]
    out: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// 130 for a cancelled run, 1 for every other failure.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PipelineError>()
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}

/// Cancel `token` on Ctrl-C. The run stops at its next checkpoint and nothing is persisted.
fn cancel_on_interrupt(token: &CancellationToken) -> anyhow::Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        warn!("interrupt received, cancelling");
        token.cancel();
    })
    .context("install Ctrl-C handler")
}

fn real_main(cli: Cli) -> anyhow::Result<u8> {
    match cli.cmd {
        Command::Format(args) => cmd_run(args, RunMode::Format),
        Command::Check(args) => cmd_run(args, RunMode::Check),
        Command::List(args) => cmd_list(args).map(|()| 0),
        Command::ExportOptions(args) => cmd_export_options(args).map(|()| 0),
    }
}

fn cmd_run(args: RunArgs, mode: RunMode) -> anyhow::Result<u8> {
    let first_root = args
        .roots
        .first()
        .cloned()
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let file_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_default(&first_root).context("load fixflow.toml config")?,
    };

    let overrides = CliOverrides {
        roots: args.roots.clone(),
        rules: config::parse_rule_toggles(&args.rules)?,
        options: config::parse_rule_options(&args.options)?,
        configurations: config::parse_configurations(&args.configurations),
        include: args.include.clone(),
        file_names: args.file_names.clone(),
        mode,
    };
    let settings = ConfigMerger::new(file_config).merge(overrides);

    debug!(
        "merged config: roots={:?}, include={:?}, rules={:?}, configurations={}, mode={:?}",
        settings.roots,
        settings.include,
        settings.rules,
        settings.configurations.len(),
        settings.mode
    );

    let registry = builtin_registry().context("register built-in rules")?;
    let source = FsUnitSource::new(settings.roots.clone(), settings.include.clone());
    let persistence: Option<Arc<dyn PersistenceSink>> = match mode {
        RunMode::Format => Some(Arc::new(FsPersistenceSink)),
        RunMode::Check => None,
    };

    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel)?;

    let outcome = run_format(
        &settings,
        registry,
        Arc::new(TextProvider),
        &source,
        persistence,
        Arc::new(TracingReportSink),
        &cancel,
    )?;

    write_outputs(&args, &outcome)?;
    print!("{}", outcome.summary_md);
    if mode == RunMode::Check {
        print_remaining(&outcome);
    }

    info!(
        units = outcome.report.summary.units_total,
        changed = outcome.report.summary.units_changed,
        "{} finished",
        match mode {
            RunMode::Format => "format",
            RunMode::Check => "check",
        }
    );
    Ok(if outcome.needs_attention { 2 } else { 0 })
}

fn write_outputs(args: &RunArgs, outcome: &FormatOutcome) -> anyhow::Result<()> {
    if let Some(path) = &args.patch {
        fs::write(path, &outcome.patch).with_context(|| format!("write {}", path))?;
        info!("wrote patch to {}", path);
    }
    if let Some(path) = &args.report {
        write_json(path, &outcome.report)?;
        info!("wrote report to {}", path);
    }
    Ok(())
}

fn print_remaining(outcome: &FormatOutcome) {
    if outcome.remaining.is_empty() {
        return;
    }
    println!("## Remaining diagnostics\n");
    for group in &outcome.remaining {
        for d in &group.diagnostics {
            println!(
                "- {}/{} {} `{}` ({}) [{}]: {}",
                group.project.trim_end_matches('/'),
                d.unit,
                d.span,
                d.rule_id,
                d.severity.as_str(),
                group.configuration,
                d.message
            );
        }
    }
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    let registry = builtin_registry().context("register built-in rules")?;
    let both = !args.analyzers && !args.rules;
    let rules = if both || args.rules {
        registry.rules()
    } else {
        Vec::new()
    };
    let descriptors = if both || args.analyzers {
        registry.diagnostic_descriptors()
    } else {
        Vec::new()
    };

    match args.format {
        OutputFormat::Text => print!("{}", render_rule_list(&rules, &descriptors)),
        OutputFormat::Json => {
            let analyzers: Vec<_> = descriptors
                .iter()
                .map(|(analyzer, d)| {
                    serde_json::json!({
                        "analyzer": analyzer,
                        "id": d.id,
                        "title": d.title,
                        "severity": d.severity,
                    })
                })
                .collect();
            let doc = serde_json::json!({
                "schema": FIXFLOW_RULE_LIST_V1,
                "rules": rules,
                "analyzers": analyzers,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}

fn cmd_export_options(args: ExportOptionsArgs) -> anyhow::Result<()> {
    let registry = builtin_registry().context("register built-in rules")?;
    let text = config::export_options(&registry.rules());
    match &args.out {
        Some(path) => {
            fs::write(path, &text).with_context(|| format!("write {}", path))?;
            info!("wrote default options to {}", path);
        }
        None => print!("{}", text),
    }
    Ok(())
}
