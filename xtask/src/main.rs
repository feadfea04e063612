use anyhow::Context;
use clap::{Parser, Subcommand};
use fs_err as fs;
use std::path::Path;
use std::process::Command as ProcessCommand;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by fixflow.
    PrintSchemas,
    /// Write the default fixflow.toml (every built-in rule with its default state).
    SampleConfig {
        #[arg(long, default_value = "fixflow.toml")]
        out: String,
    },
    /// Run the property tests with a larger case count.
    Proptest {
        #[arg(long, default_value_t = 1024)]
        cases: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", fixflow_types::schema::FIXFLOW_RUN_REPORT_V1);
            println!("{}", fixflow_types::schema::FIXFLOW_RULE_LIST_V1);
        }
        Command::SampleConfig { out } => {
            if let Some(parent) = Path::new(&out).parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
            }
            let status = ProcessCommand::new("cargo")
                .args(["run", "-q", "-p", "fixflow", "--", "export-options", "--out", &out])
                .status()
                .context("run fixflow export-options")?;
            if !status.success() {
                anyhow::bail!("sample-config failed");
            }
            println!("wrote {out}");
        }
        Command::Proptest { cases } => {
            for (package, test) in [
                ("fixflow-domain", "proptest_ordering"),
                ("fixflow-edit", "conflict_safety"),
                ("fixflow-core", "idempotence"),
                ("fixflow-rules", "builtin_pipeline"),
            ] {
                let status = ProcessCommand::new("cargo")
                    .args(["test", "-p", package, "--test", test])
                    .env("PROPTEST_CASES", cases.to_string())
                    .status()
                    .with_context(|| format!("run {package} --test {test}"))?;
                if !status.success() {
                    anyhow::bail!("proptest run failed for {package}/{test}");
                }
            }
        }
    }
    Ok(())
}
