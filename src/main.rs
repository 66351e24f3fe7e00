//! Conform CLI - Source Conformance Engine
//!
//! Scans source files, applies conformance rules with automatic
//! fixes, and reports the result.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use conform::audit;
use conform::config::Config;
use conform::output::{JsonFormatter, ReportFormatter, TextFormatter};
use conform::pipeline::{RunMode, Runner};
use conform::report::RunReport;
use conform::scope::Scope;
use glob::glob;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "conform",
    version,
    about = "Source conformance engine",
    long_about = "Scans source files, applies ordered conformance rules with automatic fixes, \
                  and produces a deterministic report. Dry-run by default; use --write to apply fixes."
)]
struct Cli {
    /// Files or glob patterns to scan (default: resolve scope from the
    /// current directory)
    files: Vec<String>,

    /// Configuration file path (yaml or json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Glob pattern replacing the configured include list
    #[arg(short, long)]
    scope: Option<String>,

    /// Write fixes back to files (default is dry-run)
    #[arg(short, long)]
    write: bool,

    /// Run architecture audit checks over the whole tree
    #[arg(short, long)]
    audit: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value = "0")]
    jobs: usize,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List rules in pipeline order and exit
    #[arg(long)]
    list_rules: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::new(),
    };

    if cli.jobs > 0 {
        config.engine.jobs = cli.jobs;
    }

    let scope = Scope::new(&config.files, cli.scope.as_deref())?;
    let root = std::env::current_dir().context("failed to resolve current directory")?;

    let mode = if cli.write {
        RunMode::Apply
    } else {
        RunMode::DryRun
    };
    let runner = Runner::new(config, mode, &root)?;

    if cli.list_rules {
        println!("{}", "Rules, in pipeline order:".bold());
        for rule in runner.rules() {
            println!(
                "  {} [{}] {}",
                rule.id().to_string().cyan(),
                rule.kind(),
                rule.description()
            );
        }
        return Ok(0);
    }

    let files = if cli.files.is_empty() {
        scope.resolve(&root).context("failed to resolve scope")?
    } else {
        // Positional patterns expand relative to the scan root; paths
        // are anchored so they match the configured package roots.
        expand_patterns(&cli.files)?
            .into_iter()
            .map(|p| if p.is_relative() { root.join(p) } else { p })
            .collect()
    };

    if files.is_empty() {
        eprintln!("{}: no files in scope", "error".red().bold());
        return Ok(2);
    }

    if cli.verbose {
        eprintln!(
            "Scanning {} files ({})...",
            files.len(),
            match mode {
                RunMode::DryRun => "dry-run",
                RunMode::Apply => "apply",
            }
        );
    }

    let start = Instant::now();
    let outcomes = runner.run(&files);

    let audit = if cli.audit {
        Some(audit::run_audit(&root).context("audit walk failed")?)
    } else {
        None
    };

    let report = RunReport::assemble(outcomes, audit, runner.mode(), start.elapsed());

    let formatter: Box<dyn ReportFormatter> = match cli.format {
        Format::Text => {
            let mut f = TextFormatter::new();
            if cli.no_color {
                f = f.without_color();
            }
            Box::new(f)
        }
        Format::Json => Box::new(JsonFormatter::new().pretty()),
    };
    print!("{}", formatter.format(&report));

    Ok(report.exit_code())
}

/// Expand positional glob patterns into a sorted file list
fn expand_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths = glob(pattern).with_context(|| format!("invalid pattern '{}'", pattern))?;
        for entry in paths.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}
