//! oacheck CLI - Validate captured HTTP responses against an OpenAPI 3.1 contract

mod input;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use oacheck_core::{Config, RegisterOptions};
use oacheck_core::coverage::generate_export_schema;
use oacheck_core::result::generate_result_schema;
use oacheck_validator::{AssertionError, Harness, Registry};

#[derive(Parser)]
#[command(name = "oacheck")]
#[command(about = "Validate captured HTTP responses against an OpenAPI 3.1 contract")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate captured responses (JSON lines, or `-` for stdin)
    Check {
        /// Captured responses file
        responses: String,

        /// Config file (default: .oacheck.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// OpenAPI spec (repeatable; overrides config `specs`)
        #[arg(short, long = "spec")]
        specs: Vec<String>,

        /// Print the coverage summary. Use --report false to disable.
        #[arg(long, action = ArgAction::Set)]
        report: Option<bool>,

        /// Export uncovered endpoints as JSON
        #[arg(long)]
        export: bool,

        /// Export destination (default: coverage.json)
        #[arg(long)]
        export_path: Option<PathBuf>,
    },

    /// List every declared (route, method, statuses) endpoint
    Endpoints {
        /// Config file (default: .oacheck.toml)
        #[arg(short, long)]
        config: Option<String>,

        /// OpenAPI spec (repeatable; overrides config `specs`)
        #[arg(short, long = "spec")]
        specs: Vec<String>,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the interchange formats
    Schema {
        #[arg(long, default_value = "validation")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    /// Validation result (`--output json` lines)
    Validation,
    /// Uncovered-endpoint export file
    Coverage,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("OACHECK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let cfg = match path {
        Some(p) => Config::load(Path::new(p))?,
        None => Config::load_default()?,
    };
    Ok(cfg)
}

/// Command-line values that take precedence over the config file.
#[derive(Default)]
struct Overrides {
    specs: Vec<String>,
    report: Option<bool>,
    export: bool,
    export_path: Option<PathBuf>,
}

fn apply_overrides(cfg: &mut Config, overrides: Overrides) {
    if !overrides.specs.is_empty() {
        cfg.specs = overrides.specs;
    }
    if let Some(report) = overrides.report {
        cfg.report = report;
    }
    cfg.export |= overrides.export;
    if let Some(path) = overrides.export_path {
        cfg.export_path = path;
    }
    tracing::debug!(
        specs = ?cfg.specs,
        report = cfg.report,
        export = cfg.export,
        export_path = %cfg.export_path.display(),
        "effective config"
    );
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Check {
            responses,
            config,
            specs,
            report,
            export,
            export_path,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            apply_overrides(
                &mut cfg,
                Overrides {
                    specs,
                    report,
                    export,
                    export_path,
                },
            );
            check(&cfg, &responses, cli.output)
        }

        Commands::Endpoints { config, specs } => {
            let mut cfg = load_config(config.as_deref())?;
            apply_overrides(
                &mut cfg,
                Overrides {
                    specs,
                    ..Overrides::default()
                },
            );
            let registry = Registry::from_specs(&cfg.specs)?;
            match cli.output {
                OutputFormat::Terminal => {
                    for e in registry.endpoints() {
                        println!("{:<7} {}  [{}]", e.method, e.route, e.statuses.join(", "));
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(registry.endpoints())?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Init => {
            let path = Path::new(".oacheck.toml");
            if path.exists() {
                eprintln!(".oacheck.toml already exists");
                return Ok(1);
            }
            std::fs::write(path, Config::example()).context("writing .oacheck.toml")?;
            println!("Created .oacheck.toml");
            Ok(0)
        }

        Commands::Schema { kind } => {
            let schema = match kind {
                SchemaKind::Validation => generate_result_schema(),
                SchemaKind::Coverage => generate_export_schema(),
            };
            println!("{schema}");
            Ok(0)
        }
    }
}

fn check(cfg: &Config, responses: &str, output: OutputFormat) -> Result<u8> {
    let captured = input::read_captured(responses)?;

    tracing::debug!(responses = captured.len(), source = responses, "read captured responses");

    let harness = Harness::new();
    let options = RegisterOptions {
        // Silent mode never prints the summary
        report_on_exit: cfg.report && output == OutputFormat::Terminal,
        ..cfg.register_options()
    };
    harness.register_specs(&cfg.specs, options)?;

    if output == OutputFormat::Terminal {
        eprintln!("Config:");
        eprintln!("  specs:     {}", cfg.specs.join(", "));
        eprintln!("  responses: {} captured", captured.len());
        eprintln!();
    }

    let mut failed = 0_usize;
    for item in &captured {
        let outcome = harness.assert_response(&item.value);
        match output {
            OutputFormat::Terminal => print_terminal(item.line, &outcome),
            OutputFormat::Json => print_json(item.line, &outcome)?,
            OutputFormat::Silent => {}
        }
        if outcome.is_err() {
            failed += 1;
        }
    }

    let summary = harness.finalize()?;
    if output == OutputFormat::Terminal {
        println!();
        println!(
            "Result: {} passed, {failed} failed",
            captured.len() - failed
        );
        if let Some(path) = &summary.exported_to {
            println!("Uncovered endpoints written to {}", path.display());
        }
    }

    Ok(if failed == 0 { 0 } else { 1 })
}

fn print_terminal(line: usize, outcome: &Result<(), AssertionError>) {
    let Err(err) = outcome else {
        return;
    };
    println!("✗ line {line}: {err}");
    for issue in err.issues() {
        let path = if issue.path.is_empty() { "(body)" } else { issue.path.as_str() };
        match &issue.keyword {
            Some(keyword) => println!("    {path} [{keyword}] {}", issue.message),
            None => println!("    {path} {}", issue.message),
        }
    }
}

fn print_json(line: usize, outcome: &Result<(), AssertionError>) -> Result<()> {
    let record = match outcome {
        Ok(()) => serde_json::json!({"line": line, "valid": true}),
        Err(err) => serde_json::json!({
            "line": line,
            "valid": false,
            "message": err.to_string(),
            "errors": err.issues(),
        }),
    };
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}
