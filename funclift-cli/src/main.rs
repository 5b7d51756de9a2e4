//! funclift CLI - extract a Java variable initializer into a functional class

// Global invariants enforced:
// - Exit code identifies the failing stage (see `ErrorKind::exit_code`)
// - Results go to stdout, notices and logs to stderr

use anyhow::Context;
use clap::{Parser, Subcommand};
use funclift_core::batch;
use funclift_core::config::{self, ResolvedConfig};
use funclift_core::pipeline;
use funclift_core::report::{self, ExtractionReport};
use funclift_core::SourceRange;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "funclift")]
#[command(about = "Extract a Java local variable initializer into a standalone functional class")]
#[command(version = env!("FUNCLIFT_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the declaration at RANGE into its own class
    Extract {
        /// Java source file
        path: PathBuf,

        /// Selection as LINE:COL-LINE:COL (or LINE:COL for a caret)
        range: SourceRange,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fail instead of overwriting an existing generated file
        #[arg(long)]
        strict: bool,

        /// Print the generated source instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Run every extraction listed in a JSON manifest
    Batch {
        /// Manifest: { "requests": [ { "path": ..., "range": "L:C-L:C" } ] }
        manifest: PathBuf,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fail instead of overwriting an existing generated file
        #[arg(long)]
        strict: bool,

        /// Report what would be generated without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(1),
            };
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Log to stderr; `RUST_LOG` applies unless `-v` asks for more
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Extract {
            path,
            range,
            config: config_path,
            strict,
            dry_run,
            format,
        } => {
            let path = absolute(path)?;
            let resolved = load_config(&path, config_path.as_deref(), strict)?;
            extract(&path, range, &resolved, dry_run, format)
        }
        Commands::Batch {
            manifest,
            config: config_path,
            strict,
            dry_run,
            format,
        } => {
            let manifest_path = absolute(manifest)?;
            let manifest = batch::load_manifest(&manifest_path)?;
            let resolved = load_config(&manifest_path, config_path.as_deref(), strict)?;
            run_batch(&manifest, &resolved, dry_run, format)
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                        Ok(0)
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        Ok(1)
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!();
                println!("Generated unit:");
                println!("  interface: {}", resolved.interface);
                println!("  annotation: {}", resolved.annotation);
                println!("  method: {}", resolved.method);
                println!("  box_primitives: {}", resolved.box_primitives);
                println!("  copy_imports: {}", resolved.copy_imports);
                println!();
                println!("Output:");
                println!("  strict: {}", resolved.strict);
                println!("  indent: {}", resolved.indent);
                Ok(0)
            }
        },
    }
}

fn absolute(path: PathBuf) -> anyhow::Result<PathBuf> {
    if path.is_relative() {
        Ok(std::env::current_dir()?.join(path))
    } else {
        Ok(path)
    }
}

/// Resolve config for the project containing `path`; CLI flags win
fn load_config(
    path: &Path,
    config_path: Option<&Path>,
    strict: bool,
) -> anyhow::Result<ResolvedConfig> {
    let project_root = config::find_project_root(path);
    debug!(root = %project_root.display(), "project root");
    let mut resolved = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    if strict {
        resolved.strict = true;
    }
    Ok(resolved)
}

fn extract(
    path: &Path,
    range: SourceRange,
    resolved: &ResolvedConfig,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<u8> {
    let extraction = match pipeline::execute(path, range, resolved) {
        Ok(extraction) => extraction,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_code(e.exit_code()));
        }
    };

    if dry_run {
        match format {
            OutputFormat::Text => print!("{}", extraction.rendered),
            OutputFormat::Json => {
                let report =
                    ExtractionReport::new(&extraction, false).with_source(&extraction.rendered);
                println!("{}", report::render_json(&report));
            }
        }
        return Ok(0);
    }

    if let Err(e) = pipeline::write(&extraction, resolved.strict) {
        eprintln!("error: {}", e);
        return Ok(exit_code(e.exit_code()));
    }
    eprintln!("Wrote {}", extraction.target.display());

    let report = ExtractionReport::new(&extraction, true);
    match format {
        OutputFormat::Text => print!("{}", report::render_text(&report)),
        OutputFormat::Json => println!("{}", report::render_json(&report)),
    }
    Ok(0)
}

fn run_batch(
    manifest: &batch::BatchManifest,
    resolved: &ResolvedConfig,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<u8> {
    let progress = ProgressBar::new(manifest.requests.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        progress.set_style(style);
    }

    let outcomes = batch::run_batch(manifest, resolved, !dry_run, &|| progress.inc(1));
    progress.finish_and_clear();

    let reports: Vec<_> = outcomes.iter().map(batch::BatchOutcome::report).collect();
    match format {
        OutputFormat::Text => print!("{}", report::render_outcomes_text(&reports)),
        OutputFormat::Json => println!("{}", report::render_outcomes_json(&reports)),
    }

    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            eprintln!("error: {}", e);
        }
    }
    Ok(exit_code(batch::exit_code(&outcomes)))
}

fn exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
