mod checks;
mod config;
mod discover;
mod report;
mod runner;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokenguard_core::{BlockingPolicy, Classifier, Extractor, FileSystemProvider, Registry};

use crate::checks::CheckKind;
use crate::config::Config;
use crate::runner::{RunOptions, Runner};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Design-token compliance checks and literal-to-token migration.
#[derive(Parser)]
#[command(
    name = "tokenguard",
    version,
    about = "Design-token compliance checks and literal-to-token migration"
)]
struct Cli {
    /// Files, directories or glob patterns to scan
    #[arg(required_unless_present = "list")]
    patterns: Vec<String>,

    /// Write migrations to disk (default is a dry run)
    #[arg(long)]
    apply: bool,

    /// Run a single named check module
    #[arg(long)]
    module: Option<String>,

    /// Show full before/after text for every edit
    #[arg(long)]
    verbose: bool,

    /// Stop at the first blocking violation
    #[arg(long)]
    fail_fast: bool,

    /// List available check modules and exit
    #[arg(long)]
    list: bool,

    /// Treat unknown token references as blocking
    #[arg(long)]
    strict: bool,

    /// Token registry definition (JSON); overrides the config file
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Config file (default: tokenguard.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads (default: available parallelism)
    #[arg(long)]
    jobs: Option<usize>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("config error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    if cli.list {
        cmd_list(&config, cli.output);
        return;
    }

    let code = cmd_run(&cli, &config);
    process::exit(code);
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "tokenguard=info"
    } else {
        "tokenguard=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_list(config: &Config, output: OutputFormat) {
    let catalog = checks::catalog(&config.legacy);
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&catalog)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            let width = catalog.iter().map(|c| c.name.len()).max().unwrap_or(0);
            for check in &catalog {
                let kind = match check.kind {
                    CheckKind::Native => "native",
                    CheckKind::Legacy => "legacy",
                };
                println!(
                    "{:<width$}  {:<6}  {}",
                    check.name,
                    kind,
                    check.description,
                    width = width
                );
            }
        }
    }
}

fn cmd_run(cli: &Cli, config: &Config) -> i32 {
    let (output, quiet) = (cli.output, cli.quiet);

    let selection = match checks::select(cli.module.as_deref(), &config.legacy) {
        Ok(s) => s,
        Err(msg) => {
            report_error(&msg, output, quiet);
            return 1;
        }
    };

    let Some(registry_path) = cli.registry.clone().or_else(|| config.registry.clone()) else {
        report_error(
            "no token registry: pass --registry or set `registry` in tokenguard.toml",
            output,
            quiet,
        );
        return 1;
    };
    let registry = match Registry::load(&registry_path) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            report_error(&format!("registry error: {}", e), output, quiet);
            return 1;
        }
    };

    let files = match discover::discover(&cli.patterns, &config.extensions()) {
        Ok(f) => f,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            return 1;
        }
    };

    let classifier = Classifier::new(registry);
    let extractor = match &config.attributes {
        Some(attrs) => Extractor::new(attrs.clone()),
        None => Extractor::default(),
    };
    let jobs = cli.jobs.or(config.jobs).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let options = RunOptions {
        apply: cli.apply,
        jobs,
        policy: BlockingPolicy {
            strict: cli.strict || config.strict,
            fail_fast: cli.fail_fast,
        },
        selection,
        legacy_dir: config.base_dir.clone(),
    };

    let result = match Runner::new(&classifier, &extractor, &FileSystemProvider, &options)
        .run(&files)
    {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("cannot start workers: {}", e), output, quiet);
            return 1;
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                print!("{}", report::render_text(&result, cli.verbose));
            }
        }
    }

    result.exit_code()
}

/// Report an error in the appropriate output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
