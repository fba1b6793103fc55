use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use specpit::config::{load_config, CliOverrides, SettingsBuilder};
use specpit::executor::{print_run_report, write_report, Runner};
use specpit::suite::{discover_suites, load_suite};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "specpit",
    version,
    about = "Scenario-first HTTP contract runner",
    disable_help_subcommand = true
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a suite file or every *.suite.json under a directory
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Suite file or directory
    #[arg(value_name = "SUITE")]
    suite: PathBuf,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Base URL that relative scenario paths are joined onto
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Write a JSON report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Select a profile from specpit.json
    #[arg(short = 'P', long)]
    profile: Option<String>,

    /// Directory or file containing specpit.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Env file with extra variables
    #[arg(short, long)]
    env: Option<PathBuf>,

    /// Maximum number of requests in flight across sequences
    #[arg(long, value_name = "N")]
    max_in_flight: Option<usize>,

    /// Skip the base URL reachability check
    #[arg(long)]
    no_preflight: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let base_dir = std::env::current_dir()?;
    let config_target = args
        .config
        .as_ref()
        .map(|p| resolve_relative(&base_dir, p))
        .unwrap_or_else(|| base_dir.clone());

    let cfg = load_config(&config_target).context("loading configuration")?;
    let config_dir = cfg.as_ref().map(|c| c.dir.clone()).unwrap_or_else(|| {
        if config_target.is_dir() {
            config_target.clone()
        } else {
            config_target
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| config_target.clone())
        }
    });

    let settings = SettingsBuilder::new(
        base_dir.clone(),
        config_dir.clone(),
        cfg,
        args.profile.clone(),
        args.env.as_ref().map(|p| resolve_relative(&base_dir, p)),
        CliOverrides {
            base_url: args.base_url.clone(),
            timeout_ms: args.timeout,
            max_in_flight: args.max_in_flight,
            report: args.report.clone(),
            no_preflight: args.no_preflight,
        },
    )
    .build()
    .context("resolving settings")?;

    let suite_path = resolve_relative(&base_dir, &args.suite);
    let runner = Runner::new(settings)?;

    let mut suites = Vec::new();
    for path in discover_suites(&suite_path)? {
        suites.push(load_suite(&path).await?);
    }

    let mut prepared = Vec::with_capacity(suites.len());
    for suite in suites {
        prepared.push(runner.prepare(suite).await?);
    }

    let report = runner.run(&prepared).await;
    print_run_report(&report);

    if let Some(path) = &runner.settings().report_path {
        write_report(path, &report)?;
        println!("Report written to {}", path.display());
    }

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "specpit=info",
        _ => "specpit=debug",
    };
    let filter =
        EnvFilter::try_from_env("SPECPIT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_args_parse_all_overrides() {
        let cli = Cli::try_parse_from([
            "specpit",
            "run",
            "suites/serverest.suite.json",
            "--timeout",
            "1500",
            "--base-url",
            "http://localhost:3000",
            "--report",
            "out/report.json",
            "-P",
            "ci",
            "--max-in-flight",
            "2",
            "--no-preflight",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command;
        assert_eq!(args.suite, PathBuf::from("suites/serverest.suite.json"));
        assert_eq!(args.timeout, Some(1500));
        assert_eq!(args.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(args.report, Some(PathBuf::from("out/report.json")));
        assert_eq!(args.profile.as_deref(), Some("ci"));
        assert_eq!(args.max_in_flight, Some(2));
        assert!(args.no_preflight);
    }

    #[test]
    fn resolve_relative_joins_when_needed() {
        let base = Path::new("/tmp/base");
        let relative = Path::new("suites/login.suite.json");
        assert_eq!(resolve_relative(base, relative), base.join(relative));

        let absolute = Path::new("/var/data/login.suite.json");
        assert_eq!(resolve_relative(base, absolute), absolute);
    }
}
