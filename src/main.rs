/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for setup-cue. Reads the requested cue version,
    installs it through the tool cache, and exposes it to the
    remaining steps of the CI job.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS GET
    requests and writes beneath the cache and temp roots only.

  Dependencies:
    clap for CLI parsing, chrono for session stamps, tokio for
    the async runtime.

  Operational Scope:
    Invoked as a CI step (inputs via INPUT_* variables) or by
    operators to pre-seed or inspect a tool cache.

  Revision History:
    2025-10-28 COD  Authored runtime entry point.
    2025-11-02 COD  Rebuilt around the cue install pipeline.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

mod action;
mod config;
mod download;
mod error;
mod extract;
mod installer;
mod logger;
mod platform;
mod resolver;
mod tool_cache;
mod version;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{ArgAction, Parser};

use action::Runner;
use config::SetupConfig;
use download::HttpFetcher;
use error::{Result, SetupError};
use installer::{InstallPlan, Installer, TOOL_NAME};
use logger::Logger;
use platform::HostPlatform;
use tool_cache::ToolCache;
use version::ToolVersion;

/// Name of the step input carrying the requested version.
const VERSION_INPUT: &str = "cue-version";

/// Command-line arguments for setup-cue.
#[derive(Debug, Parser)]
#[command(
    name = "setup-cue",
    version,
    about = "Install a pinned cue release into the CI tool cache"
)]
struct Cli {
    /// cue version to install; defaults to the `cue-version` step input.
    #[arg(long = "cue-version", value_name = "VERSION")]
    cue_version: Option<String>,
    /// Override configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the tool cache root.
    #[arg(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Resolve for another operating system (dry runs only).
    #[arg(long, value_name = "OS", requires = "dry_run")]
    os: Option<String>,
    /// Resolve for another architecture (dry runs only).
    #[arg(long, value_name = "ARCH", requires = "dry_run")]
    arch: Option<String>,
    /// Resolve and check the cache without downloading.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Seed the cache from a local release archive instead of downloading.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "list_cached"])]
    archive: Option<PathBuf>,
    /// List cached cue versions and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    list_cached: bool,
    /// Keep the temporary download workspace.
    #[arg(long, action = ArgAction::SetTrue)]
    keep_temp: bool,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            report_failure(&err);
            err.exit_code()
        }
    }
}

/// Failure channel for errors raised before the logger exists.
fn report_failure(err: &SetupError) {
    if action::in_actions() {
        println!("{}", action::workflow_command("error", &err.to_string()));
    } else {
        eprintln!("[setup-cue] {err}");
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = SetupConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| config.log_dir().join(format!("setup-cue_{session_stamp}.log")));
    let logger = Logger::new(
        Some(log_path),
        cli.verbose || action::runner_debug(),
        action::in_actions(),
    )?;
    logger.info("INIT", "setup-cue starting.");

    let outcome = execute(&cli, &config, &logger).await;
    conclude(&logger, outcome)
}

/// Record the session result in the log and seal it with its digest.
///
/// Once the logger exists, failures are reported through it: an `[ERROR]`
/// entry in the log file and an `::error::` annotation inside Actions.
fn conclude(logger: &Logger, outcome: Result<()>) -> Result<ExitCode> {
    match outcome {
        Ok(()) => {
            logger.finalize()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            logger.error(err.kind(), err.to_string());
            if let Err(seal) = logger.finalize() {
                logger.warn("LOGGER", format!("Log digest not written: {seal}"));
            }
            Ok(err.exit_code())
        }
    }
}

async fn execute(cli: &Cli, config: &SetupConfig, logger: &Logger) -> Result<()> {
    let cache = ToolCache::new(config.cache_root(cli.cache_dir.as_deref())?);
    let host = HostPlatform::detect(cli.os.as_deref(), cli.arch.as_deref());
    logger.debug("HOST", format!("host={host} cache={}", cache.root().display()));

    if cli.list_cached {
        let arch = host.arch.cache_key();
        for version in cache.find_all_versions(TOOL_NAME, arch)? {
            match cache.receipt(TOOL_NAME, &version, arch) {
                Some(receipt) => println!("{version}\t{}", receipt.installed_at),
                None => println!("{version}"),
            }
        }
        return Ok(());
    }

    let version = requested_version(cli.cue_version.as_deref(), |key| std::env::var(key).ok())?;
    logger.info("VERSION", format!("Requested cue {version}"));

    let fetcher = HttpFetcher::new(&config.download)?;
    let installer = Installer::new(fetcher, cache, host, logger)
        .with_base_url(config.download.base_url.clone())
        .with_temp_root(config.temp_root())
        .keep_temp(cli.keep_temp || config.keep_temp);

    if cli.dry_run {
        let plan = installer.plan(&version)?;
        print_plan(&plan);
        return Ok(());
    }

    let installation = match &cli.archive {
        Some(archive) => installer.install_from_archive(&version, archive).await?,
        None => installer.install(&version).await?,
    };
    logger.info(
        "INSTALL",
        format!(
            "cue {} ready at {} (cache hit: {}, source: {})",
            installation.version,
            installation.path.display(),
            installation.cache_hit,
            installation.source
        ),
    );

    let runner = Runner::from_env();
    runner.add_path(&installation.path)?;
    runner.set_output("cue-version", installation.version.as_str())?;
    runner.set_output("cue-path", &installation.path.to_string_lossy())?;
    runner.set_output("cache-hit", &installation.cache_hit.to_string())?;
    logger.info("PATH", format!("Added {} to PATH", installation.path.display()));

    Ok(())
}

/// The version to install: the CLI flag, else the required step input.
fn requested_version<F>(flag: Option<&str>, lookup: F) -> Result<ToolVersion>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match flag.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_string(),
        None => action::read_input(VERSION_INPUT, true, lookup)?.unwrap_or_default(),
    };
    ToolVersion::parse(&raw)
}

fn print_plan(plan: &InstallPlan) {
    println!(
        "→ Dry run. cue {} ({:?} naming) {} archive url={} cached={}",
        plan.version,
        plan.version.naming_scheme(),
        plan.asset.kind,
        plan.asset.url,
        plan.cached
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "no".to_string())
    );
}
