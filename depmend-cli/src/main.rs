//! depmend-cli entry point.
//!
//! Parses arguments, loads configuration (CLI flags take precedence
//! over environment variables, which take precedence over the config
//! file), assembles the production capabilities, and drives one run.
//!
//! Exit codes: 0 = healthy (warnings are noted on stderr), 1 = run
//! error, 2 = critical.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use depmend_cli::cli::DepmendCli;
use depmend_cli::logging;
use depmend_cli::orchestrator::{Orchestrator, exit_code};
use depmend_cli::process::{SystemProbe, default_commands};
use depmend_core::config::DepmendConfig;
use depmend_core::types::OverallStatus;
use depmend_registry::client::{DynRegistryResolver, HttpRegistryClient};
use depmend_registry::config::RegistryClientConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = DepmendCli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("depmend: error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: DepmendCli) -> Result<ExitCode> {
    let mut config = load_config(&cli).await?;
    apply_cli_overrides(&mut config, &cli);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration OK");
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_tracing(&config.general)?;
    depmend_core::metrics::describe_all();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %config.scan.root,
        fix = cli.fix,
        "depmend starting"
    );

    // Production capabilities
    let registry_config = RegistryClientConfig::from_core(&config.registry);
    let client = HttpRegistryClient::new(registry_config)
        .map_err(|e| anyhow::anyhow!("failed to build registry client: {}", e))?;
    let resolver: Arc<dyn DynRegistryResolver> = Arc::new(client);
    let probe = Arc::new(SystemProbe::new(Duration::from_secs(10)));
    let commands = default_commands(Duration::from_secs(config.remedy.validation_timeout_secs));

    let orchestrator = Orchestrator::new(config, resolver, probe, commands, cli.fix)?;
    let report = orchestrator.run().await?;

    println!(
        "depmend: {} (score {}/100), report written to {}",
        report.overall,
        report.score,
        orchestrator.config().general.report_path,
    );

    if report.overall == OverallStatus::Warning {
        eprintln!(
            "depmend: warning: {} conflict(s), {} vulnerability(ies), see report for details",
            report.conflicts.len(),
            report.vulnerabilities.len(),
        );
    }

    Ok(ExitCode::from(u8::try_from(exit_code(report.overall)).unwrap_or(1)))
}

/// Load configuration from the given path.
///
/// An explicitly passed `--config` must exist; the default path falls
/// back to built-in defaults (plus environment overrides) when absent.
async fn load_config(cli: &DepmendCli) -> Result<DepmendConfig> {
    let default_path = cli.config == std::path::PathBuf::from("/etc/depmend/depmend.toml");

    if cli.config.is_file() {
        DepmendConfig::load(&cli.config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))
    } else if default_path {
        let mut config = DepmendConfig::default();
        config.apply_env_overrides();
        Ok(config)
    } else {
        Err(anyhow::anyhow!(
            "config file not found: {}",
            cli.config.display()
        ))
    }
}

/// CLI flags take precedence over everything else.
fn apply_cli_overrides(config: &mut DepmendConfig, cli: &DepmendCli) {
    if let Some(root) = &cli.root {
        config.scan.root = root.display().to_string();
    }
    if let Some(mode) = &cli.mode {
        config.remedy.mode = mode.clone();
    }
    if cli.fix {
        config.remedy.enabled = true;
    }
    if let Some(report) = &cli.report {
        config.general.report_path = report.display().to_string();
    }
    if !cli.exclude_ecosystems.is_empty() {
        config.scan.exclude_ecosystems = cli.exclude_ecosystems.clone();
    }
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
}
