// # dnssyncd - DNS Sync Daemon
//
// Thin integration layer: parse arguments, load the YAML configuration,
// register providers and hand everything to the `Synchronizer` in
// dnssync-core. No planning or DNS logic lives here.
//
// ## Usage
//
// ```bash
// dnssyncd --config /etc/dnssync/config.yaml            # periodic loop
// dnssyncd --config config.yaml --once --dry-run        # one simulated pass
// ```
//
// Every flag can also be set through the environment (`DNSSYNC_CONFIG`,
// `DNSSYNC_ONCE`, `DNSSYNC_DRY_RUN`, `DNSSYNC_LOG_LEVEL`, `DNSSYNC_LOG_FORMAT`).
//
// ## Exit codes
//
// - 0: clean shutdown, or `--once` pass without errors
// - 1: configuration or startup error
// - 2: runtime error, or `--once` pass with at least one failed zone

use anyhow::{Context, Result};
use clap::Parser;
use dnssync_core::config::LogFormat;
use dnssync_core::{ProviderRegistry, SyncEvent, SyncReport, SyncerConfig, Synchronizer};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error, or a one-shot pass that left zones unsynchronized
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep DNS zones in sync across providers
#[derive(Debug, Parser)]
#[command(name = "dnssyncd", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "DNSSYNC_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Run a single pass, print a summary and exit
    #[arg(long, env = "DNSSYNC_ONCE")]
    once: bool,

    /// Plan and report, but never apply changes
    #[arg(long, env = "DNSSYNC_DRY_RUN")]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "DNSSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json); overrides the config file
    #[arg(long, env = "DNSSYNC_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Load the configuration file and apply command-line overrides
    fn load_config(&self) -> Result<SyncerConfig> {
        let mut config = SyncerConfig::load(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        if self.dry_run {
            config.sync.dry_run = true;
        }
        if let Some(ref level) = self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config.validate()?;
        parse_log_level(&config.log_level)?;
        Ok(config)
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn parse_log_format(format: &str) -> Result<LogFormat> {
    match format.to_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => anyhow::bail!("log format '{}' is not valid. Valid formats: text, json", format),
    }
}

/// Install the global subscriber in the configured format
fn init_tracing(level: Level, format: LogFormat) -> Result<()> {
    match format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt().json().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    if let Err(e) = init_tracing(log_level, config.log_format) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting dnssyncd");
    info!(
        "Configuration loaded: {} zone(s), interval {}s{}",
        config.zones.len(),
        config.sync.interval_secs,
        if config.sync.dry_run { ", dry-run" } else { "" }
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config, cli.once)).into()
}

async fn run_daemon(config: SyncerConfig, once: bool) -> SyncExitCode {
    let registry = ProviderRegistry::with_builtin();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        dnssync_provider_cloudflare::register(&registry);
    }

    debug!("Available providers: {:?}", registry.list_providers());

    let (sync, events) = match Synchronizer::from_registry(&config, &registry) {
        Ok(built) => built,
        Err(e) => {
            error!("Failed to initialize synchronizer: {}", e);
            return SyncExitCode::ConfigError;
        }
    };

    for zone in sync.zones() {
        info!(
            "Managing zone {}: {} -> {} target(s)",
            zone.name,
            zone.source.id,
            zone.targets.len()
        );
    }

    let drain = tokio::spawn(log_events(events));

    let code = if once {
        let report = sync.run_once().await;
        print_summary(&report);
        if report.has_errors() {
            SyncExitCode::RuntimeError
        } else {
            SyncExitCode::CleanShutdown
        }
    } else {
        run_until_signal(&sync).await
    };

    // Dropping the synchronizer closes the event channel and ends the drain task
    drop(sync);
    if let Err(e) = drain.await {
        warn!("Event logger task failed: {}", e);
    }

    code
}

async fn run_until_signal(sync: &Synchronizer) -> SyncExitCode {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    // The loop observes shutdown between passes; a pass in flight completes
    let signals = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                info!("Shutting down after the current pass");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                error!("Shutdown error: {:#}", e);
                let _ = shutdown_tx.send(());
            }
        }
    });

    let result = sync.run_with_shutdown(Some(shutdown_rx)).await;
    signals.abort();

    match result {
        Ok(()) => {
            info!("dnssyncd stopped");
            SyncExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            SyncExitCode::RuntimeError
        }
    }
}

async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::ZoneFailed { zone, error } => warn!("Zone {} failed: {}", zone, error),
            SyncEvent::PassCompleted { pass, zones, failed } => {
                info!("Pass {} completed: {} zone(s), {} failed", pass, zones, failed)
            }
            other => debug!("Sync event: {:?}", other),
        }
    }
}

fn print_summary(report: &SyncReport) {
    for zone in &report.zones {
        match &zone.error {
            None => println!("{}: ok", zone.zone),
            Some(e) => println!("{}: FAILED: {}", zone.zone, e),
        }
        for target in &zone.targets {
            let counts = target.changes.counts();
            println!(
                "  {} -> {} creates, {} updates, {} deletes{}",
                target.target,
                counts.creates,
                counts.updates,
                counts.deletes,
                if target.applied { "" } else { " (not applied)" }
            );
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    Ok("Ctrl-C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
log_level: info
sync:
  interval_secs: 60
zones:
  - name: example.com
    source:
      type: memory
    targets:
      - type: memory
"#;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["dnssyncd"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert!(!cli.once);
        assert!(!cli.dry_run);
        assert!(cli.log_level.is_none());
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let path = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["dnssyncd", "--config", path, "--dry-run", "--log-level", "debug"])
            .unwrap();
        let config = cli.load_config().unwrap();

        assert!(config.sync.dry_run);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.sync.interval_secs, 60);
    }

    #[test]
    fn test_log_format_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        let config = Cli::try_parse_from(["dnssyncd", "--config", path])
            .unwrap()
            .load_config()
            .unwrap();
        assert_eq!(config.log_format, LogFormat::Text);

        let config = Cli::try_parse_from(["dnssyncd", "--config", path, "--log-format", "JSON"])
            .unwrap()
            .load_config()
            .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(Cli::try_parse_from(["dnssyncd", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(parse_log_level("verbose").is_err());
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let cli = Cli::try_parse_from(["dnssyncd", "--config", "/nonexistent/dnssync.yaml"]).unwrap();
        let err = cli.load_config().unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/dnssync.yaml"));
    }

    #[tokio::test]
    async fn test_once_without_errors_exits_cleanly() {
        let config = SyncerConfig::from_yaml_str(CONFIG).unwrap();
        assert_eq!(run_daemon(config, true).await, SyncExitCode::CleanShutdown);
    }
}
