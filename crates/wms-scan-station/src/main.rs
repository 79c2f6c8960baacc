//! WMS scan station entry point.
//!
//! Reads a keyboard-wedge barcode scanner (or a person at the keyboard) from
//! standard input, classifies each scan, and looks it up against the WMS
//! backend.
//!
//! # Usage
//!
//! ```text
//! wms-scan-station [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Config file [default: platform config dir]
//!   --api-base <URL>      WMS backend base URL
//!   --target <FIELD>      Route every scan into this form field
//!   --history-dir <DIR>   Where scan history exports are written
//!   --init-config         Write the effective config file and exit
//! ```
//!
//! Each plain line typed at the console is one scan.  Lines starting with `:`
//! are commands: `:scan [field]`, `:stop`, `:process`, `:manual CODE`,
//! `:history`, `:export`, `:clear`, `:quit`.
//!
//! # Environment variable overrides
//!
//! | Variable           | Flag            |
//! |--------------------|-----------------|
//! | `WMS_SCAN_CONFIG`  | `--config`      |
//! | `WMS_API_BASE`     | `--api-base`    |
//! | `WMS_SCAN_TARGET`  | `--target`      |
//! | `WMS_HISTORY_DIR`  | `--history-dir` |
//!
//! `RUST_LOG` overrides the configured log level.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wms_scan_station::application::dispatch::Dispatcher;
use wms_scan_station::application::form_submit::FormSubmitter;
use wms_scan_station::application::ports::{FormFields, Notifier, PanelRenderer, ScanIndicator};
use wms_scan_station::application::scan_controller::ScanController;
use wms_scan_station::infrastructure::http::form::HttpFormClient;
use wms_scan_station::infrastructure::http::lookup::HttpLookupClient;
use wms_scan_station::infrastructure::http::ApiClient;
use wms_scan_station::infrastructure::key_input::stdin::StdinInputSource;
use wms_scan_station::infrastructure::runner::StationRunner;
use wms_scan_station::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, StationConfig,
};
use wms_scan_station::infrastructure::terminal::form::InMemoryForm;
use wms_scan_station::infrastructure::terminal::TerminalUi;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Keyboard-wedge barcode scan station for the warehouse management system.
#[derive(Debug, Parser)]
#[command(
    name = "wms-scan-station",
    about = "Barcode scan capture and lookup station for WMS receiving",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "WMS_SCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the WMS backend, e.g. `http://wms.local:5000`.
    #[arg(long, env = "WMS_API_BASE")]
    api_base: Option<String>,

    /// Form field every scan is written into, bypassing classification.
    #[arg(long, env = "WMS_SCAN_TARGET")]
    target: Option<String>,

    /// Directory for scan history exports.
    #[arg(long, env = "WMS_HISTORY_DIR")]
    history_dir: Option<PathBuf>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given and no platform config dir"),
        }
    }

    /// Applies the command-line overrides on top of the file config.
    fn apply_overrides(&self, mut config: StationConfig) -> StationConfig {
        if let Some(base) = &self.api_base {
            config.api.base_url = base.clone();
        }
        if let Some(dir) = &self.history_dir {
            config.station.history_dir = Some(dir.clone());
        }
        config
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_path()?;
    let file_config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let config = cli.apply_overrides(file_config);

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the configured level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.station.log_level)),
        )
        .init();

    if cli.init_config {
        save_config_to(&config, &config_path)
            .with_context(|| format!("failed to write config to {}", config_path.display()))?;
        info!(path = %config_path.display(), "config written");
        return Ok(());
    }

    info!(
        api = %config.api.base_url,
        target = cli.target.as_deref().unwrap_or("-"),
        "WMS scan station starting"
    );

    // ── Wiring ────────────────────────────────────────────────────────────────
    let ui = Arc::new(TerminalUi::stdout());
    let forms: Arc<dyn FormFields> =
        Arc::new(InMemoryForm::new(&config.form.fields).with_action(&config.form.action));

    let api = ApiClient::new(config.api.base_url.clone(), config.api.request_timeout())
        .context("failed to create HTTP client")?;
    let lookup = Arc::new(HttpLookupClient::new(api.clone(), config.api.endpoints()));
    let submit = Arc::new(HttpFormClient::new(api));

    let dispatcher = Dispatcher::new(
        lookup,
        Arc::clone(&ui) as Arc<dyn PanelRenderer>,
        Arc::clone(&forms),
        Arc::clone(&ui) as Arc<dyn Notifier>,
    );
    let submitter = FormSubmitter::new(
        submit,
        Arc::clone(&forms),
        Arc::clone(&ui) as Arc<dyn Notifier>,
    );
    let (controller, timeouts) = ScanController::new(
        config.scanner.to_settings(),
        dispatcher,
        submitter,
        forms,
        Arc::clone(&ui) as Arc<dyn Notifier>,
        Arc::clone(&ui) as Arc<dyn ScanIndicator>,
    );

    let history_dir = config
        .station
        .history_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let runner = StationRunner::new(
        controller,
        timeouts,
        Arc::new(StdinInputSource::new()),
        ui,
        cli.target.clone(),
        history_dir,
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::SeqCst);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let summary = runner
        .run(running)
        .await
        .context("failed to start console input")?;

    info!(scans = summary.scans, "WMS scan station stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
