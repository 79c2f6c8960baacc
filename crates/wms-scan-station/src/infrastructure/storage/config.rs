//! TOML-based configuration for the scan station.
//!
//! Reads and writes [`StationConfig`] at the platform-appropriate path:
//! - Windows:  `%APPDATA%\WmsScan\config.toml`
//! - Linux:    `~/.config/wms-scan/config.toml` (or `$XDG_CONFIG_HOME/wms-scan`)
//! - macOS:    `~/Library/Application Support/WmsScan/config.toml`
//!
//! A complete file looks like this:
//!
//! ```toml
//! [station]
//! log_level = "info"
//! history_dir = "/var/lib/wms-scan"
//!
//! [scanner]
//! scan_timeout_ms = 10000
//! burst_gap_ms = 100
//! min_length = 6
//! max_length = 50
//!
//! [api]
//! base_url = "http://localhost:5000"
//! request_timeout_secs = 30
//! purchase_order_path = "/api/scan_po"
//! item_path = "/api/scan_item"
//! supplier_path = "/api/scan_barcode"
//!
//! [form]
//! action = "/grpos/1/add_line"
//!
//! [[form.fields]]
//! id = "receipt_item"
//! auto_submit = true
//! required = true
//! ```
//!
//! Every field has a `#[serde(default = "...")]` helper, so a missing file, a
//! missing section, or a missing key all fall back to the values above.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wms_scan_core::{BarcodeRules, ScannerSettings};

use crate::infrastructure::http::lookup::LookupEndpoints;
use crate::infrastructure::terminal::form::DEFAULT_FORM_ACTION;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level station configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StationConfig {
    #[serde(default)]
    pub station: StationSection,
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub form: FormSection,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where exported scan history files are written.  Defaults to the
    /// working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<PathBuf>,
}

/// Capture tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerSection {
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    /// Maximum gap between key-ups of one scanner burst.
    #[serde(default = "default_burst_gap_ms")]
    pub burst_gap_ms: u64,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

/// Backend location and lookup endpoint paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_purchase_order_path")]
    pub purchase_order_path: String,
    #[serde(default = "default_item_path")]
    pub item_path: String,
    #[serde(default = "default_supplier_path")]
    pub supplier_path: String,
}

/// The form the station fills in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormSection {
    /// Path, relative to `api.base_url`, the form is posted to on submit.
    #[serde(default = "default_form_action")]
    pub action: String,
    #[serde(default = "default_form_fields")]
    pub fields: Vec<FormFieldEntry>,
}

/// One named form field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormFieldEntry {
    pub id: String,
    /// Submit the form as soon as a scan lands in this field.
    #[serde(default)]
    pub auto_submit: bool,
    /// The form is not submitted while this field is blank.
    #[serde(default)]
    pub required: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_scan_timeout_ms() -> u64 {
    10_000
}
fn default_burst_gap_ms() -> u64 {
    100
}
fn default_min_length() -> usize {
    wms_scan_core::domain::barcode::DEFAULT_MIN_LENGTH
}
fn default_max_length() -> usize {
    wms_scan_core::domain::barcode::DEFAULT_MAX_LENGTH
}
fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_purchase_order_path() -> String {
    LookupEndpoints::default().purchase_order
}
fn default_item_path() -> String {
    LookupEndpoints::default().item
}
fn default_supplier_path() -> String {
    LookupEndpoints::default().supplier
}
fn default_form_action() -> String {
    DEFAULT_FORM_ACTION.to_string()
}
/// The supplier auto-fill targets, none of them auto-submitting or required.
fn default_form_fields() -> Vec<FormFieldEntry> {
    wms_scan_core::domain::lookup::SUPPLIER_AUTOFILL_FIELDS
        .iter()
        .map(|id| FormFieldEntry {
            id: (*id).to_string(),
            auto_submit: false,
            required: false,
        })
        .collect()
}

impl Default for StationSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            history_dir: None,
        }
    }
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            scan_timeout_ms: default_scan_timeout_ms(),
            burst_gap_ms: default_burst_gap_ms(),
            min_length: default_min_length(),
            max_length: default_max_length(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            purchase_order_path: default_purchase_order_path(),
            item_path: default_item_path(),
            supplier_path: default_supplier_path(),
        }
    }
}

impl Default for FormSection {
    fn default() -> Self {
        Self {
            action: default_form_action(),
            fields: default_form_fields(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl ScannerSection {
    /// Settings for the capture state machine.
    pub fn to_settings(&self) -> ScannerSettings {
        ScannerSettings {
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
            burst_gap: Duration::from_millis(self.burst_gap_ms),
            rules: BarcodeRules {
                min_length: self.min_length,
                max_length: self.max_length,
            },
        }
    }
}

impl ApiSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn endpoints(&self) -> LookupEndpoints {
        LookupEndpoints {
            purchase_order: self.purchase_order_path.clone(),
            item: self.item_path.clone(),
            supplier: self.supplier_path.clone(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads [`StationConfig`] from `path`, returning the defaults if the file
/// does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<StationConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StationConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads the config from the platform config directory.
///
/// # Errors
///
/// As [`load_config_from`], plus [`ConfigError::NoPlatformConfigDir`].
pub fn load_config() -> Result<StationConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &StationConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the `wms-scan` leaf.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("WmsScan"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("wms-scan"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("WmsScan")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
