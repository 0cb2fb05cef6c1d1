//! Tool configuration.
//!
//! Configuration is layered. Each layer only needs the keys it wants to
//! override, and later layers win:
//!
//! 1. stock defaults ([`ToolConfig::default`])
//! 2. `./quacktool.toml`, or the file passed with `--config`
//! 3. environment variables named `QUACKTOOL_<SECTION>__<KEY>`
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [processing]
//! default_quality = 80      # Used when a request has no quality (1-100)
//! # default_format = "webp" # Used when a request has no format
//!
//! [paths]
//! output_dir = "output"     # Where derived output paths land
//! # temp_dir = "/tmp/qt"    # Staging directory (default: next to the output)
//!
//! [logging]
//! log_level = "info"        # trace | debug | info | warn | error
//!
//! [extensions]
//! # heic = "image"          # Extra extension -> asset type mappings
//! ```
//!
//! ## Environment
//!
//! `QUACKTOOL_PROCESSING__DEFAULT_QUALITY=90` sets `processing.default_quality`.
//! Values are read as TOML scalars when they parse as one (`90`, `true`) and
//! as strings otherwise. Variables without a `__` separator are ignored.
//!
//! Unknown keys are rejected to catch typos early.

use crate::asset::{AssetType, ExtensionTable};
use crate::options::{OptionDefaults, Quality, normalize_format};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "quacktool.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "QUACKTOOL_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Effective configuration after all layers are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub processing: ProcessingConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
    /// Extension → asset type, applied on top of the stock table.
    pub extensions: BTreeMap<String, AssetType>,
}

/// Defaults applied to requests that leave a field unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub default_quality: u8,
    pub default_format: Option<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            default_quality: Quality::default().value(),
            default_format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory for derived output paths (and the `batch` default).
    pub output_dir: PathBuf,
    /// Where handlers stage output before it is moved into place.
    pub temp_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default `tracing` level. `RUST_LOG` takes precedence when set.
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Quality::new(i64::from(self.processing.default_quality)).is_err() {
            return Err(ConfigError::Validation(format!(
                "processing.default_quality must be 1-100 (got {})",
                self.processing.default_quality
            )));
        }
        if let Some(format) = &self.processing.default_format {
            normalize_format(format)
                .map_err(|e| ConfigError::Validation(format!("processing.default_format: {e}")))?;
        }
        let level = self.logging.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.log_level must be one of {} (got '{}')",
                LOG_LEVELS.join(", "),
                self.logging.log_level
            )));
        }
        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "paths.output_dir must not be empty".into(),
            ));
        }
        for ext in self.extensions.keys() {
            let token = ext.trim_start_matches('.');
            if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::Validation(format!(
                    "extensions: '{ext}' is not a file extension"
                )));
            }
        }
        Ok(())
    }

    /// Defaults for [`ProcessingOptions::from_raw`](crate::options::ProcessingOptions::from_raw).
    pub fn option_defaults(&self) -> OptionDefaults {
        OptionDefaults {
            // Range checked by `validate`.
            quality: Quality::new(i64::from(self.processing.default_quality)).unwrap_or_default(),
            format: self.processing.default_format.clone(),
        }
    }

    /// The stock extension table with `[extensions]` applied.
    pub fn extension_table(&self) -> ExtensionTable {
        ExtensionTable::default().with_overrides(&self.extensions)
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer every other layer is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read and parse a config file that must exist.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Load `quacktool.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_config_file(&config_path).map(Some)
}

/// Build an overlay from `QUACKTOOL_<SECTION>__<KEY>` variables.
///
/// Takes the variables as an iterator so tests don't touch the process
/// environment.
pub fn env_overlay(
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<Option<toml::Value>, ConfigError> {
    let mut root = toml::Table::new();
    for (name, raw) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let Some((section, key)) = rest.split_once("__") else {
            continue;
        };
        if section.is_empty() || key.is_empty() {
            return Err(ConfigError::Validation(format!(
                "environment variable {name} must look like {ENV_PREFIX}<SECTION>__<KEY>"
            )));
        }
        let table = root
            .entry(section.to_ascii_lowercase())
            .or_insert(toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(table) = table {
            table.insert(key.to_ascii_lowercase(), parse_env_value(&raw));
        }
    }
    Ok((!root.is_empty()).then_some(toml::Value::Table(root)))
}

/// Keep the `QUACKTOOL_*` entries of a raw environment as UTF-8 strings.
///
/// Unrelated variables are skipped whatever their encoding; a tool
/// variable that is not valid UTF-8 is an error.
pub fn tool_env_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> Result<Vec<(String, String)>, ConfigError> {
    let mut kept = Vec::new();
    for (name, value) in vars {
        let Some(name) = name.to_str() else {
            if name.to_string_lossy().starts_with(ENV_PREFIX) {
                return Err(ConfigError::Validation(format!(
                    "environment variable name {} is not valid UTF-8",
                    name.to_string_lossy()
                )));
            }
            continue;
        };
        if !name.starts_with(ENV_PREFIX) {
            continue;
        }
        let value = value.into_string().map_err(|_| {
            ConfigError::Validation(format!("environment variable {name} is not valid UTF-8"))
        })?;
        kept.push((name.to_string(), value));
    }
    Ok(kept)
}

/// A TOML scalar if `raw` is one, otherwise the raw string.
fn parse_env_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .filter(|v| !v.is_table() && !v.is_array())
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = Option<toml::Value>>,
) -> Result<ToolConfig, ConfigError> {
    let merged = overlays.into_iter().flatten().fold(base, merge_toml);
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit `path` must exist. Without one, `./quacktool.toml` is used if
/// present. Environment overrides from the current process apply last.
pub fn load_config(path: Option<&Path>) -> Result<ToolConfig, ConfigError> {
    let file = match path {
        Some(path) => Some(read_config_file(path)?),
        None => load_raw_config(Path::new("."))?,
    };
    let env = env_overlay(tool_env_vars(std::env::vars_os())?)?;
    resolve_config(stock_defaults_value()?, [file, env])
}

/// Returns a fully-commented stock `quacktool.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# QuackTool Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# QuackTool reads ./quacktool.toml, or the file given with --config.
# Environment variables override file values:
#   QUACKTOOL_PROCESSING__DEFAULT_QUALITY=90
#   QUACKTOOL_PATHS__OUTPUT_DIR=/srv/assets
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Processing defaults
# ---------------------------------------------------------------------------
[processing]
# Quality for lossy encoders when a request does not set one (1-100).
default_quality = 80

# Output format when a request does not set one. Omit to keep the input's
# format (analysis reports are always JSON).
# default_format = "webp"

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
# Directory for derived output paths when no --output is given.
output_dir = "output"

# Staging directory for in-progress output. Omit to stage next to the
# final output file.
# temp_dir = "/tmp/quacktool"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# One of: trace, debug, info, warn, error. RUST_LOG takes precedence.
log_level = "info"

# ---------------------------------------------------------------------------
# Extra extension mappings (extension = "image" | "video" | "audio" | "document")
# ---------------------------------------------------------------------------
[extensions]
# heic = "image"
# opus = "audio"
"##
}
