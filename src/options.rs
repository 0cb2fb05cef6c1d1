//! Processing options: the mode enum, the validated quality value, and the
//! conversion from raw request values into [`ProcessingOptions`].
//!
//! Every entry point (CLI flags, plugin option mappings, library callers)
//! funnels through [`ProcessingOptions::from_raw`], so a bad value produces
//! the same [`ValidationError`] no matter where it came from.
//!
//! ## Mapping form
//!
//! The plugin contract passes options as a string-keyed mapping:
//!
//! ```json
//! { "mode": "optimize", "quality": 85, "format": "webp", "width": 800, "height": 600 }
//! ```
//!
//! Keys map 1:1 onto [`ProcessingOptions`] fields. Unknown keys are rejected
//! with an error naming the key.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// String-keyed option mapping as exchanged with plugin hosts.
pub type OptionsMap = serde_json::Map<String, Value>;

/// High-level operation applied to an asset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Optimize,
    Transform,
    Analyze,
    Generate,
}

impl ProcessingMode {
    pub const ALL: [ProcessingMode; 4] = [
        ProcessingMode::Optimize,
        ProcessingMode::Transform,
        ProcessingMode::Analyze,
        ProcessingMode::Generate,
    ];

    /// Canonical lowercase token.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingMode::Optimize => "optimize",
            ProcessingMode::Transform => "transform",
            ProcessingMode::Analyze => "analyze",
            ProcessingMode::Generate => "generate",
        }
    }

    pub fn values() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = ValidationError;

    /// Case-insensitive match against the canonical tokens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownMode {
                value: s.to_string(),
                valid: Self::values(),
            })
    }
}

/// Lossy encoding quality, 1–100.
///
/// Unlike a clamp, construction rejects out-of-range values so a typo like
/// `--quality 850` is reported instead of silently becoming 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 100;

    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::QualityOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Unvalidated option values, exactly as a caller supplied them.
///
/// This is the deserialization target for plugin option mappings and the
/// struct the CLI fills from its flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl RawOptions {
    /// Read a plugin-style mapping. Unknown keys and wrongly typed values are
    /// rejected; range checks happen later in [`ProcessingOptions::from_raw`].
    pub fn from_map(map: &OptionsMap) -> Result<Self, ValidationError> {
        serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| ValidationError::MalformedOptions(e.to_string()))
    }
}

/// Values used when a request leaves a field unset. Built from the
/// `[processing]` config section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionDefaults {
    pub quality: Quality,
    pub format: Option<String>,
}

/// Validated processing options.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub mode: ProcessingMode,
    pub quality: Quality,
    /// Output format as a lowercase extension token (`webp`, `jpg`, ...).
    pub format: Option<String>,
    pub width: Option<NonZeroU32>,
    pub height: Option<NonZeroU32>,
}

impl ProcessingOptions {
    /// Options for `mode` with every other field at its stock default.
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            mode,
            quality: Quality::default(),
            format: None,
            width: None,
            height: None,
        }
    }

    /// Validate raw values, filling unset fields from `defaults`.
    ///
    /// A missing mode means [`ProcessingMode::Optimize`].
    pub fn from_raw(raw: &RawOptions, defaults: &OptionDefaults) -> Result<Self, ValidationError> {
        let mode = match raw.mode.as_deref() {
            Some(m) => m.parse()?,
            None => ProcessingMode::default(),
        };
        let quality = match raw.quality {
            Some(q) => Quality::new(q)?,
            None => defaults.quality,
        };
        let format = match raw.format.as_deref().or(defaults.format.as_deref()) {
            Some(f) => Some(normalize_format(f)?),
            None => None,
        };
        Ok(Self {
            mode,
            quality,
            format,
            width: dimension("width", raw.width)?,
            height: dimension("height", raw.height)?,
        })
    }

    /// Build options from a plugin-style mapping. Unknown keys are rejected.
    pub fn from_map(map: &OptionsMap, defaults: &OptionDefaults) -> Result<Self, ValidationError> {
        Self::from_raw(&RawOptions::from_map(map)?, defaults)
    }

    /// Serialize back to the mapping form. `mode` and `quality` are always
    /// present; optional fields only when set.
    pub fn to_map(&self) -> OptionsMap {
        let mut map = OptionsMap::new();
        map.insert("mode".into(), Value::from(self.mode.as_str()));
        map.insert("quality".into(), Value::from(self.quality.value()));
        if let Some(format) = &self.format {
            map.insert("format".into(), Value::from(format.as_str()));
        }
        if let Some(width) = self.width {
            map.insert("width".into(), Value::from(width.get()));
        }
        if let Some(height) = self.height {
            map.insert("height".into(), Value::from(height.get()));
        }
        map
    }

    /// Requested `(width, height)` as plain integers.
    pub fn dimensions(&self) -> (Option<u32>, Option<u32>) {
        (self.width.map(NonZeroU32::get), self.height.map(NonZeroU32::get))
    }
}

/// Normalize a format token: trim, drop a leading dot, lowercase.
pub fn normalize_format(raw: &str) -> Result<String, ValidationError> {
    let token = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat(raw.to_string()));
    }
    Ok(token)
}

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

fn dimension(
    field: &'static str,
    value: Option<i64>,
) -> Result<Option<NonZeroU32>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) => u32::try_from(v)
            .ok()
            .filter(|&d| d <= MAX_DIMENSION)
            .and_then(NonZeroU32::new)
            .map(Some)
            .ok_or(ValidationError::InvalidDimension { field, value: v }),
    }
}
