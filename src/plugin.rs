//! Plugin adapter: exposes the processor to a host application.
//!
//! A host keeps plugins in something implementing [`PluginHost`] and calls
//! [`Plugin::process_file`] with a path and a string-keyed option mapping.
//! [`PluginRegistry`] is a plain in-memory host; real hosts implement the
//! trait over their own registry.
//!
//! ```rust,ignore
//! let mut host = PluginRegistry::new();
//! let plugin = create_plugin(&ToolConfig::default());
//! register_plugin(&mut host, plugin.clone());
//! register_plugin(&mut host, plugin); // already registered: no-op
//!
//! let options = serde_json::json!({"mode": "optimize", "format": "webp"});
//! let result = host
//!     .get("QuackTool")
//!     .unwrap()
//!     .process_file(Path::new("cat.jpg"), None, options.as_object());
//! ```

use crate::config::ToolConfig;
use crate::options::{OptionsMap, RawOptions};
use crate::process::{AssetRequest, Processor};
use crate::result::{Metrics, ProcessingResult};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "QuackTool";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error("Plugin '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Plugin registration failed: {0}")]
    Rejected(String),
}

/// What a host gets back from any plugin call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PluginResult {
    pub success: bool,
    /// Output path on a successful `process_file`.
    pub content: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub metrics: Metrics,
}

impl PluginResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    fn from_processing(result: ProcessingResult, file_path: &Path) -> Self {
        match result.output_path() {
            Some(output) => Self {
                success: true,
                content: Some(output.display().to_string()),
                message: Some(format!("Successfully processed file: {}", file_path.display())),
                error: None,
                metrics: result.metrics().clone(),
            },
            None => Self {
                metrics: result.metrics().clone(),
                ..Self::error(result.error().unwrap_or("Unknown error during processing"))
            },
        }
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn initialize(&self) -> PluginResult;

    fn is_available(&self) -> bool;

    /// Process one file. `options` uses the keys `mode`, `quality`, `format`,
    /// `width`, and `height`; anything else is rejected.
    fn process_file(
        &self,
        file_path: &Path,
        output_path: Option<&Path>,
        options: Option<&OptionsMap>,
    ) -> PluginResult;
}

/// The processor wrapped as a [`Plugin`]. Initializes itself on first use.
pub struct QuackToolPlugin {
    processor: Processor,
    initialized: AtomicBool,
}

impl QuackToolPlugin {
    pub fn new(processor: Processor) -> Self {
        Self {
            processor,
            initialized: AtomicBool::new(false),
        }
    }
}

impl Plugin for QuackToolPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn initialize(&self) -> PluginResult {
        self.initialized.store(true, Ordering::SeqCst);
        debug!(plugin = PLUGIN_NAME, "plugin initialized");
        PluginResult::success("QuackTool plugin initialized successfully")
    }

    fn is_available(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn process_file(
        &self,
        file_path: &Path,
        output_path: Option<&Path>,
        options: Option<&OptionsMap>,
    ) -> PluginResult {
        if !self.is_available() {
            let init = self.initialize();
            if !init.success {
                return init;
            }
        }
        info!(file = %file_path.display(), "plugin processing file");

        let raw = match options.map(RawOptions::from_map).transpose() {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => return PluginResult::error(e.to_string()),
        };
        let request = AssetRequest {
            output: output_path,
            ..AssetRequest::new(file_path, &raw)
        };
        let result = self
            .processor
            .process_request(&request, self.processor.output_dir());
        PluginResult::from_processing(result, file_path)
    }
}

/// Plugin storage owned by a host application.
pub trait PluginHost {
    fn is_registered(&self, name: &str) -> bool;

    fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError>;
}

/// In-memory [`PluginHost`] keyed by plugin name.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginHost for PluginRegistry {
    fn is_registered(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        if self.is_registered(plugin.name()) {
            return Err(PluginError::AlreadyRegistered(plugin.name().to_string()));
        }
        self.plugins.push(plugin);
        Ok(())
    }
}

/// Register `plugin` unless its name is taken. Safe to call repeatedly:
/// an existing registration is left alone, and a host refusing the
/// registration is logged rather than returned.
pub fn register_plugin(host: &mut dyn PluginHost, plugin: Arc<dyn Plugin>) -> Arc<dyn Plugin> {
    if host.is_registered(plugin.name()) {
        debug!(plugin = plugin.name(), "plugin already registered");
        return plugin;
    }
    match host.register(plugin.clone()) {
        Ok(()) => info!(plugin = plugin.name(), "plugin registered"),
        Err(PluginError::AlreadyRegistered(name)) => {
            debug!(plugin = %name, "plugin already registered")
        }
        Err(e) => warn!(error = %e, "plugin registration failed"),
    }
    plugin
}

/// A plugin instance with the stock handler table.
pub fn create_plugin(config: &ToolConfig) -> Arc<QuackToolPlugin> {
    Arc::new(QuackToolPlugin::new(Processor::new(config)))
}
