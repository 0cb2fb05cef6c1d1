//! Handlers: the unit of work bound to one `(asset type, mode)` pair.
//!
//! The dispatcher owns everything around a handler (input checks, output path
//! derivation, staging, size metrics, timing). A handler only reads
//! [`Job::input`], writes [`Job::output`], and returns its own metrics.
//!
//! ## Stock table
//!
//! | | optimize | transform | analyze | generate |
//! |---|---|---|---|---|
//! | image | [`ImageOptimize`] | [`ImageTransform`] | [`ImageAnalyze`] | [`ImageThumbnail`] |
//! | video | [`Passthrough`] | [`Passthrough`] | [`FileAnalyze`] | none |
//! | audio | [`Passthrough`] | [`Passthrough`] | [`FileAnalyze`] | none |
//! | document | [`Passthrough`] | [`Passthrough`] | [`DocumentAnalyze`] | [`DocumentSummary`] |
//!
//! Video and audio transcoding is out of scope: those pass through untouched
//! and refuse a format change.

mod documents;
mod files;
mod images;

pub use documents::{DocumentAnalyze, DocumentSummary};
pub use files::{FileAnalyze, Passthrough, hash_file};
pub use images::{ImageAnalyze, ImageOptimize, ImageThumbnail, ImageTransform};

use crate::asset::AssetType;
use crate::error::ProcessError;
use crate::imaging::{ImageBackend, RustBackend};
use crate::options::{ProcessingMode, ProcessingOptions};
use crate::result::Metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Everything a handler may look at for one run.
#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    pub input: &'a Path,
    /// Where to write. This is a staging file; the dispatcher moves it to the
    /// final output path once the handler returns `Ok`.
    pub output: &'a Path,
    /// Lowercase extension of the final output path.
    pub extension: &'a str,
    pub asset_type: AssetType,
    pub options: &'a ProcessingOptions,
}

pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extension this handler always writes, such as `json` for reports.
    /// Takes precedence over the request's `format` for derived output
    /// paths. `None` lets the request or the input decide.
    fn fixed_extension(&self) -> Option<&'static str> {
        None
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError>;
}

/// `(asset type, mode)` → handler lookup.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<(AssetType, ProcessingMode), Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to a pair, returning whatever was bound before.
    pub fn register(
        &mut self,
        asset_type: AssetType,
        mode: ProcessingMode,
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.insert((asset_type, mode), handler)
    }

    pub fn get(&self, asset_type: AssetType, mode: ProcessingMode) -> Option<&dyn Handler> {
        self.handlers.get(&(asset_type, mode)).map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The stock table backed by the pure Rust image backend.
    pub fn stock() -> Self {
        Self::stock_with_backend(Arc::new(RustBackend::new()))
    }

    pub fn stock_with_backend(backend: Arc<dyn ImageBackend>) -> Self {
        use AssetType::*;
        use ProcessingMode::*;

        let mut registry = Self::new();
        registry.register(Image, Optimize, Arc::new(ImageOptimize::new(backend.clone())));
        registry.register(Image, Transform, Arc::new(ImageTransform::new(backend.clone())));
        registry.register(Image, Analyze, Arc::new(ImageAnalyze::new(backend.clone())));
        registry.register(Image, Generate, Arc::new(ImageThumbnail::new(backend)));

        let passthrough: Arc<dyn Handler> = Arc::new(Passthrough);
        let file_analyze: Arc<dyn Handler> = Arc::new(FileAnalyze);
        for asset_type in [Video, Audio] {
            registry.register(asset_type, Optimize, passthrough.clone());
            registry.register(asset_type, Transform, passthrough.clone());
            registry.register(asset_type, Analyze, file_analyze.clone());
        }

        registry.register(Document, Optimize, passthrough.clone());
        registry.register(Document, Transform, passthrough);
        registry.register(Document, Analyze, Arc::new(DocumentAnalyze));
        registry.register(Document, Generate, Arc::new(DocumentSummary));
        registry
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self
            .handlers
            .iter()
            .map(|((t, m), h)| (*t, *m, h.name()))
            .collect();
        entries.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &entries)
            .finish()
    }
}

/// Write `report` as pretty JSON to `path`.
pub(crate) fn write_report(path: &Path, report: &impl Serialize) -> Result<(), ProcessError> {
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
