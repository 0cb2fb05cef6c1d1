//! Dispatch: route a validated [`AssetConfig`] to its handler and turn the
//! outcome into a [`ProcessingResult`].
//!
//! ## Output paths
//!
//! An explicit output path is used as given. Otherwise the output is derived
//! as `<dir>/<stem>.<ext>`, where `ext` is the handler's fixed extension
//! (`json` for reports), else the requested format, else the input's
//! extension. An input without an extension, and no format, gives
//! `<dir>/<stem>`. Derived paths never overwrite an existing file:
//!
//! ```text
//! output/cat.webp      # first run
//! output/cat_1.webp    # second run
//! output/cat_2.webp    # third run
//! ```
//!
//! ## Staging
//!
//! Handlers write into a temporary file (in `paths.temp_dir`, or next to the
//! output). Only a successful run is persisted to the output path, so a
//! failing handler never leaves a partial artifact behind.
//!
//! Nothing here returns an error: every failure becomes a failed result.

use crate::asset::{AssetConfig, AssetType, ExtensionTable};
use crate::config::ToolConfig;
use crate::error::{ProcessError, ValidationError};
use crate::handlers::{Handler, HandlerRegistry, Job};
use crate::options::{OptionDefaults, ProcessingOptions, RawOptions};
use crate::result::{Metrics, ProcessingResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

/// One unvalidated request, as it arrives from the CLI, a batch, or a
/// plugin host.
#[derive(Debug, Clone, Copy)]
pub struct AssetRequest<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    /// Asset type token; inferred from the extension when `None`.
    pub asset_type: Option<&'a str>,
    pub options: &'a RawOptions,
}

impl<'a> AssetRequest<'a> {
    pub fn new(input: &'a Path, options: &'a RawOptions) -> Self {
        Self {
            input,
            output: None,
            asset_type: None,
            options,
        }
    }
}

/// Routes assets to handlers. Built once from the effective configuration
/// and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Processor {
    registry: HandlerRegistry,
    output_dir: PathBuf,
    temp_dir: Option<PathBuf>,
    defaults: OptionDefaults,
    extensions: ExtensionTable,
}

impl Processor {
    /// Processor with the stock handler table.
    pub fn new(config: &ToolConfig) -> Self {
        Self::with_registry(config, HandlerRegistry::stock())
    }

    pub fn with_registry(config: &ToolConfig, registry: HandlerRegistry) -> Self {
        Self {
            registry,
            output_dir: config.paths.output_dir.clone(),
            temp_dir: config.paths.temp_dir.clone(),
            defaults: config.option_defaults(),
            extensions: config.extension_table(),
        }
    }

    /// Default directory for derived output paths.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn option_defaults(&self) -> &OptionDefaults {
        &self.defaults
    }

    pub fn extensions(&self) -> &ExtensionTable {
        &self.extensions
    }

    /// Validate a raw request into an [`AssetConfig`].
    pub fn prepare(&self, request: &AssetRequest<'_>) -> Result<AssetConfig, ValidationError> {
        let options = ProcessingOptions::from_raw(request.options, &self.defaults)?;
        let asset_type = request
            .asset_type
            .map(str::parse::<AssetType>)
            .transpose()?;
        AssetConfig::new(
            request.input,
            request.output.map(Path::to_path_buf),
            asset_type,
            options,
            &self.extensions,
        )
    }

    /// Validate and dispatch a raw request. Validation failures come back
    /// as failed results, like any other failure.
    pub fn process_request(
        &self,
        request: &AssetRequest<'_>,
        default_dir: &Path,
    ) -> ProcessingResult {
        let started = Instant::now();
        match self.prepare(request) {
            Ok(asset) => self.dispatch_into(&asset, default_dir),
            Err(e) => {
                error!(input = %request.input.display(), error = %e, "invalid request");
                ProcessingResult::failure(e.to_string()).with_duration(elapsed_ms(started))
            }
        }
    }

    /// Dispatch with derived outputs landing in the configured output
    /// directory.
    pub fn dispatch(&self, asset: &AssetConfig) -> ProcessingResult {
        self.dispatch_into(asset, &self.output_dir)
    }

    /// Dispatch with derived outputs landing in `default_dir`.
    pub fn dispatch_into(&self, asset: &AssetConfig, default_dir: &Path) -> ProcessingResult {
        let started = Instant::now();
        let input = asset.input_path();
        info!(
            input = %input.display(),
            asset_type = %asset.asset_type(),
            mode = %asset.options().mode,
            "processing asset"
        );

        let result = match self.run(asset, default_dir) {
            Ok((output, metrics)) => {
                info!(input = %input.display(), output = %output.display(), "processed asset");
                ProcessingResult::success(output, metrics)
            }
            Err(e) => {
                error!(input = %input.display(), error = %e, "processing failed");
                ProcessingResult::failure(e.to_string())
            }
        };
        result.with_duration(elapsed_ms(started))
    }

    fn run(
        &self,
        asset: &AssetConfig,
        default_dir: &Path,
    ) -> Result<(PathBuf, Metrics), ProcessError> {
        let input = asset.input_path();
        if !input.exists() {
            return Err(ValidationError::InputNotFound(input.to_path_buf()).into());
        }
        let options = asset.options();
        let handler = self
            .registry
            .get(asset.asset_type(), options.mode)
            .ok_or(ProcessError::NoHandler {
                asset_type: asset.asset_type(),
                mode: options.mode,
            })?;

        let preferred = preferred_extension(input, options, handler);
        let output = match asset.output_path() {
            Some(path) => path.to_path_buf(),
            None => derive_output_path(input, default_dir, &preferred),
        };
        let extension = extension_of(&output).unwrap_or(preferred);
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staged = self.stage(&output, &extension)?;
        debug!(handler = handler.name(), staging = %staged.path().display(), "running handler");
        let mut metrics = handler.run(&Job {
            input,
            output: staged.path(),
            extension: &extension,
            asset_type: asset.asset_type(),
            options,
        })?;
        persist(staged, &output)?;

        let input_size = fs::metadata(input)?.len();
        let output_size = fs::metadata(&output)?.len();
        metrics.insert("input_size".into(), input_size.into());
        metrics.insert("output_size".into(), output_size.into());
        metrics.insert("size_ratio".into(), size_ratio(input_size, output_size).into());
        Ok((output, metrics))
    }

    fn stage(&self, output: &Path, extension: &str) -> Result<NamedTempFile, ProcessError> {
        let dir = match &self.temp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => staging_dir_for(output),
        };
        Ok(staging_file(&dir, extension)?)
    }
}

fn staging_file(dir: &Path, extension: &str) -> std::io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".quacktool-")
        .suffix(&with_extension("", extension))
        .tempfile_in(dir)
}

/// `name.extension`, or just `name` when the extension is empty.
fn with_extension(name: &str, extension: &str) -> String {
    if extension.is_empty() {
        name.to_string()
    } else {
        format!("{name}.{extension}")
    }
}

fn staging_dir_for(output: &Path) -> PathBuf {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Move a staged file into place. A rename across filesystems fails, so
/// in that case the bytes are re-staged next to the output and renamed
/// from there.
fn persist(staged: NamedTempFile, output: &Path) -> Result<(), ProcessError> {
    let err = match staged.persist(output) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };
    let local_dir = staging_dir_for(output);
    if err.file.path().parent() == Some(local_dir.as_path()) {
        return Err(err.error.into());
    }
    warn!(error = %err.error, "rename from staging failed, copying next to output");
    let extension = extension_of(output).unwrap_or_default();
    let local = staging_file(&local_dir, &extension)?;
    fs::copy(err.file.path(), local.path())?;
    local.persist(output).map_err(|e| e.error)?;
    Ok(())
}

/// Extension for a derived output path. Empty when neither the handler,
/// the request, nor the input names one.
fn preferred_extension(
    input: &Path,
    options: &ProcessingOptions,
    handler: &dyn Handler,
) -> String {
    handler
        .fixed_extension()
        .map(str::to_string)
        .or_else(|| options.format.clone())
        .or_else(|| extension_of(input))
        .unwrap_or_default()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
}

/// `<dir>/<stem>.<extension>` (or `<dir>/<stem>` for an empty extension),
/// with `_1`, `_2`, ... appended to the stem until the path is free.
pub fn derive_output_path(input: &Path, dir: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let candidate = dir.join(with_extension(&stem, extension));
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| dir.join(with_extension(&format!("{stem}_{n}"), extension)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// `output / input`, rounded to four places. An empty input counts as
/// unchanged.
fn size_ratio(input_size: u64, output_size: u64) -> f64 {
    if input_size == 0 {
        return 1.0;
    }
    (output_size as f64 / input_size as f64 * 10_000.0).round() / 10_000.0
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::options::ProcessingMode;
    use crate::result::MetricValue;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records every job it sees, writes fixed bytes, and optionally fails
    /// after writing.
    #[derive(Default)]
    struct RecordingHandler {
        fail: bool,
        jobs: Mutex<Vec<(PathBuf, String)>>,
    }

    impl Handler for RecordingHandler {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
            self.jobs
                .lock()
                .unwrap()
                .push((job.input.to_path_buf(), job.extension.to_string()));
            fs::write(job.output, b"half written")?;
            if self.fail {
                return Err(ProcessError::Handler("boom".into()));
            }
            let mut metrics = Metrics::new();
            metrics.insert("handler".into(), "recording".into());
            Ok(metrics)
        }
    }

    fn processor_with(handler: Arc<RecordingHandler>, config: &ToolConfig) -> Processor {
        let mut registry = HandlerRegistry::new();
        registry.register(AssetType::Document, ProcessingMode::Optimize, handler);
        Processor::with_registry(config, registry)
    }

    fn write_input(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn asset(input: &Path, output: Option<PathBuf>, mode: ProcessingMode) -> AssetConfig {
        AssetConfig::new(
            input,
            output,
            None,
            ProcessingOptions::new(mode),
            &ExtensionTable::default(),
        )
        .unwrap()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn derive_output_path_avoids_existing_files() {
        let tmp = TempDir::new().unwrap();
        let input = Path::new("/photos/cat.jpg");
        assert_eq!(derive_output_path(input, tmp.path(), "webp"), tmp.path().join("cat.webp"));

        fs::write(tmp.path().join("cat.webp"), b"x").unwrap();
        fs::write(tmp.path().join("cat_1.webp"), b"x").unwrap();
        assert_eq!(
            derive_output_path(input, tmp.path(), "webp"),
            tmp.path().join("cat_2.webp")
        );
    }

    #[test]
    fn derive_output_path_without_extension() {
        let tmp = TempDir::new().unwrap();
        let input = Path::new("/docs/README");
        assert_eq!(derive_output_path(input, tmp.path(), ""), tmp.path().join("README"));

        fs::write(tmp.path().join("README"), b"x").unwrap();
        assert_eq!(derive_output_path(input, tmp.path(), ""), tmp.path().join("README_1"));
    }

    #[test]
    fn size_ratio_rounds_to_four_places() {
        assert_eq!(size_ratio(3, 1), 0.3333);
        assert_eq!(size_ratio(0, 0), 1.0);
        assert_eq!(size_ratio(100, 250), 2.5);
    }

    #[test]
    fn success_adds_size_metrics_and_duration() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "notes.txt", b"0123456789012345678901234");
        let handler = Arc::new(RecordingHandler::default());
        let processor = processor_with(handler.clone(), &ToolConfig::default());

        let out_dir = tmp.path().join("out");
        let result =
            processor.dispatch_into(&asset(&input, None, ProcessingMode::Optimize), &out_dir);

        assert!(result.is_success(), "{:?}", result.error());
        assert_eq!(result.output_path(), Some(out_dir.join("notes.txt").as_path()));
        let metrics = result.metrics();
        assert_eq!(metrics["input_size"], MetricValue::Int(25));
        assert_eq!(metrics["output_size"], MetricValue::Int(12));
        assert_eq!(metrics["size_ratio"], MetricValue::Float(0.48));
        assert_eq!(metrics["handler"], MetricValue::Text("recording".into()));
        assert!(result.duration_ms() >= 1);
        assert_eq!(entries(&out_dir), vec!["notes.txt"]);
        assert_eq!(handler.jobs.lock().unwrap()[0].1, "txt");
    }

    #[test]
    fn failing_handler_leaves_no_partial_output() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "notes.txt", b"hello");
        let handler = Arc::new(RecordingHandler {
            fail: true,
            ..Default::default()
        });
        let processor = processor_with(handler, &ToolConfig::default());

        let out_dir = tmp.path().join("out");
        let output = out_dir.join("final.txt");
        let result =
            processor.dispatch(&asset(&input, Some(output.clone()), ProcessingMode::Optimize));

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Processing failed: boom"));
        assert!(result.output_path().is_none());
        assert!(!output.exists());
        assert!(entries(&out_dir).is_empty());
    }

    #[test]
    fn configured_temp_dir_is_used_and_cleaned() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "notes.txt", b"hello");
        let mut config = ToolConfig::default();
        config.paths.temp_dir = Some(tmp.path().join("staging"));
        let processor = processor_with(Arc::new(RecordingHandler::default()), &config);

        let output = tmp.path().join("out").join("notes.txt");
        let result =
            processor.dispatch(&asset(&input, Some(output.clone()), ProcessingMode::Optimize));

        assert!(result.is_success());
        assert_eq!(fs::read(&output).unwrap(), b"half written");
        assert!(entries(&tmp.path().join("staging")).is_empty());
    }

    #[test]
    fn missing_handler_is_a_failed_result() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "song.mp3", b"ID3");
        let processor = Processor::new(&ToolConfig::default());

        let result =
            processor.dispatch_into(&asset(&input, None, ProcessingMode::Generate), tmp.path());
        assert!(!result.is_success());
        assert_eq!(
            result.error(),
            Some("No handler registered for generate on audio assets")
        );
    }

    #[test]
    fn input_removed_after_validation_fails_cleanly() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "notes.txt", b"hello");
        let asset = asset(&input, None, ProcessingMode::Optimize);
        fs::remove_file(&input).unwrap();

        let processor =
            processor_with(Arc::new(RecordingHandler::default()), &ToolConfig::default());
        let result = processor.dispatch_into(&asset, tmp.path());
        assert!(result.error().unwrap().starts_with("Input file not found"));
    }

    #[test]
    fn format_and_handler_default_pick_the_extension() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "notes.md", b"# Title\n\nBody text.\n");
        let processor = Processor::new(&ToolConfig::default());

        let result =
            processor.dispatch_into(&asset(&input, None, ProcessingMode::Analyze), tmp.path());
        assert_eq!(result.output_path(), Some(tmp.path().join("notes.json").as_path()));
    }

    #[test]
    fn extensionless_input_with_explicit_type_is_copied() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "README", b"# Read me\n");
        let processor = Processor::new(&ToolConfig::default());
        let asset = AssetConfig::new(
            &input,
            None,
            Some(AssetType::Document),
            ProcessingOptions::new(ProcessingMode::Optimize),
            &ExtensionTable::default(),
        )
        .unwrap();

        let out_dir = tmp.path().join("out");
        let result = processor.dispatch_into(&asset, &out_dir);
        assert!(result.is_success(), "{:?}", result.error());
        assert_eq!(result.output_path(), Some(out_dir.join("README").as_path()));
        assert_eq!(fs::read(out_dir.join("README")).unwrap(), b"# Read me\n");
        assert_eq!(entries(&out_dir), vec!["README"]);
    }

    #[test]
    fn report_handlers_keep_json_despite_requested_format() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "song.mp3", b"ID3");
        let processor = Processor::new(&ToolConfig::default());
        let options = ProcessingOptions {
            format: Some("webp".into()),
            ..ProcessingOptions::new(ProcessingMode::Analyze)
        };
        let asset =
            AssetConfig::new(&input, None, None, options, &ExtensionTable::default()).unwrap();

        let result = processor.dispatch_into(&asset, tmp.path());
        assert_eq!(result.output_path(), Some(tmp.path().join("song.json").as_path()));
    }

    #[test]
    fn image_encode_failure_cleans_staging() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "cat.jpg", b"not really a jpeg");
        let registry = HandlerRegistry::stock_with_backend(Arc::new(MockBackend::failing(40, 30)));
        let processor = Processor::with_registry(&ToolConfig::default(), registry);

        let out_dir = tmp.path().join("out");
        let result =
            processor.dispatch_into(&asset(&input, None, ProcessingMode::Optimize), &out_dir);
        assert!(result.error().unwrap().contains("mock encode failure"));
        assert!(entries(&out_dir).is_empty());
    }

    #[test]
    fn process_request_reports_validation_errors() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "cat.jpg", b"x");
        let processor = Processor::new(&ToolConfig::default());
        let raw = RawOptions {
            quality: Some(150),
            ..Default::default()
        };

        let result = processor.process_request(&AssetRequest::new(&input, &raw), tmp.path());
        assert_eq!(
            result.error(),
            Some("quality must be between 1 and 100 (got 150)")
        );
    }

    #[test]
    fn prepare_honors_explicit_type_and_config_defaults() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "blob.bin", b"x");
        let mut config = ToolConfig::default();
        config.processing.default_quality = 55;
        let processor = Processor::new(&config);
        let raw = RawOptions::default();

        let asset = processor
            .prepare(&AssetRequest {
                asset_type: Some("Audio"),
                ..AssetRequest::new(&input, &raw)
            })
            .unwrap();
        assert_eq!(asset.asset_type(), AssetType::Audio);
        assert_eq!(asset.options().quality.value(), 55);
        assert_eq!(asset.options().mode, ProcessingMode::Optimize);
    }
}
