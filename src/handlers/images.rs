//! Image handlers, all delegating pixel work to an [`ImageBackend`].

use super::{Handler, Job, hash_file, write_report};
use crate::error::ProcessError;
use crate::imaging::{
    ImageBackend, ImageOutputFormat, output_format, plan_optimize, plan_thumbnail, plan_transform,
};
use crate::result::Metrics;
use serde::Serialize;
use std::sync::Arc;

fn dimension_metrics(metrics: &mut Metrics, prefix: &str, (width, height): (u32, u32)) {
    metrics.insert(format!("{prefix}width"), width.into());
    metrics.insert(format!("{prefix}height"), height.into());
}

fn encode_metrics(
    original: (u32, u32),
    written: (u32, u32),
    format: ImageOutputFormat,
    job: &Job<'_>,
) -> Metrics {
    let mut metrics = Metrics::new();
    dimension_metrics(&mut metrics, "original_", original);
    dimension_metrics(&mut metrics, "", written);
    metrics.insert("format".into(), job.extension.into());
    if format.is_lossy() {
        metrics.insert("quality".into(), u32::from(job.options.quality.value()).into());
    }
    metrics
}

/// Re-encode at the requested quality, shrinking into width/height if given.
pub struct ImageOptimize {
    backend: Arc<dyn ImageBackend>,
}

impl ImageOptimize {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

impl Handler for ImageOptimize {
    fn name(&self) -> &'static str {
        "image-optimize"
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let format = output_format(job.extension)?;
        let original = self.backend.inspect(job.input)?.dimensions.as_tuple();
        let params = plan_optimize(job.input, job.output, format, original, job.options);
        let written = self.backend.encode(&params)?;
        Ok(encode_metrics(original, written.as_tuple(), format, job))
    }
}

/// Resize to the requested dimensions and convert format.
pub struct ImageTransform {
    backend: Arc<dyn ImageBackend>,
}

impl ImageTransform {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

impl Handler for ImageTransform {
    fn name(&self) -> &'static str {
        "image-transform"
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let format = output_format(job.extension)?;
        let original = self.backend.inspect(job.input)?.dimensions.as_tuple();
        let params = plan_transform(job.input, job.output, format, original, job.options)?;
        let written = self.backend.encode(&params)?;
        Ok(encode_metrics(original, written.as_tuple(), format, job))
    }
}

/// Center-cropped thumbnail.
pub struct ImageThumbnail {
    backend: Arc<dyn ImageBackend>,
}

impl ImageThumbnail {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

impl Handler for ImageThumbnail {
    fn name(&self) -> &'static str {
        "image-thumbnail"
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let format = output_format(job.extension)?;
        let params = plan_thumbnail(job.input, job.output, format, job.options);
        let written = self.backend.thumbnail(&params)?;
        let mut metrics = Metrics::new();
        dimension_metrics(&mut metrics, "", written.as_tuple());
        metrics.insert("format".into(), job.extension.into());
        Ok(metrics)
    }
}

#[derive(Serialize)]
struct ImageReport {
    file: String,
    bytes: u64,
    sha256: String,
    width: u32,
    height: u32,
    megapixels: f64,
    format: Option<String>,
    color_type: String,
    has_alpha: bool,
}

/// JSON report describing the decoded image.
pub struct ImageAnalyze {
    backend: Arc<dyn ImageBackend>,
}

impl ImageAnalyze {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

impl Handler for ImageAnalyze {
    fn name(&self) -> &'static str {
        "image-analyze"
    }

    fn fixed_extension(&self) -> Option<&'static str> {
        Some("json")
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let info = self.backend.inspect(job.input)?;
        let (width, height) = info.dimensions.as_tuple();
        let megapixels = (width as f64 * height as f64 / 10_000.0).round() / 100.0;
        let report = ImageReport {
            file: job.input.display().to_string(),
            bytes: std::fs::metadata(job.input)?.len(),
            sha256: hash_file(job.input)?,
            width,
            height,
            megapixels,
            format: info.format,
            color_type: info.color_type,
            has_alpha: info.has_alpha,
        };
        write_report(job.output, &report)?;

        let mut metrics = Metrics::new();
        dimension_metrics(&mut metrics, "", (width, height));
        metrics.insert("megapixels".into(), megapixels.into());
        if let Some(format) = report.format {
            metrics.insert("format".into(), format.into());
        }
        metrics.insert("color_type".into(), report.color_type.into());
        Ok(metrics)
    }
}
