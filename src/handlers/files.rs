//! Format-agnostic handlers: byte-for-byte passthrough and file analysis.

use super::{Handler, Job, write_report};
use crate::error::ProcessError;
use crate::result::Metrics;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// SHA-256 of a file's contents as lowercase hex. Streams the file.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Copies the input unchanged. Stands in for transcoders this tool does not
/// ship, so it refuses to "convert" by renaming.
pub struct Passthrough;

impl Handler for Passthrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let source_ext = extension_of(job.input);
        if !source_ext.eq_ignore_ascii_case(job.extension) {
            return Err(ProcessError::Handler(format!(
                "converting {} assets from '{}' to '{}' needs an external transcoder",
                job.asset_type, source_ext, job.extension
            )));
        }
        let copied = std::fs::copy(job.input, job.output)?;
        let mut metrics = Metrics::new();
        metrics.insert("bytes_copied".into(), copied.into());
        Ok(metrics)
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    asset_type: &'a str,
    extension: String,
    bytes: u64,
    sha256: String,
}

/// JSON report with size, extension, and content hash.
pub struct FileAnalyze;

impl Handler for FileAnalyze {
    fn name(&self) -> &'static str {
        "file-analyze"
    }

    fn fixed_extension(&self) -> Option<&'static str> {
        Some("json")
    }

    fn run(&self, job: &Job<'_>) -> Result<Metrics, ProcessError> {
        let report = FileReport {
            file: job.input.display().to_string(),
            asset_type: job.asset_type.as_str(),
            extension: extension_of(job.input),
            bytes: std::fs::metadata(job.input)?.len(),
            sha256: hash_file(job.input)?,
        };
        write_report(job.output, &report)?;

        let mut metrics = Metrics::new();
        metrics.insert("sha256".into(), report.sha256.into());
        Ok(metrics)
    }
}
