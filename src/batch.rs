//! Sequential batch processing.
//!
//! Every input gets its own result; a failing input never stops the batch.
//! Directories are expanded recursively in file-name order, keeping only
//! files whose extension maps to an asset type. Files named explicitly are
//! always attempted, so a typo shows up as a failed item rather than being
//! skipped.

use crate::asset::ExtensionTable;
use crate::options::RawOptions;
use crate::process::{AssetRequest, Processor};
use crate::result::ProcessingResult;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub input: PathBuf,
    pub result: ProcessingResult,
}

/// Results in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Expand directories into the files beneath them.
pub fn expand_inputs(inputs: &[PathBuf], extensions: &ExtensionTable) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
        {
            if entry.file_type().is_file() && extensions.infer(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
    }
    files
}

/// Process `inputs` one at a time, deriving outputs into `output_dir`.
pub fn run(
    processor: &Processor,
    inputs: &[PathBuf],
    output_dir: &Path,
    options: &RawOptions,
) -> BatchReport {
    let files = expand_inputs(inputs, processor.extensions());
    info!(files = files.len(), output_dir = %output_dir.display(), "starting batch");

    let items: Vec<BatchItem> = files
        .into_iter()
        .map(|input| {
            let result = processor.process_request(&AssetRequest::new(&input, options), output_dir);
            BatchItem { input, result }
        })
        .collect();
    let report = BatchReport { items };

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    report
}
