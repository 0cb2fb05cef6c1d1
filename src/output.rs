//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! Processed cat.jpg → output/cat.webp
//!     input_size: 20480
//!     output_size: 8192
//!     size_ratio: 0.4
//!     duration: 12 ms
//! ```
//!
//! ```text
//! Failed cat.jpg
//!     Error: Input file not found: cat.jpg
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 a.jpg → out/a.webp
//! 002 b.jpg failed: Image processing failed: Failed to decode b.jpg: ...
//!
//! Batch processing completed: 1 succeeded, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that does the I/O. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::BatchReport;
use crate::result::ProcessingResult;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Format the outcome of a single `process` command.
pub fn format_process_result(input: &Path, result: &ProcessingResult) -> Vec<String> {
    let mut lines = Vec::new();
    match result.output_path() {
        Some(output) => {
            lines.push(format!(
                "Processed {} \u{2192} {}",
                input.display(),
                output.display()
            ));
            for (key, value) in result.metrics() {
                lines.push(format!("    {key}: {value}"));
            }
            lines.push(format!("    duration: {} ms", result.duration_ms()));
        }
        None => {
            lines.push(format!("Failed {}", input.display()));
            lines.push(format!("    Error: {}", result.error().unwrap_or("unknown error")));
        }
    }
    lines
}

/// Print a `process` result: successes to stdout, failures to stderr.
pub fn print_process_result(input: &Path, result: &ProcessingResult, quiet: bool) {
    let lines = format_process_result(input, result);
    if result.is_success() {
        if !quiet {
            lines.iter().for_each(|l| println!("{l}"));
        }
    } else {
        lines.iter().for_each(|l| eprintln!("{l}"));
    }
}

/// One line per item, then a blank line and the summary.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let index = format_index(i + 1);
            match item.result.output_path() {
                Some(output) => format!(
                    "{index} {} \u{2192} {}",
                    item.input.display(),
                    output.display()
                ),
                None => format!(
                    "{index} {} failed: {}",
                    item.input.display(),
                    item.result.error().unwrap_or("unknown error")
                ),
            }
        })
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_batch_summary(report));
    lines
}

pub fn format_batch_summary(report: &BatchReport) -> String {
    format!(
        "Batch processing completed: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    )
}

/// Print a batch report. Quiet mode prints failed items only.
pub fn print_batch_report(report: &BatchReport, quiet: bool) {
    if quiet {
        for item in report.items.iter().filter(|i| !i.result.is_success()) {
            eprintln!(
                "{} failed: {}",
                item.input.display(),
                item.result.error().unwrap_or("unknown error")
            );
        }
        return;
    }
    for line in format_batch_report(report) {
        println!("{line}");
    }
}
