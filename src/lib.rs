//! # QuackTool
//!
//! Media asset processing for the command line and for plugin hosts. One
//! request names an input file, a processing mode, and a few options; the
//! result is always a [`ProcessingResult`](result::ProcessingResult), never a
//! panic.
//!
//! # Request Flow
//!
//! ```text
//! RawOptions ─► ProcessingOptions ─► AssetConfig ─► Processor ─► Handler
//!  (CLI flags,     (validated)        (input checked,  (staging,     (one per
//!   plugin map)                        type resolved)   metrics)      type+mode)
//! ```
//!
//! The CLI, [`batch`], and [`plugin`] all enter through
//! [`Processor::process_request`](process::Processor::process_request), so a
//! bad value is rejected with the same message everywhere.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`options`] | Processing modes, quality, raw → validated options |
//! | [`asset`] | Asset types, extension inference, validated [`AssetConfig`](asset::AssetConfig) |
//! | [`result`] | Success/failure result with metrics |
//! | [`error`] | Validation and processing error enums |
//! | [`handlers`] | `(asset type, mode)` → handler table and the stock handlers |
//! | [`imaging`] | Pure-Rust image operations behind [`ImageBackend`](imaging::ImageBackend) |
//! | [`process`] | Dispatcher: output paths, staging, size metrics, timing |
//! | [`batch`] | Sequential multi-file processing with a summary |
//! | [`config`] | Layered `quacktool.toml` + environment configuration |
//! | [`plugin`] | Host-facing plugin contract and registry |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Image work uses the [`image`](https://docs.rs/image) crate in-process. No
//! external binaries are required. Video and audio transcoding would need
//! one, so those assets pass through unchanged and are only analyzed at the
//! byte level.
//!
//! ## Failures Are Results
//!
//! Per-asset failures (bad options, missing input, decode errors, a missing
//! handler) become failed results. Only configuration errors stop the CLI
//! before any work starts.

pub mod asset;
pub mod batch;
pub mod config;
pub mod error;
pub mod handlers;
pub mod imaging;
pub mod options;
pub mod output;
pub mod plugin;
pub mod process;
pub mod result;

#[cfg(test)]
pub(crate) mod test_helpers;
