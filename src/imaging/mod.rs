//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Inspect** | `image::ImageReader` (format sniffing + decode) |
//! | **Re-encode / resize** | Lanczos3 + per-format encoders |
//! | **Thumbnail** | `resize_to_fill` + `unsharpen` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Planning functions that map options onto parameters

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageInfo};
pub use operations::{output_format, plan_optimize, plan_thumbnail, plan_transform};
pub use params::{EncodeParams, ImageOutputFormat, Sharpening, ThumbnailParams};
pub use rust_backend::RustBackend;
