//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with format sniffing |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode others | `DynamicImage::write_to` (lossless encoders) |
//! | Thumbnail crop | `DynamicImage::resize_to_fill` |
//! | Sharpening | `DynamicImage::unsharpen` |

use super::backend::{BackendError, Dimensions, ImageBackend, ImageInfo};
use super::params::{EncodeParams, ImageOutputFormat, ThumbnailParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image, sniffing the format from content rather than
/// trusting the extension.
fn load_image(path: &Path) -> Result<(DynamicImage, Option<image::ImageFormat>), BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let img = reader.decode().map_err(|e| BackendError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok((img, format))
}

/// Convert to a pixel layout the target encoder accepts.
fn prepare_for(img: DynamicImage, format: ImageOutputFormat) -> DynamicImage {
    match format {
        ImageOutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        ImageOutputFormat::WebP | ImageOutputFormat::Gif | ImageOutputFormat::Bmp => {
            if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            }
        }
        ImageOutputFormat::Png | ImageOutputFormat::Tiff => img,
    }
}

fn save_image(
    img: DynamicImage,
    path: &Path,
    format: ImageOutputFormat,
    quality: u8,
) -> Result<(), BackendError> {
    let img = prepare_for(img, format);
    let mut writer = BufWriter::new(File::create(path)?);
    let written = match format {
        ImageOutputFormat::Jpeg => {
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        }
        other => img.write_to(&mut writer, other.image_format()),
    };
    written
        .map_err(|e| BackendError::ProcessingFailed(format!("{format:?} encode failed: {e}")))?;
    writer.flush()?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn inspect(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        let (img, format) = load_image(path)?;
        let (width, height) = img.dimensions();
        Ok(ImageInfo {
            dimensions: Dimensions { width, height },
            format: format.map(|f| format!("{f:?}").to_lowercase()),
            color_type: format!("{:?}", img.color()),
            has_alpha: img.color().has_alpha(),
        })
    }

    fn encode(&self, params: &EncodeParams) -> Result<Dimensions, BackendError> {
        let (img, _) = load_image(&params.source)?;
        let img = match params.resize {
            Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
            None => img,
        };
        let (width, height) = img.dimensions();
        save_image(img, &params.output, params.format, params.quality.value())?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<Dimensions, BackendError> {
        let (img, _) = load_image(&params.source)?;

        // Fill-resize then center-crop to exact dimensions
        let filled =
            img.resize_to_fill(params.crop_width, params.crop_height, FilterType::Lanczos3);

        let final_img = match params.sharpening {
            Some(s) => filled.unsharpen(s.sigma, s.threshold),
            None => filled,
        };

        let (width, height) = final_img.dimensions();
        save_image(final_img, &params.output, params.format, params.quality.value())?;
        Ok(Dimensions { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Sharpening;
    use crate::options::Quality;
    use crate::test_helpers::create_test_jpeg;

    fn q(v: i64) -> Quality {
        Quality::new(v).unwrap()
    }

    #[test]
    fn inspect_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let info = RustBackend::new().inspect(&path).unwrap();
        assert_eq!(info.dimensions.as_tuple(), (200, 150));
        assert_eq!(info.format.as_deref(), Some("jpeg"));
        assert!(!info.has_alpha);
    }

    #[test]
    fn inspect_sniffs_content_not_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("mislabeled.png");
        create_test_jpeg(&path, 10, 10);

        let info = RustBackend::new().inspect(&path).unwrap();
        assert_eq!(info.format.as_deref(), Some("jpeg"));
    }

    #[test]
    fn inspect_corrupt_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corrupt.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(RustBackend::new().inspect(&path).is_err());
    }

    #[test]
    fn inspect_nonexistent_file_errors() {
        let result = RustBackend::new().inspect(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn encode_jpeg_to_webp() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 120, 80);
        let output = tmp.path().join("out.webp");

        let dims = RustBackend::new()
            .encode(&EncodeParams {
                source,
                output: output.clone(),
                format: ImageOutputFormat::WebP,
                resize: None,
                quality: q(80),
            })
            .unwrap();

        assert_eq!(dims.as_tuple(), (120, 80));
        assert_eq!(image::image_dimensions(&output).unwrap(), (120, 80));
    }

    #[test]
    fn encode_with_resize_to_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 400, 300);
        let output = tmp.path().join("out.png");

        RustBackend::new()
            .encode(&EncodeParams {
                source,
                output: output.clone(),
                format: ImageOutputFormat::Png,
                resize: Some((200, 150)),
                quality: q(90),
            })
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 150));
    }

    #[test]
    fn lower_jpeg_quality_produces_smaller_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 256, 256);
        let low = tmp.path().join("low.jpg");
        let high = tmp.path().join("high.jpg");
        let backend = RustBackend::new();

        for (output, quality) in [(&low, 10), (&high, 95)] {
            backend
                .encode(&EncodeParams {
                    source: source.clone(),
                    output: output.clone(),
                    format: ImageOutputFormat::Jpeg,
                    resize: None,
                    quality: q(quality),
                })
                .unwrap();
        }

        let low_size = std::fs::metadata(&low).unwrap().len();
        let high_size = std::fs::metadata(&high).unwrap().len();
        assert!(low_size < high_size, "{low_size} should be < {high_size}");
    }

    #[test]
    fn thumbnail_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        create_test_jpeg(&source, 800, 600);
        let output = tmp.path().join("thumb.jpg");

        RustBackend::new()
            .thumbnail(&ThumbnailParams {
                source,
                output: output.clone(),
                format: ImageOutputFormat::Jpeg,
                crop_width: 100,
                crop_height: 120,
                quality: q(85),
                sharpening: Some(Sharpening::light()),
            })
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (100, 120));
    }
}
