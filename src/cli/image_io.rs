//! CLI image helpers.
//!
//! Normalizes extensions, loads pixel buffers, and writes them with the
//! appropriate encoder.
use std::fs::File;
use std::io::{Error, ErrorKind};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError};

use super::AppError;
use crate::transform::PixelBuffer;

/// Extensions [`write_buffer`] can encode
pub(super) const SUPPORTED_EXTENSIONS: [&str; 5] =
    ["bmp", "png", "tif", "tiff", "ppm"];

/// Normalizes the extension of a path to lowercase.
pub(super) fn normalized_extension(path: impl AsRef<Path>) -> Option<String>
{
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Checks that `extension` names a format [`write_buffer`] supports.
///
/// # Errors
///
/// Returns [`AppError::UnsupportedFormat`] otherwise.
pub(super) fn ensure_supported(
    extension: Option<&str>,
) -> Result<(), AppError>
{
    match extension
    {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext) => Ok(()),
        _ => Err(AppError::UnsupportedFormat {
            extension: extension.unwrap_or("<unknown>").into(),
        }),
    }
}

/// Loads an image from the specified path as a row-major RGB buffer.
///
/// Alpha is dropped and any colour type is converted to 8-bit RGB.
///
/// # Errors
///
/// Returns:
/// * [`AppError::Read`] when the path is a directory
/// * [`AppError::ImageOpen`] when the image cannot be loaded
/// * [`AppError::Transform`] when the image has a zero dimension
pub(super) fn load_buffer(
    path: impl AsRef<Path>,
) -> Result<PixelBuffer, AppError>
{
    if path.as_ref().is_dir()
    {
        let message = format!("{} is a directory", path.as_ref().display());
        return Err(AppError::Read {
            path: path.as_ref().into(),
            source: Error::new(ErrorKind::IsADirectory, message),
        });
    }

    let image = image::open(path.as_ref())
        .map_err(|source| AppError::ImageOpen {
            path: path.as_ref().into(),
            source,
        })
        .map(DynamicImage::into_rgb8)?;

    let buffer = PixelBuffer::try_from(image)?;
    log::debug!(
        "loaded {} ({}x{})",
        path.as_ref().display(),
        buffer.width(),
        buffer.height()
    );
    Ok(buffer)
}

/// Writes the provided buffer using the encoder defined by the extension.
///
/// # Errors
///
/// Returns:
/// * [`AppError::UnsupportedFormat`] when the extension is not supported
/// * [`AppError::Write`] when the file cannot be created
/// * [`AppError::ImageEncode`] when the image cannot be encoded
///
/// # Supported Extensions
///
/// * bmp
/// * png
/// * tiff / tif
/// * ppm
pub(super) fn write_buffer(
    buffer: &PixelBuffer,
    extension: Option<&str>,
    output: impl AsRef<Path>,
) -> Result<(), AppError>
{
    ensure_supported(extension)?;

    let mut file =
        File::create(output.as_ref()).map_err(|source| AppError::Write {
            path: output.as_ref().into(),
            source,
        })?;

    match extension
    {
        Some(ext @ "png") =>
        {
            let encoder = PngEncoder::new_with_quality(
                &mut file,
                CompressionType::Default,
                FilterType::Adaptive,
            );
            encoder
                .write_image(
                    buffer.as_bytes(),
                    buffer.width(),
                    buffer.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(encode_error(output.as_ref(), ext))?;
        },
        Some(ext @ "bmp") =>
        {
            let mut encoder = BmpEncoder::new(&mut file);
            encoder
                .encode(
                    buffer.as_bytes(),
                    buffer.width(),
                    buffer.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(encode_error(output.as_ref(), ext))?;
        },
        Some(ext @ ("tiff" | "tif")) =>
        {
            let encoder = TiffEncoder::new(&mut file);
            encoder
                .write_image(
                    buffer.as_bytes(),
                    buffer.width(),
                    buffer.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(encode_error(output.as_ref(), ext))?;
        },
        Some(ext @ "ppm") =>
        {
            let mut encoder = PnmEncoder::with_subtype(
                PnmEncoder::new(&mut file),
                PnmSubtype::Pixmap(SampleEncoding::Binary),
            );
            encoder
                .encode(
                    buffer.as_bytes(),
                    buffer.width(),
                    buffer.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(encode_error(output.as_ref(), ext))?;
        },
        // ensure_supported already rejected everything else
        _ =>
        {
            return Err(AppError::UnsupportedFormat {
                extension: extension.unwrap_or("<unknown>").into(),
            });
        },
    }

    log::info!("saved {}", output.as_ref().display());
    Ok(())
}

/// Builds the error mapper for a failed encode of `path` as `ext`
fn encode_error(
    path: &Path,
    ext: &str,
) -> impl FnOnce(ImageError) -> AppError
{
    let path: Box<Path> = path.into();
    let target_format: Box<str> = ext.into();
    move |source| AppError::ImageEncode {
        path,
        target_format,
        source,
    }
}
