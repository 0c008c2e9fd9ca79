//! Image decoding and encoding at the command-line boundary.

use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma};
use strata_core::{Plane, StrataError};

/// Load an image from disk as a single luminance plane in `[0, 255]`.
///
/// Supports the formats enabled in the `image` crate (PNG, JPEG, TIFF, ...).
/// Color sources are converted to 8-bit luminance first.
pub fn load_luma(path: &Path) -> Result<Plane, ImageIoError> {
    let img = image::open(path).map_err(ImageIoError::Decode)?;
    luma_to_plane(&img.to_luma8())
}

/// Convert an 8-bit grayscale buffer into a plane.
pub fn luma_to_plane(gray: &GrayImage) -> Result<Plane, ImageIoError> {
    let (width, height) = gray.dimensions();
    let pixels = gray.as_raw().iter().map(|&v| v as f32).collect();
    Ok(Plane::new(width as usize, height as usize, pixels)?)
}

/// Quantize a plane to 8 bits: clip to `[0, 255]`, then truncate.
pub fn plane_to_luma(plane: &Plane) -> Result<GrayImage, ImageIoError> {
    plane.validate()?;
    let width = u32::try_from(plane.width).map_err(|_| ImageIoError::TooLarge)?;
    let height = u32::try_from(plane.height).map_err(|_| ImageIoError::TooLarge)?;
    let raw: Vec<u8> = plane
        .pixels
        .iter()
        .map(|&v| v.clamp(0.0, 255.0) as u8)
        .collect();
    ImageBuffer::<Luma<u8>, _>::from_raw(width, height, raw).ok_or(ImageIoError::TooLarge)
}

/// Encode a plane as an 8-bit grayscale image; the format follows the
/// file extension.
pub fn save_luma(plane: &Plane, path: &Path) -> Result<(), ImageIoError> {
    plane_to_luma(plane)?.save(path).map_err(ImageIoError::Encode)
}

/// Errors that can occur while moving images across the boundary.
#[derive(Debug, thiserror::Error)]
pub enum ImageIoError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("image dimensions exceed the encoder limits")]
    TooLarge,
    #[error(transparent)]
    Core(#[from] StrataError),
}
