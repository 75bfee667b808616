//! Input validation and the optional bottom-row crop.
//!
//! Batch scans carry an instrument info bar along the bottom edge; it
//! is removed once here so every derived mask, and the reported
//! dimensions, share the cropped geometry.

use image::GrayImage;

use crate::types::{Dimensions, PipelineError};

/// Reject buffers the pipeline cannot process.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if either dimension is zero.
pub fn ensure_non_empty(image: &GrayImage) -> Result<Dimensions, PipelineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "image must have nonzero width and height, got {width}x{height}"
        )));
    }
    Ok(Dimensions { width, height })
}

/// Drop the last `rows` rows of `image`.
///
/// `rows == 0` returns an unchanged copy.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image is empty or if
/// `rows` would remove the whole image.
pub fn crop_bottom(image: &GrayImage, rows: u32) -> Result<GrayImage, PipelineError> {
    let Dimensions { width, height } = ensure_non_empty(image)?;
    if rows == 0 {
        return Ok(image.clone());
    }
    if rows >= height {
        return Err(PipelineError::InvalidInput(format!(
            "cannot crop {rows} rows from an image {height} rows tall"
        )));
    }
    Ok(image::imageops::crop_imm(image, 0, 0, width, height - rows).to_image())
}
