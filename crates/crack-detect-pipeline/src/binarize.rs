//! Thresholding grayscale buffers into binary masks.
//!
//! A binary mask is a [`GrayImage`] holding only [`FOREGROUND`] (255)
//! and [`BACKGROUND`] (0). Every function here returns a mask in that
//! form regardless of its input.

use image::{GrayImage, Luma};

use crate::blur::{self, NOISE_KERNEL_SIZE};
use crate::types::{BACKGROUND, FOREGROUND};

/// Smooth `image` with the 5x5 noise kernel, then mark every pixel in
/// the inclusive range `[0, darkness]` as foreground.
#[must_use = "returns the binary mask"]
pub fn binarize(image: &GrayImage, darkness: u8) -> GrayImage {
    let blurred = blur::gaussian_blur(image, NOISE_KERNEL_SIZE);
    in_range(&blurred, 0, darkness)
}

/// Foreground where `low <= value <= high`, background elsewhere.
///
/// An empty range (`low > high`) yields an all-background mask.
#[must_use = "returns the binary mask"]
pub fn in_range(image: &GrayImage, low: u8, high: u8) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (dst, src) in out.pixels_mut().zip(image.pixels()) {
        let v = src.0[0];
        *dst = Luma([if (low..=high).contains(&v) {
            FOREGROUND
        } else {
            BACKGROUND
        }]);
    }
    out
}

/// Swap foreground and background.
///
/// Any nonzero input counts as foreground, so the result is always a
/// clean binary mask.
#[must_use = "returns the inverted mask"]
pub fn invert(mask: &GrayImage) -> GrayImage {
    let mut out = mask.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] == BACKGROUND {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    out
}

/// Number of foreground pixels in a mask.
#[must_use]
pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v != BACKGROUND).count()
}

/// Returns `true` if every pixel is either [`FOREGROUND`] or [`BACKGROUND`].
#[must_use]
pub fn is_binary(mask: &GrayImage) -> bool {
    mask.as_raw()
        .iter()
        .all(|&v| v == FOREGROUND || v == BACKGROUND)
}
