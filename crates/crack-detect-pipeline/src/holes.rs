//! Reclaiming small background pockets enclosed by crack regions.
//!
//! After dilation a crack body can still contain gaps where lighting
//! lifted a few pixels above the darkness threshold. Labeling the
//! *inverted* mask turns those gaps into components of their own;
//! every one smaller than the cutoff is painted back as foreground.
//! The image's real background, being far larger than the cutoff,
//! stays untouched.

use image::GrayImage;

use crate::binarize;
use crate::label;
use crate::types::FOREGROUND;

/// Fill every background component of `mask` whose area is strictly
/// below `max_hole_area`.
///
/// Foreground pixels are never modified. Because components are found
/// with 8-connectivity on the inverted mask, a pocket touching the
/// image edge counts as a hole too when it is small enough.
#[must_use = "returns the filled mask"]
pub fn fill_holes(mask: &GrayImage, max_hole_area: u32) -> GrayImage {
    let inverted = binarize::invert(mask);
    let pockets = label::label_components(&inverted);

    let mut filled = mask.clone();
    let count = pockets.paint(&mut filled, FOREGROUND, |c| c.area < max_hole_area);
    tracing::debug!(
        pockets = pockets.len(),
        filled = count,
        max_hole_area,
        "filled holes"
    );
    filled
}
