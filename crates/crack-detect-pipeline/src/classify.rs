//! Size-based defect classification.

use image::GrayImage;

use crate::label::{self, ComponentStats};

/// First component of `mask`, in label order, whose bounding box is
/// wider **or** taller than `min_dimension` pixels.
///
/// Scanning stops at the first match. Which component is reported when
/// several qualify is therefore an artifact of label order, but the
/// verdict (some component qualifies or none does) is not.
#[must_use]
pub fn find_defect(mask: &GrayImage, min_dimension: u32) -> Option<ComponentStats> {
    let labeling = label::label_components(mask);
    let found = labeling.components().iter().copied().find(|c| {
        c.bounding_box.width > min_dimension || c.bounding_box.height > min_dimension
    });
    tracing::debug!(
        components = labeling.len(),
        min_dimension,
        defect = ?found,
        "classified mask"
    );
    found
}

/// Returns `true` if any component of `mask` exceeds `min_dimension`
/// in width or height.
#[must_use]
pub fn has_defect_component(mask: &GrayImage, min_dimension: u32) -> bool {
    find_defect(mask, min_dimension).is_some()
}
