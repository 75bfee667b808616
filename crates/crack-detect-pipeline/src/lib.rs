//! crack-detect-pipeline: Crack detection on grayscale scans (sans-IO).
//!
//! Isolates dark, elongated regions of a grayscale image and turns them
//! into simplified outline polygons through:
//! crop -> blur + threshold -> dilate -> fill holes -> erode ->
//! suppress spots -> {classify | re-blur -> threshold -> trace -> simplify}.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! [`GrayImage`] buffers and returns structured data. Decoding files,
//! rendering previews and writing reports live in `crack-detect-export`
//! and the `crack-detect` binary.

pub mod binarize;
pub mod blur;
pub mod classify;
pub mod contour;
pub mod crop;
pub mod holes;
pub mod label;
pub mod morphology;
pub mod simplify;
pub mod spots;
pub mod types;

pub use contour::{ContourTracer, ContourTracerKind};
pub use label::{ComponentStats, Labeling};
pub use spots::{ComponentRanker, RankingKind};
pub use types::{
    BoundingBox, Dimensions, DetectConfig, DetectParams, GrayImage, PipelineError, Point, Polygon,
    StagedResult,
};

use morphology::{FILL_ELEMENT, SEPARATE_ELEMENT};

/// Masks produced up to and including spot suppression.
struct CleanStages {
    source: GrayImage,
    dimensions: Dimensions,
    binary: GrayImage,
    dilated: GrayImage,
    filled: GrayImage,
    eroded: GrayImage,
    cleaned: GrayImage,
}

/// Outline products derived from a cleaned mask.
struct OutlineStages {
    smoothed: GrayImage,
    contours: Vec<Polygon>,
    polygons: Vec<Polygon>,
}

/// Whether `image` contains a crack-like defect.
///
/// A defect is a component of the cleaned mask whose bounding box is
/// wider or taller than [`DetectConfig::min_defect_dimension`].
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image is empty or the
/// configured crop would remove every row.
pub fn has_defect(image: &GrayImage, config: &DetectConfig) -> Result<bool, PipelineError> {
    let stages = clean(image, config)?;
    Ok(classify::has_defect_component(
        &stages.cleaned,
        config.min_defect_dimension(),
    ))
}

/// Simplified outlines of the crack regions in `image`.
///
/// At most [`DetectConfig::keep_count`] polygons are returned, in
/// contour discovery order (not sorted by size). An image with no
/// dark regions yields an empty list.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image is empty or the
/// configured crop would remove every row.
pub fn outline_polygons(
    image: &GrayImage,
    config: &DetectConfig,
) -> Result<Vec<Polygon>, PipelineError> {
    let stages = clean(image, config)?;
    Ok(outline(&stages.cleaned, config).polygons)
}

/// Run every stage once and keep all intermediate buffers.
///
/// # Pipeline steps
///
/// 1. Optional bottom crop
/// 2. 5x5 Gaussian blur and `[0, darkness]` threshold
/// 3. 5x5 dilation, `fill_iterations` times
/// 4. Hole filling below `max_hole_area`
/// 5. One 3x3 erosion
/// 6. Spot suppression down to `keep_count` components
/// 7. Defect classification of the cleaned mask
/// 8. 13x13 Gaussian blur and `[sharpness, 255]` threshold
/// 9. External contour tracing
/// 10. Simplification of the first `keep_count` contours
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the image is empty or the
/// configured crop would remove every row.
pub fn process_staged(
    image: &GrayImage,
    config: &DetectConfig,
) -> Result<StagedResult, PipelineError> {
    let stages = clean(image, config)?;
    let defect = classify::find_defect(&stages.cleaned, config.min_defect_dimension());
    let outlines = outline(&stages.cleaned, config);

    Ok(StagedResult {
        source: stages.source,
        binary: stages.binary,
        dilated: stages.dilated,
        filled: stages.filled,
        eroded: stages.eroded,
        cleaned: stages.cleaned,
        smoothed: outlines.smoothed,
        contours: outlines.contours,
        polygons: outlines.polygons,
        defect,
        dimensions: stages.dimensions,
    })
}

fn clean(image: &GrayImage, config: &DetectConfig) -> Result<CleanStages, PipelineError> {
    let source = crop::crop_bottom(image, config.crop_bottom_rows())?;
    let dimensions = crop::ensure_non_empty(&source)?;
    tracing::debug!(
        width = dimensions.width,
        height = dimensions.height,
        cropped = config.crop_bottom_rows(),
        "prepared source"
    );

    let binary = binarize::binarize(&source, config.darkness());
    tracing::debug!(
        foreground = binarize::foreground_count(&binary),
        darkness = config.darkness(),
        "binarized"
    );

    let dilated = morphology::dilate(&binary, FILL_ELEMENT, config.fill_iterations());
    let filled = holes::fill_holes(&dilated, config.max_hole_area());
    let eroded = morphology::erode(&filled, SEPARATE_ELEMENT, 1);
    let cleaned = spots::suppress_spots(&eroded, config.keep_count(), &config.ranking());
    tracing::debug!(
        foreground = binarize::foreground_count(&cleaned),
        "cleaned mask"
    );

    Ok(CleanStages {
        source,
        dimensions,
        binary,
        dilated,
        filled,
        eroded,
        cleaned,
    })
}

fn outline(cleaned: &GrayImage, config: &DetectConfig) -> OutlineStages {
    let blurred = blur::gaussian_blur(cleaned, blur::OUTLINE_KERNEL_SIZE);
    let smoothed = binarize::in_range(&blurred, config.sharpness(), u8::MAX);

    let contours = ContourTracerKind::default().trace(&smoothed);
    let keep = contours.len().min(config.keep_count());
    let polygons = simplify::simplify_polygons(&contours[..keep], config.simplify_tolerance());
    tracing::debug!(
        contours = contours.len(),
        polygons = polygons.len(),
        vertices = polygons.iter().map(Polygon::len).sum::<usize>(),
        "traced outlines"
    );

    OutlineStages {
        smoothed,
        contours,
        polygons,
    }
}
