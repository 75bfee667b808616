//! Shared types for the crack-detect pipeline.

use serde::{Deserialize, Serialize};

use crate::label::ComponentStats;
use crate::spots::RankingKind;

/// Re-export `GrayImage` so downstream crates can hand buffers to the
/// pipeline without depending on `image` directly.
pub use image::GrayImage;

/// Foreground value of a binary mask.
pub const FOREGROUND: u8 = 255;

/// Background value of a binary mask.
pub const BACKGROUND: u8 = 0;

/// A 2D point in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: i32,
    /// Vertical position (pixels from top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// An ordered ring of points. The last point implicitly connects back
/// to the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from its vertices.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Iterate over the closed edges `(p[i], p[i + 1])`, including the
    /// closing edge from the last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Inclusive `(min, max)` corners of the polygon's extent, or `None`
    /// for an empty polygon.
    #[must_use]
    pub fn extent(&self) -> Option<(Point, Point)> {
        let first = *self.0.first()?;
        Some(self.0.iter().fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }
}

/// Axis-aligned box covering a set of pixels.
///
/// `width` and `height` count pixels, so a single pixel has a 1x1 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Leftmost column.
    pub x: u32,
    /// Topmost row.
    pub y: u32,
    /// Number of columns spanned.
    pub width: u32,
    /// Number of rows spanned.
    pub height: u32,
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Unvalidated detection parameters.
///
/// This is the serde and CLI facing shape of [`DetectConfig`]. Every
/// field defaults to the corresponding `DetectConfig::DEFAULT_*`
/// constant; convert with [`DetectConfig::new`] to validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Upper bound (inclusive) of the intensity range treated as crack.
    pub darkness: u8,
    /// Number of 5x5 dilation passes used to merge crack fragments.
    pub fill_iterations: u32,
    /// Re-threshold cutoff applied to the smoothed mask before tracing.
    pub sharpness: u8,
    /// Maximum distance in pixels between an outline and its polygon.
    pub simplify_tolerance: f64,
    /// Number of largest components kept by spot suppression, and the
    /// maximum number of outlines returned.
    pub keep_count: usize,
    /// Rows removed from the bottom of the image before processing.
    pub crop_bottom_rows: u32,
    /// Enclosed background pockets strictly smaller than this are filled.
    pub max_hole_area: u32,
    /// A component whose bounding box is wider or taller than this is a defect.
    pub min_defect_dimension: u32,
    /// How spot suppression ranks components.
    pub ranking: RankingKind,
}

impl Default for DetectParams {
    fn default() -> Self {
        DetectConfig::default().into()
    }
}

/// Validated, immutable configuration for the detection pipeline.
///
/// Construct with [`DetectConfig::new`] (or `Default`); the pipeline
/// entry points take it by reference and never mutate it, so one value
/// can be shared across any number of independent images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetectParams", into = "DetectParams")]
pub struct DetectConfig {
    darkness: u8,
    fill_iterations: u32,
    sharpness: u8,
    simplify_tolerance: f64,
    keep_count: usize,
    crop_bottom_rows: u32,
    max_hole_area: u32,
    min_defect_dimension: u32,
    ranking: RankingKind,
}

impl DetectConfig {
    /// Default darkness cutoff.
    pub const DEFAULT_DARKNESS: u8 = 40;
    /// Default number of dilation passes.
    pub const DEFAULT_FILL_ITERATIONS: u32 = 2;
    /// Default re-threshold cutoff for outline extraction.
    pub const DEFAULT_SHARPNESS: u8 = 50;
    /// Default polygon simplification tolerance in pixels.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 3.0;
    /// Default number of components to keep.
    pub const DEFAULT_KEEP_COUNT: usize = 1;
    /// Default rows cropped for single images.
    pub const DEFAULT_CROP_BOTTOM_ROWS: u32 = 0;
    /// Default rows cropped in batch mode (removes the scanner's info bar).
    pub const BATCH_CROP_BOTTOM_ROWS: u32 = 60;
    /// Default hole-filling cutoff in pixels.
    pub const DEFAULT_MAX_HOLE_AREA: u32 = 20_000;
    /// Default classifier size cutoff in pixels.
    pub const DEFAULT_MIN_DEFECT_DIMENSION: u32 = 100;

    /// Validate `params` and build a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `keep_count` is zero
    /// or `simplify_tolerance` is negative or not finite.
    pub fn new(params: DetectParams) -> Result<Self, PipelineError> {
        if params.keep_count < 1 {
            return Err(PipelineError::InvalidConfig(
                "keep_count must be at least 1".to_string(),
            ));
        }
        if !params.simplify_tolerance.is_finite() || params.simplify_tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_tolerance must be a finite, non-negative number of pixels, got {}",
                params.simplify_tolerance,
            )));
        }

        Ok(Self {
            darkness: params.darkness,
            fill_iterations: params.fill_iterations,
            sharpness: params.sharpness,
            simplify_tolerance: params.simplify_tolerance,
            keep_count: params.keep_count,
            crop_bottom_rows: params.crop_bottom_rows,
            max_hole_area: params.max_hole_area,
            min_defect_dimension: params.min_defect_dimension,
            ranking: params.ranking,
        })
    }

    /// Upper bound (inclusive) of the intensity range treated as crack.
    #[must_use]
    pub const fn darkness(&self) -> u8 {
        self.darkness
    }

    /// Number of 5x5 dilation passes.
    #[must_use]
    pub const fn fill_iterations(&self) -> u32 {
        self.fill_iterations
    }

    /// Re-threshold cutoff for outline extraction.
    #[must_use]
    pub const fn sharpness(&self) -> u8 {
        self.sharpness
    }

    /// Polygon simplification tolerance in pixels.
    #[must_use]
    pub const fn simplify_tolerance(&self) -> f64 {
        self.simplify_tolerance
    }

    /// Number of components kept by spot suppression (always at least 1).
    #[must_use]
    pub const fn keep_count(&self) -> usize {
        self.keep_count
    }

    /// Rows removed from the bottom of the image before processing.
    #[must_use]
    pub const fn crop_bottom_rows(&self) -> u32 {
        self.crop_bottom_rows
    }

    /// Hole-filling cutoff in pixels.
    #[must_use]
    pub const fn max_hole_area(&self) -> u32 {
        self.max_hole_area
    }

    /// Classifier size cutoff in pixels.
    #[must_use]
    pub const fn min_defect_dimension(&self) -> u32 {
        self.min_defect_dimension
    }

    /// Component ranking strategy used by spot suppression.
    #[must_use]
    pub const fn ranking(&self) -> RankingKind {
        self.ranking
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            darkness: Self::DEFAULT_DARKNESS,
            fill_iterations: Self::DEFAULT_FILL_ITERATIONS,
            sharpness: Self::DEFAULT_SHARPNESS,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            keep_count: Self::DEFAULT_KEEP_COUNT,
            crop_bottom_rows: Self::DEFAULT_CROP_BOTTOM_ROWS,
            max_hole_area: Self::DEFAULT_MAX_HOLE_AREA,
            min_defect_dimension: Self::DEFAULT_MIN_DEFECT_DIMENSION,
            ranking: RankingKind::default(),
        }
    }
}

impl TryFrom<DetectParams> for DetectConfig {
    type Error = PipelineError;

    fn try_from(params: DetectParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

impl From<DetectConfig> for DetectParams {
    fn from(config: DetectConfig) -> Self {
        Self {
            darkness: config.darkness,
            fill_iterations: config.fill_iterations,
            sharpness: config.sharpness,
            simplify_tolerance: config.simplify_tolerance,
            keep_count: config.keep_count,
            crop_bottom_rows: config.crop_bottom_rows,
            max_hole_area: config.max_hole_area,
            min_defect_dimension: config.min_defect_dimension,
            ranking: config.ranking,
        }
    }
}

/// Result of running the pipeline with every intermediate buffer kept.
///
/// Masks are binary (`0`/`255`) except `source`, which is the
/// (possibly cropped) grayscale input.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Input after the optional bottom crop.
    pub source: GrayImage,
    /// Blurred and thresholded dark mask.
    pub binary: GrayImage,
    /// Mask after 5x5 dilation.
    pub dilated: GrayImage,
    /// Mask after hole filling.
    pub filled: GrayImage,
    /// Mask after 3x3 erosion.
    pub eroded: GrayImage,
    /// Mask after spot suppression.
    pub cleaned: GrayImage,
    /// Cleaned mask re-blurred and re-thresholded for tracing.
    pub smoothed: GrayImage,
    /// External boundaries of `smoothed`, in discovery order.
    pub contours: Vec<Polygon>,
    /// Simplified outlines of the first `keep_count` contours.
    pub polygons: Vec<Polygon>,
    /// First component of `cleaned` large enough to be a defect.
    pub defect: Option<ComponentStats>,
    /// Dimensions of `source`.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// Whether the cleaned mask contains a defect-sized component.
    #[must_use]
    pub const fn has_defect(&self) -> bool {
        self.defect.is_some()
    }
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The input buffer is empty or otherwise unusable.
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
