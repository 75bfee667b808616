//! Contour tracing: extract external boundaries from a binary mask.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! Only external boundaries are reported. Hole borders and the borders
//! of components nested inside holes are dropped, so every returned
//! polygon outlines one top-level foreground region.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};

use crate::types::{Point, Polygon};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    #[default]
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary mask (nonzero = foreground).
/// Output: one closed polygon per external boundary, in discovery order.
pub trait ContourTracer {
    /// Trace the external contours of `mask`.
    fn trace(&self, mask: &GrayImage) -> Vec<Polygon>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage) -> Vec<Polygon> {
        match *self {
            Self::BorderFollowing => trace_border_following(mask),
        }
    }
}

/// Border following, keeping top-level outer borders.
///
/// `find_contours` scans in raster order, so the result is ordered by
/// the position of each region's first pixel (top to bottom, then left
/// to right).
fn trace_border_following(mask: &GrayImage) -> Vec<Polygon> {
    let contours: Vec<Contour<i32>> = find_contours(mask);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            let points = c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect();
            Polygon::new(points)
        })
        .collect()
}
