//! Outline preview rendering.
//!
//! Draws crack polygons onto an RGB copy of the scan so a reviewer can
//! check the detection at a glance. Encoding the result (JPEG, PNG) is
//! left to the caller.

use crack_detect_pipeline::Polygon;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

/// Outline color.
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Outline stroke width in pixels.
pub const OUTLINE_THICKNESS: i32 = 2;

/// Promote `source` to RGB and draw each polygon on it as a closed
/// outline.
#[must_use = "returns the rendered preview"]
pub fn render_outline(source: &GrayImage, polygons: &[Polygon]) -> RgbImage {
    let mut canvas = RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let v = source.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    });
    for polygon in polygons {
        draw_closed(&mut canvas, polygon, OUTLINE_COLOR, OUTLINE_THICKNESS);
    }
    canvas
}

/// Draw every edge of `polygon`, including the closing edge.
///
/// Thickness is built from parallel one-pixel segments offset down and
/// to the right; `draw_line_segment_mut` clips anything off-canvas.
#[allow(clippy::cast_precision_loss)] // pixel coordinates are far below 2^24
fn draw_closed(canvas: &mut RgbImage, polygon: &Polygon, color: Rgb<u8>, thickness: i32) {
    for (a, b) in polygon.edges() {
        for dy in 0..thickness {
            for dx in 0..thickness {
                draw_line_segment_mut(
                    canvas,
                    ((a.x + dx) as f32, (a.y + dy) as f32),
                    ((b.x + dx) as f32, (b.y + dy) as f32),
                    color,
                );
            }
        }
    }
}
