//! Integration test: run a synthetic scan through the pipeline, export a
//! subset file and a preview, and read the subset file back.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crack_detect_pipeline::{DetectConfig, DetectParams, GrayImage, Polygon};
use image::Luma;

/// White 300x200 scan with two dark strokes.
fn scan() -> GrayImage {
    let segments: [((f64, f64), (f64, f64)); 2] = [((20.0, 30.0), (260.0, 60.0)), ((40.0, 160.0), (200.0, 120.0))];
    GrayImage::from_fn(300, 200, |x, y| {
        let (px, py) = (f64::from(x), f64::from(y));
        let dark = segments.iter().any(|&((ax, ay), (bx, by))| {
            let (dx, dy) = (bx - ax, by - ay);
            let t = ((px - ax).mul_add(dx, (py - ay) * dy) / dx.mul_add(dx, dy * dy)).clamp(0.0, 1.0);
            (px - ax - t * dx).hypot(py - ay - t * dy) <= 3.0
        });
        Luma([if dark { 10 } else { 230 }])
    })
}

#[test]
fn pipeline_outlines_survive_subset_round_trip() {
    let params = DetectParams {
        keep_count: 2,
        ..DetectParams::default()
    };
    let config = DetectConfig::new(params).unwrap();
    let staged = crack_detect_pipeline::process_staged(&scan(), &config).expect("pipeline");
    assert!(staged.has_defect());
    assert_eq!(staged.polygons.len(), 2);

    let roi = crack_detect_export::to_roi(&staged.polygons, staged.dimensions);
    eprintln!("{roi}");
    assert!(roi.starts_with("# Crack detect output\nbegin region_of_interest\n"));
    assert!(roi.contains("        300 200\n"));
    assert!(roi.ends_with("end region_of_interest\n"));

    let parsed = crack_detect_export::parse_roi(&roi).unwrap();
    assert_eq!(parsed.excluded, staged.polygons);
    let corners: Vec<(i32, i32)> = parsed.boundary.points().iter().map(|p| (p.x, p.y)).collect();
    assert_eq!(corners, vec![(0, 0), (0, 200), (300, 200), (300, 0)]);
}

#[test]
fn preview_marks_every_outline_vertex() {
    let source = scan();
    let polygons: Vec<Polygon> =
        crack_detect_pipeline::outline_polygons(&source, &DetectConfig::default()).unwrap();
    assert_eq!(polygons.len(), 1);

    let preview = crack_detect_export::render_outline(&source, &polygons);
    assert_eq!(preview.dimensions(), source.dimensions());
    for p in polygons[0].points() {
        let x = u32::try_from(p.x).unwrap();
        let y = u32::try_from(p.y).unwrap();
        assert_eq!(preview.get_pixel(x, y).0, [0, 255, 0], "vertex {p:?}");
    }
}
