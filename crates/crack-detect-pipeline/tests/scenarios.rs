//! Integration test: synthetic scans run end to end through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crack_detect_pipeline::{
    DetectConfig, DetectParams, GrayImage, PipelineError, RankingKind, binarize, holes, label,
    simplify, spots,
};
use image::Luma;

/// White canvas with black strokes of half-width 2.5.
fn strokes(width: u32, height: u32, segments: &[((f64, f64), (f64, f64))]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let (px, py) = (f64::from(x), f64::from(y));
        let dark = segments.iter().any(|&(a, b)| {
            let (dx, dy) = (b.0 - a.0, b.1 - a.1);
            let length_sq = dx.mul_add(dx, dy * dy);
            let t = ((px - a.0).mul_add(dx, (py - a.1) * dy) / length_sq).clamp(0.0, 1.0);
            (px - a.0 - t * dx).hypot(py - a.1 - t * dy) <= 2.5
        });
        Luma([if dark { 0 } else { 255 }])
    })
}

/// Deterministic speckle noise: isolated dark pixels on white.
fn speckle(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut state = seed;
    GrayImage::from_fn(width, height, |_, _| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        Luma([if (state >> 33) % 97 == 0 { 0 } else { 255 }])
    })
}

fn overlay(base: &mut GrayImage, other: &GrayImage) {
    for (dst, src) in base.pixels_mut().zip(other.pixels()) {
        dst.0[0] = dst.0[0].min(src.0[0]);
    }
}

// --- end-to-end scenarios ---

#[test]
fn blank_scan_is_clean() {
    let img = GrayImage::from_pixel(200, 200, Luma([255]));
    let config = DetectConfig::default();
    assert!(!crack_detect_pipeline::has_defect(&img, &config).unwrap());
    assert!(
        crack_detect_pipeline::outline_polygons(&img, &config)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn diagonal_crack_is_found_once() {
    let img = strokes(200, 200, &[((30.0, 30.0), (136.0, 136.0))]);
    let config = DetectConfig::default();
    assert!(crack_detect_pipeline::has_defect(&img, &config).unwrap());

    let polygons = crack_detect_pipeline::outline_polygons(&img, &config).unwrap();
    assert_eq!(polygons.len(), 1);
    assert!(polygons[0].len() >= 3);
}

#[test]
fn crack_survives_speckle_noise() {
    let mut img = speckle(240, 240, 11);
    overlay(&mut img, &strokes(240, 240, &[((20.0, 200.0), (200.0, 150.0))]));
    let config = DetectConfig::default();

    let staged = crack_detect_pipeline::process_staged(&img, &config).unwrap();
    assert!(staged.has_defect());
    assert_eq!(label::label_components(&staged.cleaned).len(), 1);
    assert_eq!(staged.polygons.len(), 1);

    let defect = staged.defect.unwrap();
    assert!(defect.bounding_box.width > 150, "{defect:?}");
}

#[test]
fn speckle_alone_is_not_a_defect() {
    let img = speckle(240, 240, 5);
    let config = DetectConfig::default();
    assert!(!crack_detect_pipeline::has_defect(&img, &config).unwrap());
}

#[test]
fn darkness_threshold_controls_sensitivity() {
    // A gray (value 90) crack is invisible at the default darkness.
    let mut img = strokes(200, 200, &[((20.0, 100.0), (180.0, 100.0))]);
    for p in img.pixels_mut() {
        if p.0[0] == 0 {
            p.0[0] = 90;
        }
    }
    assert!(!crack_detect_pipeline::has_defect(&img, &DetectConfig::default()).unwrap());

    let params = DetectParams {
        darkness: 120,
        ..DetectParams::default()
    };
    let config = DetectConfig::new(params).unwrap();
    assert!(crack_detect_pipeline::has_defect(&img, &config).unwrap());
}

#[test]
fn elongation_ranking_prefers_crack_over_stain() {
    // A long thin crack and a large compact stain.
    let mut img = strokes(300, 300, &[((20.0, 40.0), (280.0, 40.0))]);
    for y in 120..260 {
        for x in 80..220 {
            img.put_pixel(x, y, Luma([0]));
        }
    }

    let by_area = crack_detect_pipeline::process_staged(&img, &DetectConfig::default()).unwrap();
    let kept = label::label_components(&by_area.cleaned);
    assert_eq!(kept.len(), 1);
    assert!(kept.components()[0].bounding_box.height > 100);

    let params = DetectParams {
        ranking: RankingKind::Elongation,
        ..DetectParams::default()
    };
    let config = DetectConfig::new(params).unwrap();
    let by_elongation = crack_detect_pipeline::process_staged(&img, &config).unwrap();
    let kept = label::label_components(&by_elongation.cleaned);
    assert_eq!(kept.len(), 1);
    assert!(kept.components()[0].bounding_box.height < 30);
}

// --- stage properties ---

#[test]
fn every_mask_stage_is_binary() {
    for seed in [1, 2, 3] {
        let mut img = speckle(120, 90, seed);
        overlay(&mut img, &strokes(120, 90, &[((5.0, 5.0), (110.0, 80.0))]));
        let staged = crack_detect_pipeline::process_staged(&img, &DetectConfig::default()).unwrap();
        for mask in [
            &staged.binary,
            &staged.dilated,
            &staged.filled,
            &staged.eroded,
            &staged.cleaned,
            &staged.smoothed,
        ] {
            assert!(binarize::is_binary(mask), "seed {seed}");
        }
    }
}

#[test]
fn hole_filling_is_idempotent_on_pipeline_masks() {
    let mut img = speckle(200, 200, 9);
    overlay(&mut img, &strokes(200, 200, &[((10.0, 100.0), (190.0, 120.0))]));
    let staged = crack_detect_pipeline::process_staged(&img, &DetectConfig::default()).unwrap();
    let again = holes::fill_holes(&staged.filled, DetectConfig::DEFAULT_MAX_HOLE_AREA);
    assert_eq!(again, staged.filled);
}

#[test]
fn suppression_bound_holds_for_every_keep_count() {
    let img = speckle(150, 150, 21);
    let mask = binarize::in_range(&img, 0, 40);
    assert!(label::label_components(&mask).len() > 5);
    for keep in 1..=5 {
        let cleaned = spots::suppress_spots(&mask, keep, &RankingKind::Area);
        assert!(label::label_components(&cleaned).len() <= keep, "keep {keep}");
    }
}

#[test]
fn outlines_stay_within_tolerance_of_traced_contours() {
    let img = strokes(
        220,
        220,
        &[((20.0, 30.0), (120.0, 90.0)), ((120.0, 90.0), (200.0, 40.0))],
    );
    for tolerance in [1.0, 3.0, 8.0] {
        let params = DetectParams {
            simplify_tolerance: tolerance,
            ..DetectParams::default()
        };
        let config = DetectConfig::new(params).unwrap();
        let staged = crack_detect_pipeline::process_staged(&img, &config).unwrap();
        assert_eq!(staged.polygons.len(), 1);
        let deviation = simplify::max_deviation(&staged.contours[0], &staged.polygons[0]);
        assert!(
            deviation <= tolerance,
            "tolerance {tolerance}: deviation {deviation}"
        );
    }
}

// --- configuration ---

#[test]
fn config_from_json_uses_defaults_for_missing_fields() {
    let config: DetectConfig =
        serde_json::from_str(r#"{"darkness": 60, "ranking": "elongation"}"#).unwrap();
    assert_eq!(config.darkness(), 60);
    assert_eq!(config.ranking(), RankingKind::Elongation);
    assert_eq!(config.keep_count(), DetectConfig::DEFAULT_KEEP_COUNT);
}

#[test]
fn zero_keep_count_is_rejected() {
    let params = DetectParams {
        keep_count: 0,
        ..DetectParams::default()
    };
    assert!(matches!(
        DetectConfig::new(params),
        Err(PipelineError::InvalidConfig(_))
    ));
}
