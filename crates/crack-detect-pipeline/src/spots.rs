//! Suppressing small noise components.
//!
//! After erosion, residual noise shows up as many small disconnected
//! blobs. Spot suppression ranks every component with a pluggable
//! [`ComponentRanker`] and clears all but the `keep_count` best.
//!
//! # Strategy pattern
//!
//! The default ranking is plain area: the crack is assumed to be the
//! largest dark region. That assumption fails on scans with large
//! stains, so the ranking is a strategy. [`RankingKind`] selects a
//! built-in one from configuration, and any `Fn(&ComponentStats) -> f64`
//! closure works as a ranker too.

use std::collections::HashSet;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::label::{self, ComponentStats};
use crate::types::BACKGROUND;

/// Scores a component; higher scores are kept first.
pub trait ComponentRanker {
    /// Score `component`. Must be deterministic for a given component.
    fn score(&self, component: &ComponentStats) -> f64;
}

impl<F> ComponentRanker for F
where
    F: Fn(&ComponentStats) -> f64,
{
    fn score(&self, component: &ComponentStats) -> f64 {
        self(component)
    }
}

/// Built-in ranking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingKind {
    /// Pixel count.
    #[default]
    Area,

    /// Longer bounding-box side over the shorter one. Favors thin,
    /// crack-like components over compact blobs of similar size.
    Elongation,
}

impl ComponentRanker for RankingKind {
    fn score(&self, component: &ComponentStats) -> f64 {
        match *self {
            Self::Area => f64::from(component.area),
            Self::Elongation => {
                let b = component.bounding_box;
                let long = b.width.max(b.height);
                let short = b.width.min(b.height).max(1);
                f64::from(long) / f64::from(short)
            }
        }
    }
}

/// Clear every component of `mask` except the `keep_count` highest
/// ranked ones.
///
/// Ties are broken by area, then by label, so the result is
/// deterministic. When the mask has `keep_count` or fewer components it
/// is returned unchanged.
#[must_use = "returns the cleaned mask"]
pub fn suppress_spots<R>(mask: &GrayImage, keep_count: usize, ranker: &R) -> GrayImage
where
    R: ComponentRanker + ?Sized,
{
    let labeling = label::label_components(mask);
    let total = labeling.len();
    if total <= keep_count {
        tracing::debug!(components = total, keep_count, "no spots to suppress");
        return mask.clone();
    }

    let mut ranked: Vec<(f64, &ComponentStats)> = labeling
        .components()
        .iter()
        .map(|c| (ranker.score(c), c))
        .collect();
    ranked.sort_by(|(sa, a), (sb, b)| {
        sa.total_cmp(sb)
            .then(a.area.cmp(&b.area))
            .then(a.label.cmp(&b.label))
    });

    let doomed: HashSet<u32> = ranked[..total - keep_count]
        .iter()
        .map(|(_, c)| c.label)
        .collect();

    let mut cleaned = mask.clone();
    let removed = labeling.paint(&mut cleaned, BACKGROUND, |c| doomed.contains(&c.label));
    tracing::debug!(components = total, removed, keep_count, "suppressed spots");
    cleaned
}
