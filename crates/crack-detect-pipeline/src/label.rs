//! Connected-component labeling with per-component statistics.
//!
//! Hole filling, spot suppression and defect classification all start
//! from the same question: which 8-connected foreground regions does a
//! mask contain, and how large is each one? [`label_components`]
//! answers it once per call; the resulting [`Labeling`] is never cached
//! between stages because every stage sees a different mask.
//!
//! Label ids are opaque. Label `0` is always background, every
//! component gets a distinct positive id, and components are reported
//! in ascending id order.

use std::borrow::Cow;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

use crate::binarize;
use crate::types::{BACKGROUND, BoundingBox, FOREGROUND};

/// Per-pixel component ids; `0` marks background.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Size statistics for one connected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStats {
    /// Component id (always positive).
    pub label: u32,
    /// Number of pixels in the component.
    pub area: u32,
    /// Tight box around the component's pixels.
    pub bounding_box: BoundingBox,
}

/// Running extent of one component during the statistics scan.
#[derive(Debug, Clone, Copy)]
struct Extent {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Extent {
    const fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    const fn finish(self, label: u32) -> ComponentStats {
        ComponentStats {
            label,
            area: self.area,
            bounding_box: BoundingBox {
                x: self.min_x,
                y: self.min_y,
                width: self.max_x - self.min_x + 1,
                height: self.max_y - self.min_y + 1,
            },
        }
    }
}

/// A labeled mask: the label image plus statistics for every component.
#[derive(Debug, Clone)]
pub struct Labeling {
    labels: LabelImage,
    components: Vec<ComponentStats>,
}

impl Labeling {
    /// The per-pixel label image.
    #[must_use]
    pub const fn labels(&self) -> &LabelImage {
        &self.labels
    }

    /// Statistics for every component, in ascending label order.
    #[must_use]
    pub fn components(&self) -> &[ComponentStats] {
        &self.components
    }

    /// Number of components (background excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the mask had no foreground.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Label of the pixel at `(x, y)`.
    #[must_use]
    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels.get_pixel(x, y).0[0]
    }

    /// Statistics for `label`, if such a component exists.
    #[must_use]
    pub fn get(&self, label: u32) -> Option<&ComponentStats> {
        self.components
            .binary_search_by_key(&label, |c| c.label)
            .ok()
            .map(|i| &self.components[i])
    }

    /// Write `value` into `target` at every pixel belonging to a
    /// component that `select` accepts. Returns how many components were
    /// painted.
    ///
    /// `target` must have the dimensions of the labeled mask.
    pub fn paint(
        &self,
        target: &mut GrayImage,
        value: u8,
        select: impl Fn(&ComponentStats) -> bool,
    ) -> usize {
        debug_assert_eq!(target.dimensions(), self.labels.dimensions());

        let max_label = self.components.last().map_or(0, |c| c.label as usize);
        let mut selected = vec![false; max_label + 1];
        let mut painted = 0;
        for c in &self.components {
            if select(c) {
                selected[c.label as usize] = true;
                painted += 1;
            }
        }
        if painted == 0 {
            return 0;
        }

        for (dst, label) in target.pixels_mut().zip(self.labels.pixels()) {
            let label = label.0[0] as usize;
            if label != 0 && selected.get(label).copied().unwrap_or(false) {
                dst.0[0] = value;
            }
        }
        painted
    }
}

/// Label the 8-connected foreground (nonzero) regions of `mask` and
/// measure each one.
#[must_use = "returns the labeling"]
pub fn label_components(mask: &GrayImage) -> Labeling {
    // `connected_components` only joins neighbours of equal value.
    let mask: Cow<'_, GrayImage> = if binarize::is_binary(mask) {
        Cow::Borrowed(mask)
    } else {
        Cow::Owned(GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
            Luma([if mask.get_pixel(x, y).0[0] == BACKGROUND { BACKGROUND } else { FOREGROUND }])
        }))
    };
    let labels: LabelImage = connected_components(mask.as_ref(), Connectivity::Eight, Luma([BACKGROUND]));

    let max_label = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0);
    let mut extents: Vec<Option<Extent>> = vec![None; max_label as usize + 1];
    for (x, y, p) in labels.enumerate_pixels() {
        let label = p.0[0];
        if label != 0 {
            extents[label as usize]
                .get_or_insert_with(|| Extent::new(x, y))
                .add(x, y);
        }
    }

    let components = (0_u32..)
        .zip(extents)
        .filter_map(|(label, extent)| extent.map(|e| e.finish(label)))
        .collect();

    Labeling { labels, components }
}
