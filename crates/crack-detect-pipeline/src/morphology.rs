//! Binary dilation and erosion with square structuring elements.
//!
//! A square all-ones element is separable, so each iteration runs as a
//! row pass followed by a column pass over running foreground counts.
//! This is exactly equivalent to sliding the full 2-D square, at a
//! cost independent of the element size.
//!
//! Pixels outside the image are background for both operations. Erosion
//! therefore eats `size / 2` pixels into any foreground touching the
//! image edge; that shrinkage is accepted, not corrected.

use image::GrayImage;

use crate::types::{BACKGROUND, FOREGROUND};

/// Square all-ones structuring element.
///
/// The anchor sits at `size / 2`, so even sizes reach one pixel further
/// before the anchor than after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
}

impl StructuringElement {
    /// A `size` x `size` square. Sizes below 1 are treated as 1.
    #[must_use]
    pub const fn square(size: u32) -> Self {
        Self {
            size: if size == 0 { 1 } else { size },
        }
    }

    /// Side length in pixels.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Pixels covered before (left of / above) the anchor.
    const fn before(self) -> usize {
        (self.size / 2) as usize
    }

    /// Pixels covered after (right of / below) the anchor.
    const fn after(self) -> usize {
        (self.size - 1 - self.size / 2) as usize
    }
}

/// Element used to merge nearby crack fragments.
pub const FILL_ELEMENT: StructuringElement = StructuringElement::square(5);

/// Element used to strip residual noise after hole filling.
pub const SEPARATE_ELEMENT: StructuringElement = StructuringElement::square(3);

#[derive(Debug, Clone, Copy)]
enum Op {
    Dilate,
    Erode,
}

/// Grow foreground by `element`, `iterations` times.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &GrayImage, element: StructuringElement, iterations: u32) -> GrayImage {
    apply(mask, element, iterations, Op::Dilate)
}

/// Shrink foreground by `element`, `iterations` times.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &GrayImage, element: StructuringElement, iterations: u32) -> GrayImage {
    apply(mask, element, iterations, Op::Erode)
}

fn apply(mask: &GrayImage, element: StructuringElement, iterations: u32, op: Op) -> GrayImage {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut cells: Vec<bool> = mask.as_raw().iter().map(|&v| v != BACKGROUND).collect();

    if w > 0 && h > 0 {
        let mut line_in = vec![false; w.max(h)];
        let mut line_out = vec![false; w.max(h)];
        for _ in 0..iterations {
            for row in cells.chunks_exact_mut(w) {
                filter_line(row, element, op, &mut line_out[..w]);
                row.copy_from_slice(&line_out[..w]);
            }
            for x in 0..w {
                for (y, cell) in line_in[..h].iter_mut().enumerate() {
                    *cell = cells[y * w + x];
                }
                filter_line(&line_in[..h], element, op, &mut line_out[..h]);
                for (y, &cell) in line_out[..h].iter().enumerate() {
                    cells[y * w + x] = cell;
                }
            }
        }
    }

    let raw = cells
        .into_iter()
        .map(|set| if set { FOREGROUND } else { BACKGROUND })
        .collect();
    GrayImage::from_raw(width, height, raw).unwrap_or_else(|| GrayImage::new(width, height))
}

/// One-dimensional min/max filter over a line of binary cells.
fn filter_line(line: &[bool], element: StructuringElement, op: Op, out: &mut [bool]) {
    let n = line.len();
    let (before, after) = (element.before(), element.after());
    let window = before + after + 1;

    let mut prefix = Vec::with_capacity(n + 1);
    let mut running = 0_usize;
    prefix.push(running);
    for &set in line {
        running += usize::from(set);
        prefix.push(running);
    }

    for (i, o) in out.iter_mut().enumerate() {
        let lo = i.saturating_sub(before);
        let hi = (i + after).min(n - 1);
        let count = prefix[hi + 1] - prefix[lo];
        *o = match op {
            Op::Dilate => count > 0,
            // A window clipped by the image edge can never be full.
            Op::Erode => count == window,
        };
    }
}
