//! Fixed-kernel Gaussian smoothing.
//!
//! The pipeline smooths twice, each time with a fixed square kernel
//! rather than a sigma: a 5x5 pass suppresses sensor noise before the
//! darkness threshold, and a 13x13 pass rounds off the cleaned mask so
//! its outline traces smoothly.
//!
//! Sigma is derived from the kernel size with the usual
//! `0.3 * ((k - 1) / 2 - 1) + 0.8` rule, and sizes up to 7 use the
//! fixed binomial taps, so results line up with scans tuned in common
//! vision tooling. The blur is separable (rows, then columns) and
//! reflects at the border without repeating the edge pixel.
//! `imageproc::filter` is not used here: its separable filters clamp at
//! the border and its Gaussian takes a sigma, not fixed taps.

use image::GrayImage;

/// Kernel size of the noise-reduction blur applied before thresholding.
pub const NOISE_KERNEL_SIZE: u32 = 5;

/// Kernel size of the smoothing blur applied before outline tracing.
pub const OUTLINE_KERNEL_SIZE: u32 = 13;

/// Sigma implied by an odd kernel size.
#[must_use]
pub fn sigma_for_kernel_size(size: u32) -> f64 {
    0.3_f64.mul_add((f64::from(size) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Normalized 1-D Gaussian taps for an odd kernel `size`.
#[must_use]
pub fn gaussian_kernel(size: u32) -> Vec<f64> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
        ],
        _ => {
            let sigma = sigma_for_kernel_size(size);
            let radius = f64::from(size / 2);
            let scale = -0.5 / (sigma * sigma);
            let taps: Vec<f64> = (0..size)
                .map(|i| {
                    let d = f64::from(i) - radius;
                    (scale * d * d).exp()
                })
                .collect();
            let sum: f64 = taps.iter().sum();
            taps.into_iter().map(|t| t / sum).collect()
        }
    }
}

/// Blur a grayscale image with a `size` x `size` Gaussian kernel.
///
/// Even sizes are bumped to the next odd size. A size of 1 (or an empty
/// image) returns the image unchanged.
#[must_use = "returns the blurred image"]
#[allow(clippy::cast_possible_wrap)]
pub fn gaussian_blur(image: &GrayImage, size: u32) -> GrayImage {
    let size = size | 1;
    let (width, height) = image.dimensions();
    if size == 1 || width == 0 || height == 0 {
        return image.clone();
    }

    let kernel = gaussian_kernel(size);
    let radius = (size / 2) as isize;
    let (w, h) = (width as usize, height as usize);
    let src = image.as_raw();

    let mut horizontal = vec![0.0_f64; w * h];
    for (row_out, row_in) in horizontal.chunks_exact_mut(w).zip(src.chunks_exact(w)) {
        for (x, out) in row_out.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(k, &tap)| {
                    let i = reflect_101(x as isize + k as isize - radius, w);
                    tap * f64::from(row_in[i])
                })
                .sum();
        }
    }

    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        let acc: f64 = kernel
            .iter()
            .enumerate()
            .map(|(k, &tap)| {
                let j = reflect_101(y as isize + k as isize - radius, h);
                tap * horizontal[j * w + x]
            })
            .sum();
        pixel.0[0] = to_u8(acc);
    }
    out
}

/// Map an out-of-range index back into `0..len` by mirroring about the
/// edge pixels (`-1 -> 1`, `len -> len - 2`).
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let r = i.rem_euclid(period);
    if r < len as isize {
        r as usize
    } else {
        (period - r) as usize
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
