//! Watermark alignment via frequency-domain cross-correlation.
//!
//! The detector answers one question: by how many pixels must the template
//! be circularly shifted so that it sits on top of the watermark baked into
//! the video? It works on the temporal average frame, so it runs once per
//! video regardless of length:
//!
//! 1. High-pass the average frame (subtract a heavily blurred copy) so the
//!    slow-varying scene content drops out and watermark-scale structure
//!    dominates.
//! 2. Recenter the template around mid-gray so it becomes a zero-mean
//!    correlation pattern, insensitive to absolute brightness.
//! 3. Cross-correlate the two grayscale fields through the FFT and read the
//!    shift off the correlation peak.

use ndarray::{Array2, Array3};

use crate::fft::{fftshift, Spectral};
use crate::template::WatermarkTemplate;

/// Sigma of the Gaussian low-pass estimate subtracted from the average frame.
const HIGHPASS_SIGMA: f32 = 20.0;

/// Neutral level the template is recentered around.
const MID_GRAY: f32 = 0.5;

/// Rec. 601 luminance weights.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Integer translation that aligns the template with the composite frames.
///
/// Positive `dy` moves the template down, positive `dx` moves it right,
/// both with wraparound (the roll convention of [`ndarray`]-style circular
/// shifts). One shift applies to every frame of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    /// Horizontal offset in pixels.
    pub dx: isize,
    /// Vertical offset in pixels.
    pub dy: isize,
}

/// Locate the watermark in the temporal average frame.
///
/// `average_frame` and `template` must share the same height and width (the
/// orchestrator crops the template first). The shift is measured from the
/// geometric center of the template's dimensions: the correlation peak at
/// row `r`, column `c` yields `dy = r - h / 2`, `dx = c - w / 2`.
///
/// When several positions tie for the maximum correlation, the first in
/// row-major scan order wins. This is a deterministic convention, not a
/// claim that the optimum is unique.
#[must_use]
pub fn detect_shift(average_frame: &Array3<f32>, template: &WatermarkTemplate) -> Shift {
    debug_assert_eq!(
        (average_frame.dim().0, average_frame.dim().1),
        (template.height(), template.width()),
        "template must be cropped to the frame before detection",
    );

    let highpassed = highpass(average_frame, HIGHPASS_SIGMA);
    let frame_gray = luminance(&highpassed);
    let template_gray = correlation_field(template.rgba());

    let mut spectral = Spectral::new();
    let frame_fft = spectral.fft2d(&frame_gray);
    let template_fft = spectral.fft2d(&template_gray);
    let cross_spectrum = &frame_fft * &template_fft.mapv(|v| v.conj());
    let correlation = spectral.ifft2d(&cross_spectrum).mapv(|v| v.re);
    let surface = fftshift(&correlation);

    let (peak_row, peak_col) = argmax(&surface);
    let (h, w) = surface.dim();
    Shift {
        dx: peak_col as isize - (w / 2) as isize,
        dy: peak_row as isize - (h / 2) as isize,
    }
}

/// Subtract a Gaussian-blurred copy from the image, leaving high-frequency
/// structure.
fn highpass(image: &Array3<f32>, sigma: f32) -> Array3<f32> {
    image - &gaussian_blur(image, sigma)
}

/// Separable Gaussian blur, truncated at three sigma.
///
/// Taps falling outside the image are dropped and the remaining weights
/// renormalized, so constant regions blur to themselves right up to the
/// border even when the kernel is larger than the image.
fn gaussian_blur(image: &Array3<f32>, sigma: f32) -> Array3<f32> {
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (h, w, c) = image.dim();

    let mut horizontal = Array3::<f32>::zeros((h, w, c));
    for i in 0..h {
        for j in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                let mut weight = 0.0;
                for (k, &kv) in kernel.iter().enumerate() {
                    let jj = j as isize + k as isize - radius;
                    if jj >= 0 && (jj as usize) < w {
                        acc += kv * image[[i, jj as usize, ch]];
                        weight += kv;
                    }
                }
                horizontal[[i, j, ch]] = acc / weight;
            }
        }
    }

    let mut blurred = Array3::<f32>::zeros((h, w, c));
    for i in 0..h {
        for j in 0..w {
            for ch in 0..c {
                let mut acc = 0.0;
                let mut weight = 0.0;
                for (k, &kv) in kernel.iter().enumerate() {
                    let ii = i as isize + k as isize - radius;
                    if ii >= 0 && (ii as usize) < h {
                        acc += kv * horizontal[[ii as usize, j, ch]];
                        weight += kv;
                    }
                }
                blurred[[i, j, ch]] = acc / weight;
            }
        }
    }

    blurred
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil() as isize;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-0.5 * (i as f32 / sigma).powi(2)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Rec. 601 grayscale of an H x W x 3 image.
fn luminance(image: &Array3<f32>) -> Array2<f32> {
    let (h, w, _) = image.dim();
    Array2::from_shape_fn((h, w), |(i, j)| {
        LUMA_R * image[[i, j, 0]] + LUMA_G * image[[i, j, 1]] + LUMA_B * image[[i, j, 2]]
    })
}

/// Grayscale correlation pattern of the RGBA template.
///
/// Compositing the template over a mid-gray card and removing the card
/// leaves `alpha * (rgb - MID_GRAY)`: the alpha-weighted deviation the
/// watermark imprints on neutral content, zero wherever the template is
/// transparent.
fn correlation_field(rgba: &Array3<f32>) -> Array2<f32> {
    let (h, w, _) = rgba.dim();
    Array2::from_shape_fn((h, w), |(i, j)| {
        let alpha = rgba[[i, j, 3]];
        LUMA_R * alpha * (rgba[[i, j, 0]] - MID_GRAY)
            + LUMA_G * alpha * (rgba[[i, j, 1]] - MID_GRAY)
            + LUMA_B * alpha * (rgba[[i, j, 2]] - MID_GRAY)
    })
}

/// Position of the maximum value, first occurrence in row-major order.
fn argmax(surface: &Array2<f32>) -> (usize, usize) {
    let mut best = f32::NEG_INFINITY;
    let mut best_pos = (0, 0);
    for ((i, j), &v) in surface.indexed_iter() {
        if v > best {
            best = v;
            best_pos = (i, j);
        }
    }
    best_pos
}
