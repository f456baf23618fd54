//! Inverse alpha compositing.
//!
//! A watermarked frame is the forward blend
//! `composite = alpha * rgb + (1 - alpha) * background`, so wherever
//! `alpha < 1` the background is recoverable in closed form:
//! `background = (composite - alpha * rgb) / (1 - alpha)`.

use ndarray::{s, Array3, Array4};

/// Alpha ceiling applied before inversion.
///
/// The inversion is singular at `alpha = 1`; clamping keeps the denominator
/// bounded away from zero, and the output clip absorbs the amplified
/// residue in fully-opaque pixels.
const MAX_ALPHA: f32 = 0.99;

/// Recover the background of every frame at once.
///
/// `frames` is THWC in `[0, 1]`; `watermark` is the aligned H x W x 4 RGBA
/// template. The same watermark is inverted out of all T frames, per pixel
/// and per channel, and the result is clipped back to `[0, 1]`. The input
/// is not mutated.
#[must_use]
pub fn recover_background(frames: &Array4<f32>, watermark: &Array3<f32>) -> Array4<f32> {
    let rgb = watermark.slice(s![.., .., ..3]);
    let alpha = watermark.slice(s![.., .., 3..4]).mapv(|a| a.min(MAX_ALPHA));

    let weighted = &rgb * &alpha;
    let denominator = alpha.mapv(|a| 1.0 - a);

    let numerator = frames - &weighted;
    let background = &numerator / &denominator;
    background.mapv_into(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Array4};

    fn transparent_watermark(h: usize, w: usize) -> Array3<f32> {
        Array3::<f32>::zeros((h, w, 4))
    }

    #[test]
    fn fully_transparent_watermark_is_identity() {
        let frames = Array4::from_shape_fn((2, 4, 4, 3), |(t, i, j, c)| {
            (t + i + j + c) as f32 / 12.0
        });
        let recovered = recover_background(&frames, &transparent_watermark(4, 4));
        assert_eq!(recovered, frames);
    }

    #[test]
    fn inverts_a_known_forward_blend() {
        let background = Array4::from_shape_fn((3, 8, 8, 3), |(t, i, j, c)| {
            ((t * 31 + i * 7 + j * 3 + c) % 11) as f32 / 11.0
        });

        let mut watermark = Array3::<f32>::zeros((8, 8, 4));
        for i in 2..6 {
            for j in 3..7 {
                watermark[[i, j, 0]] = 1.0;
                watermark[[i, j, 1]] = 0.8;
                watermark[[i, j, 2]] = 0.2;
                watermark[[i, j, 3]] = 0.35;
            }
        }

        let mut composite = background.clone();
        for t in 0..3 {
            for i in 0..8 {
                for j in 0..8 {
                    let alpha = watermark[[i, j, 3]];
                    for c in 0..3 {
                        composite[[t, i, j, c]] = alpha * watermark[[i, j, c]]
                            + (1.0 - alpha) * background[[t, i, j, c]];
                    }
                }
            }
        }

        let recovered = recover_background(&composite, &watermark);
        for (orig, rec) in background.iter().zip(recovered.iter()) {
            assert!((orig - rec).abs() < 1e-5, "expected {orig}, got {rec}");
        }
    }

    #[test]
    fn saturated_alpha_stays_finite() {
        let frames = Array4::from_elem((1, 2, 2, 3), 0.7);
        let mut watermark = Array3::<f32>::zeros((2, 2, 4));
        watermark[[0, 0, 0]] = 1.0;
        watermark[[0, 0, 3]] = 1.0;

        let recovered = recover_background(&frames, &watermark);
        for &v in recovered.iter() {
            assert!(v.is_finite());
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn same_watermark_applies_to_every_frame() {
        let mut frames = Array4::from_elem((2, 2, 2, 3), 0.5);
        frames.slice_mut(s![1, .., .., ..]).fill(0.9);

        let mut watermark = transparent_watermark(2, 2);
        watermark[[1, 1, 0]] = 1.0;
        watermark[[1, 1, 3]] = 0.5;

        let recovered = recover_background(&frames, &watermark);
        // Unwatermarked pixel is untouched in both frames.
        assert!((recovered[[0, 0, 0, 0]] - 0.5).abs() < 1e-6);
        assert!((recovered[[1, 0, 0, 0]] - 0.9).abs() < 1e-6);
        // Watermarked pixel is inverted per frame.
        assert!((recovered[[0, 1, 1, 0]] - 0.0).abs() < 1e-6);
        assert!((recovered[[1, 1, 1, 0]] - 0.8).abs() < 1e-5);
    }
}
