//! 2D Fourier transforms for frequency-domain correlation.
//!
//! Built on `rustfft` with separable row and column passes over a flat
//! buffer. [`Spectral`] owns the planner so repeated transforms of the same
//! dimensions reuse their plans.

use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::tensor::roll2;

/// FFT engine holding cached plans.
pub(crate) struct Spectral {
    planner: FftPlanner<f32>,
}

impl Spectral {
    pub(crate) fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Forward 2D FFT of a real field.
    pub(crate) fn fft2d(&mut self, field: &Array2<f32>) -> Array2<Complex<f32>> {
        let (h, w) = field.dim();
        let mut buf: Vec<Complex<f32>> = field.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.pass2d(&mut buf, h, w, false);
        // Length h*w by construction.
        Array2::from_shape_vec((h, w), buf).expect("fft buffer matches field shape")
    }

    /// Inverse 2D FFT, normalized by `1 / (h * w)` so that it inverts
    /// [`Spectral::fft2d`] exactly.
    pub(crate) fn ifft2d(&mut self, spectrum: &Array2<Complex<f32>>) -> Array2<Complex<f32>> {
        let (h, w) = spectrum.dim();
        let mut buf: Vec<Complex<f32>> = spectrum.iter().copied().collect();
        self.pass2d(&mut buf, h, w, true);
        let scale = 1.0 / (h * w) as f32;
        for v in &mut buf {
            *v *= scale;
        }
        Array2::from_shape_vec((h, w), buf).expect("fft buffer matches spectrum shape")
    }

    /// One separable 2D pass: transform every row, then every column
    /// through a scratch buffer.
    fn pass2d(&mut self, buf: &mut [Complex<f32>], h: usize, w: usize, inverse: bool) {
        let row_fft = if inverse {
            self.planner.plan_fft_inverse(w)
        } else {
            self.planner.plan_fft_forward(w)
        };
        for r in 0..h {
            row_fft.process(&mut buf[r * w..(r + 1) * w]);
        }

        let col_fft = if inverse {
            self.planner.plan_fft_inverse(h)
        } else {
            self.planner.plan_fft_forward(h)
        };
        let mut column = vec![Complex::new(0.0, 0.0); h];
        for c in 0..w {
            for r in 0..h {
                column[r] = buf[r * w + c];
            }
            col_fft.process(&mut column);
            for r in 0..h {
                buf[r * w + c] = column[r];
            }
        }
    }
}

/// Relocate the zero-lag component of a correlation surface to the center,
/// rolling by `(h / 2, w / 2)`.
pub(crate) fn fftshift(surface: &Array2<f32>) -> Array2<f32> {
    let (h, w) = surface.dim();
    roll2(surface, (h / 2) as isize, (w / 2) as isize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn impulse_has_flat_spectrum() {
        let mut field = Array2::<f32>::zeros((4, 6));
        field[[0, 0]] = 1.0;
        let spectrum = Spectral::new().fft2d(&field);
        for v in spectrum.iter() {
            assert!((v.re - 1.0).abs() < 1e-5 && v.im.abs() < 1e-5);
        }
    }

    #[test]
    fn inverse_undoes_forward() {
        let field = Array2::from_shape_fn((5, 7), |(i, j)| (i * 7 + j) as f32 * 0.013 - 0.2);
        let mut spectral = Spectral::new();
        let spectrum = spectral.fft2d(&field);
        let back = spectral.ifft2d(&spectrum);
        for (orig, rec) in field.iter().zip(back.iter()) {
            assert!((orig - rec.re).abs() < 1e-4, "{orig} vs {}", rec.re);
            assert!(rec.im.abs() < 1e-4);
        }
    }

    #[test]
    fn fftshift_centers_origin() {
        let mut surface = Array2::<f32>::zeros((4, 6));
        surface[[0, 0]] = 1.0;
        let shifted = fftshift(&surface);
        assert_eq!(shifted[[2, 3]], 1.0);
        assert_eq!(shifted[[0, 0]], 0.0);
    }
}
