//! Remove a static video watermark via FFT alignment and inverse alpha blending.
//!
//! A watermarked video is the forward alpha blend of a known RGBA overlay
//! over an unknown background, at a fixed position across all frames. This
//! crate locates that position once — by cross-correlating the temporal
//! average frame against the template in the frequency domain — and then
//! inverts the blending equation per pixel to recover every frame.
//!
//! # Quick Start
//!
//! ```no_run
//! use ndarray::Array4;
//! use video_watermark_removal::WatermarkRemover;
//!
//! let remover = WatermarkRemover::new().expect("failed to load watermark template");
//! // (T, H, W, 3) frames, u8 pixel levels or f32/f64 values in [0, 1].
//! let video = Array4::<u8>::zeros((16, 360, 640, 3));
//! let recovered = remover.remove(video.into(), None).expect("removal failed");
//! ```
//!
//! # Backends and layouts
//!
//! Videos arrive either as [`ndarray`] arrays (THWC by default) or as flat
//! [`PlanarVideo`] tensors (TCHW by default, the ML-interchange form). Pass
//! an explicit [`Layout`] to override the per-backend default:
//!
//! ```no_run
//! use video_watermark_removal::{Layout, PlanarData, PlanarVideo, WatermarkRemover};
//!
//! let remover = WatermarkRemover::new().expect("failed to load watermark template");
//! let tensor = PlanarVideo::from_shape_vec([16, 3, 360, 640],
//!     PlanarData::F32(vec![0.0; 16 * 3 * 360 * 640])).unwrap();
//! let recovered = remover.remove(tensor.into(), Some(Layout::Tchw)).unwrap();
//! ```
//!
//! The recovered video comes back in the caller's backend and layout, always
//! floating-point, values clipped to `[0, 1]`.
//!
//! # The template
//!
//! The overlay pattern is a single RGBA floating-point image, loaded once
//! per process (see [`get_template`]) or supplied explicitly. Alignment is
//! translation-only: rotated or scaled placements are out of scope.

#![deny(missing_docs)]

pub mod blending;
pub mod detection;
mod engine;
pub mod error;
mod fft;
pub mod template;
pub mod tensor;

pub use detection::{detect_shift, Shift};
pub use engine::{is_supported_image, ProcessSummary, WatermarkRemover};
pub use error::{Error, Result};
pub use template::{
    get_template, load_template, WatermarkTemplate, DEFAULT_TEMPLATE_PATH, TEMPLATE_PATH_ENV,
};
pub use tensor::{Layout, NdVideo, PlanarData, PlanarVideo, VideoTensor};
