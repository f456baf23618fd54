//! Numeric-array backends, layouts, and canonicalization.
//!
//! Callers hand us a video in one of two backends: an [`ndarray`] `Array4`
//! (the natural fit for in-process array math) or a [`PlanarVideo`] flat
//! tensor (the shape + contiguous buffer form used for ML interchange).
//! Either backend may carry `u8` pixel levels or `f32`/`f64` values.
//!
//! The removal pipeline itself runs on a single canonical representation:
//! `Array4<f32>` in THWC order with values in `[0, 1]`. Each backend
//! implements one conversion into that form and one back out; every numeric
//! operation is written once against the canonical types.

use ndarray::{Array2, Array3, Array4, Axis};

use crate::error::{Error, Result};

/// Axis order of a 4-dimensional video tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Time, height, width, channel — the canonical order.
    Thwc,
    /// Time, channel, height, width — the common ML-tensor order.
    Tchw,
}

/// A video in the `ndarray` backend.
#[derive(Debug, Clone)]
pub enum NdVideo {
    /// 8-bit pixel levels in `[0, 255]`.
    U8(Array4<u8>),
    /// Single-precision values in `[0, 1]`.
    F32(Array4<f32>),
    /// Double-precision values in `[0, 1]`.
    F64(Array4<f64>),
}

/// Element buffer of a [`PlanarVideo`].
#[derive(Debug, Clone)]
pub enum PlanarData {
    /// 8-bit pixel levels in `[0, 255]`.
    U8(Vec<u8>),
    /// Single-precision values in `[0, 1]`.
    F32(Vec<f32>),
    /// Double-precision values in `[0, 1]`.
    F64(Vec<f64>),
}

impl PlanarData {
    fn len(&self) -> usize {
        match self {
            PlanarData::U8(v) => v.len(),
            PlanarData::F32(v) => v.len(),
            PlanarData::F64(v) => v.len(),
        }
    }
}

/// A video as a flat buffer with an explicit 4-axis shape.
///
/// This is the interchange form used when tensors cross an FFI or inference
/// boundary: row-major data plus a shape, conventionally in TCHW order.
#[derive(Debug, Clone)]
pub struct PlanarVideo {
    shape: [usize; 4],
    data: PlanarData,
}

impl PlanarVideo {
    /// Create a planar video from a shape and a matching flat buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] if the buffer length does not equal
    /// the product of the shape's axes.
    pub fn from_shape_vec(shape: [usize; 4], data: PlanarData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::InvalidShape {
                shape: shape.to_vec(),
                reason: "buffer length does not match shape",
            });
        }
        Ok(Self { shape, data })
    }

    /// The tensor shape, in the order the data is laid out.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Borrow the element buffer.
    #[must_use]
    pub fn data(&self) -> &PlanarData {
        &self.data
    }

    /// Consume the tensor into its shape and buffer.
    #[must_use]
    pub fn into_parts(self) -> ([usize; 4], PlanarData) {
        (self.shape, self.data)
    }
}

/// A video in either supported backend.
#[derive(Debug, Clone)]
pub enum VideoTensor {
    /// `ndarray` backend.
    Nd(NdVideo),
    /// Flat planar-tensor backend.
    Planar(PlanarVideo),
}

/// Which backend a canonical video came from, and which floating precision
/// to restore on the way out. Integer inputs are promoted to [`Precision::Single`]
/// since the recovered output is always floating-point.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceFormat {
    pub(crate) backend: BackendKind,
    pub(crate) precision: Precision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendKind {
    Nd,
    Planar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Precision {
    Single,
    Double,
}

impl From<Array4<u8>> for VideoTensor {
    fn from(frames: Array4<u8>) -> Self {
        VideoTensor::Nd(NdVideo::U8(frames))
    }
}

impl From<Array4<f32>> for VideoTensor {
    fn from(frames: Array4<f32>) -> Self {
        VideoTensor::Nd(NdVideo::F32(frames))
    }
}

impl From<Array4<f64>> for VideoTensor {
    fn from(frames: Array4<f64>) -> Self {
        VideoTensor::Nd(NdVideo::F64(frames))
    }
}

impl From<PlanarVideo> for VideoTensor {
    fn from(video: PlanarVideo) -> Self {
        VideoTensor::Planar(video)
    }
}

impl VideoTensor {
    /// The layout assumed for this backend when the caller does not pass one.
    ///
    /// `ndarray` videos default to THWC and planar tensors to TCHW. This
    /// mirrors how each form is conventionally produced; it is a convention,
    /// not a property of the data, and an explicit layout always wins.
    #[must_use]
    pub fn default_layout(&self) -> Layout {
        match self {
            VideoTensor::Nd(_) => Layout::Thwc,
            VideoTensor::Planar(_) => Layout::Tchw,
        }
    }

    /// The tensor shape, in the order the caller supplied it.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        match self {
            VideoTensor::Nd(NdVideo::U8(a)) => dim4(a.dim()),
            VideoTensor::Nd(NdVideo::F32(a)) => dim4(a.dim()),
            VideoTensor::Nd(NdVideo::F64(a)) => dim4(a.dim()),
            VideoTensor::Planar(p) => p.shape(),
        }
    }

    /// Extract the `ndarray` single-precision video, if that is what this is.
    #[must_use]
    pub fn into_nd_f32(self) -> Option<Array4<f32>> {
        match self {
            VideoTensor::Nd(NdVideo::F32(a)) => Some(a),
            _ => None,
        }
    }

    /// Extract the planar tensor, if that is what this is.
    #[must_use]
    pub fn into_planar(self) -> Option<PlanarVideo> {
        match self {
            VideoTensor::Planar(p) => Some(p),
            _ => None,
        }
    }

    /// Convert into the canonical `Array4<f32>` THWC representation.
    ///
    /// Normalizes `u8` pixel levels to `[0, 1]`, narrows `f64` to the f32
    /// compute precision, and transposes TCHW input to THWC. The returned
    /// [`SourceFormat`] records what to restore on output.
    pub(crate) fn into_canonical(self, layout: Layout) -> Result<(Array4<f32>, SourceFormat)> {
        let (frames, backend, precision) = match self {
            VideoTensor::Nd(NdVideo::U8(a)) => (
                a.mapv(|p| f32::from(p) / 255.0),
                BackendKind::Nd,
                Precision::Single,
            ),
            VideoTensor::Nd(NdVideo::F32(a)) => (a, BackendKind::Nd, Precision::Single),
            VideoTensor::Nd(NdVideo::F64(a)) => {
                (a.mapv(|v| v as f32), BackendKind::Nd, Precision::Double)
            }
            VideoTensor::Planar(p) => {
                let (shape, data) = p.into_parts();
                let dim = (shape[0], shape[1], shape[2], shape[3]);
                let (frames, precision) = match data {
                    PlanarData::U8(v) => (
                        planar_array(dim, v)?.mapv(|p| f32::from(p) / 255.0),
                        Precision::Single,
                    ),
                    PlanarData::F32(v) => (planar_array(dim, v)?, Precision::Single),
                    PlanarData::F64(v) => {
                        (planar_array(dim, v)?.mapv(|v| v as f32), Precision::Double)
                    }
                };
                (frames, BackendKind::Planar, precision)
            }
        };

        let channel_axis = match layout {
            Layout::Thwc => 3,
            Layout::Tchw => 1,
        };
        let shape = frames.shape().to_vec();
        if shape[channel_axis] != 3 {
            return Err(Error::InvalidShape {
                shape,
                reason: "channel axis must be 3 (RGB)",
            });
        }

        let frames = match layout {
            Layout::Thwc => frames,
            Layout::Tchw => to_standard(frames.permuted_axes([0, 2, 3, 1])),
        };
        Ok((frames, SourceFormat { backend, precision }))
    }

    /// Rebuild a caller-facing tensor from canonical THWC frames.
    ///
    /// The output is always floating-point: integer sources come back as
    /// f32, double-precision sources as f64, in the source layout and
    /// backend.
    pub(crate) fn from_canonical(
        frames: Array4<f32>,
        layout: Layout,
        source: SourceFormat,
    ) -> VideoTensor {
        let frames = match layout {
            Layout::Thwc => frames,
            Layout::Tchw => to_standard(frames.permuted_axes([0, 3, 1, 2])),
        };
        match source.backend {
            BackendKind::Nd => match source.precision {
                Precision::Single => VideoTensor::Nd(NdVideo::F32(frames)),
                Precision::Double => VideoTensor::Nd(NdVideo::F64(frames.mapv(f64::from))),
            },
            BackendKind::Planar => {
                let shape = dim4(frames.dim());
                let data = match source.precision {
                    Precision::Single => PlanarData::F32(frames.into_raw_vec()),
                    Precision::Double => {
                        PlanarData::F64(frames.mapv(f64::from).into_raw_vec())
                    }
                };
                VideoTensor::Planar(PlanarVideo { shape, data })
            }
        }
    }
}

fn dim4(dim: (usize, usize, usize, usize)) -> [usize; 4] {
    [dim.0, dim.1, dim.2, dim.3]
}

fn planar_array<A>(dim: (usize, usize, usize, usize), data: Vec<A>) -> Result<Array4<A>> {
    Array4::from_shape_vec(dim, data).map_err(|_| Error::InvalidShape {
        shape: vec![dim.0, dim.1, dim.2, dim.3],
        reason: "buffer length does not match shape",
    })
}

fn to_standard(frames: Array4<f32>) -> Array4<f32> {
    frames.as_standard_layout().to_owned()
}

/// Temporal mean of all frames.
pub(crate) fn mean_frame(video: &Array4<f32>) -> Result<Array3<f32>> {
    video.mean_axis(Axis(0)).ok_or(Error::EmptyVideo)
}

/// Circular roll of an H x W x C image along height and width.
///
/// Follows the NumPy convention: `out[i][j] = in[i - dy][j - dx]` with
/// wraparound, so positive shifts move content down and to the right.
pub(crate) fn roll3(image: &Array3<f32>, dy: isize, dx: isize) -> Array3<f32> {
    let (h, w, c) = image.dim();
    let mut out = Array3::zeros((h, w, c));
    for i in 0..h {
        let si = (i as isize - dy).rem_euclid(h as isize) as usize;
        for j in 0..w {
            let sj = (j as isize - dx).rem_euclid(w as isize) as usize;
            for k in 0..c {
                out[[i, j, k]] = image[[si, sj, k]];
            }
        }
    }
    out
}

/// Circular roll of a 2D field along both axes, NumPy convention.
pub(crate) fn roll2(field: &Array2<f32>, dy: isize, dx: isize) -> Array2<f32> {
    let (h, w) = field.dim();
    let mut out = Array2::zeros((h, w));
    for i in 0..h {
        let si = (i as isize - dy).rem_euclid(h as isize) as usize;
        for j in 0..w {
            let sj = (j as isize - dx).rem_euclid(w as isize) as usize;
            out[[i, j]] = field[[si, sj]];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn planar_rejects_mismatched_buffer_length() {
        let err = PlanarVideo::from_shape_vec([2, 3, 4, 4], PlanarData::F32(vec![0.0; 7]));
        assert!(matches!(err, Err(Error::InvalidShape { .. })));
    }

    #[test]
    fn canonical_rejects_non_rgb_channel_axis() {
        let video = VideoTensor::from(Array4::<f32>::zeros((2, 8, 8, 4)));
        let err = video.into_canonical(Layout::Thwc);
        assert!(matches!(err, Err(Error::InvalidShape { .. })));
    }

    #[test]
    fn u8_input_is_normalized_to_unit_range() {
        let video = VideoTensor::from(Array4::<u8>::from_elem((1, 2, 2, 3), 255));
        let (canon, _) = video.into_canonical(Layout::Thwc).unwrap();
        assert!(canon.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn tchw_round_trips_through_canonical() {
        // 1 frame, 3 channels, 2x2, distinct values per element.
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let planar =
            PlanarVideo::from_shape_vec([1, 3, 2, 2], PlanarData::F32(data.clone())).unwrap();
        let (canon, source) = VideoTensor::from(planar)
            .into_canonical(Layout::Tchw)
            .unwrap();
        assert_eq!(canon.dim(), (1, 2, 2, 3));
        // TCHW element (c, i, j) lands at THWC (i, j, c).
        assert_eq!(canon[[0, 0, 0, 0]], 0.0);
        assert_eq!(canon[[0, 0, 0, 1]], 4.0);
        assert_eq!(canon[[0, 1, 1, 2]], 11.0);

        let restored = VideoTensor::from_canonical(canon, Layout::Tchw, source);
        let planar = restored.into_planar().unwrap();
        assert_eq!(planar.shape(), [1, 3, 2, 2]);
        match planar.data() {
            PlanarData::F32(v) => assert_eq!(v, &data),
            other => panic!("expected f32 buffer, got {other:?}"),
        }
    }

    #[test]
    fn double_precision_is_restored_on_output() {
        let video = VideoTensor::from(Array4::<f64>::from_elem((1, 2, 2, 3), 0.5));
        let (canon, source) = video.into_canonical(Layout::Thwc).unwrap();
        let restored = VideoTensor::from_canonical(canon, Layout::Thwc, source);
        assert!(matches!(restored, VideoTensor::Nd(NdVideo::F64(_))));
    }

    #[test]
    fn default_layout_follows_backend_convention() {
        let nd = VideoTensor::from(Array4::<f32>::zeros((1, 2, 2, 3)));
        assert_eq!(nd.default_layout(), Layout::Thwc);

        let planar =
            PlanarVideo::from_shape_vec([1, 3, 2, 2], PlanarData::F32(vec![0.0; 12])).unwrap();
        assert_eq!(VideoTensor::from(planar).default_layout(), Layout::Tchw);
    }

    #[test]
    fn mean_frame_averages_over_time() {
        let mut video = Array4::<f32>::zeros((2, 1, 1, 3));
        video[[0, 0, 0, 0]] = 0.2;
        video[[1, 0, 0, 0]] = 0.4;
        let avg = mean_frame(&video).unwrap();
        assert!((avg[[0, 0, 0]] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn mean_frame_fails_on_empty_video() {
        let video = Array4::<f32>::zeros((0, 4, 4, 3));
        assert!(matches!(mean_frame(&video), Err(Error::EmptyVideo)));
    }

    #[test]
    fn roll2_wraps_both_directions() {
        let field = array![[1.0, 2.0], [3.0, 4.0]];
        let rolled = roll2(&field, 1, 0);
        assert_eq!(rolled, array![[3.0, 4.0], [1.0, 2.0]]);
        let rolled = roll2(&field, 0, -1);
        assert_eq!(rolled, array![[2.0, 1.0], [4.0, 3.0]]);
    }

    #[test]
    fn roll3_moves_all_channels_together() {
        let mut image = Array3::<f32>::zeros((3, 3, 2));
        image[[0, 0, 0]] = 1.0;
        image[[0, 0, 1]] = 2.0;
        let rolled = roll3(&image, 1, 2);
        assert_eq!(rolled[[1, 2, 0]], 1.0);
        assert_eq!(rolled[[1, 2, 1]], 2.0);
        assert_eq!(rolled[[0, 0, 0]], 0.0);
    }
}
