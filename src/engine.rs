//! Core watermark removal engine.

use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::{Array4, ArrayView3, Axis};

use crate::blending::recover_background;
use crate::detection::{detect_shift, Shift};
use crate::error::{Error, Result};
use crate::template::{get_template, load_template, WatermarkTemplate};
use crate::tensor::{mean_frame, roll3, Layout, VideoTensor};

/// Summary of one processed frame sequence.
#[derive(Debug)]
pub struct ProcessSummary {
    /// Directory the recovered frames were written to.
    pub output_dir: PathBuf,
    /// Number of frames processed.
    pub frames: usize,
    /// The detected watermark shift.
    pub shift: Shift,
}

/// The watermark removal engine.
///
/// Holds one immutable [`WatermarkTemplate`]; create it once and reuse it
/// for any number of videos. Each [`WatermarkRemover::remove`] call is an
/// independent, stateless pipeline.
pub struct WatermarkRemover {
    template: WatermarkTemplate,
}

impl WatermarkRemover {
    /// Create an engine from the process-wide template cache.
    ///
    /// # Errors
    ///
    /// Propagates template resolution and validation failures from
    /// [`get_template`].
    pub fn new() -> Result<Self> {
        Ok(Self {
            template: get_template()?.clone(),
        })
    }

    /// Create an engine from a template file.
    ///
    /// # Errors
    ///
    /// Propagates decode and validation failures from [`load_template`].
    pub fn from_template_path(path: &Path) -> Result<Self> {
        Ok(Self {
            template: load_template(path)?,
        })
    }

    /// Create an engine from an already-built template.
    #[must_use]
    pub fn from_template(template: WatermarkTemplate) -> Self {
        Self { template }
    }

    /// The template this engine removes.
    #[must_use]
    pub fn template(&self) -> &WatermarkTemplate {
        &self.template
    }

    /// Remove the watermark from a video.
    ///
    /// The pipeline is a straight line: resolve the layout (an explicit
    /// `layout` wins over the backend's default), normalize to canonical
    /// THWC f32, average the frames, crop the template to the frame size,
    /// detect the watermark shift on the average frame, roll the template
    /// into place, invert the blend across every frame, and convert the
    /// result back to the caller's layout and backend. The output is always
    /// floating-point with values in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] for malformed input tensors,
    /// [`Error::EmptyVideo`] for a zero-frame video, and
    /// [`Error::TemplateTooSmall`] when the frames exceed the template.
    pub fn remove(&self, video: VideoTensor, layout: Option<Layout>) -> Result<VideoTensor> {
        let layout = layout.unwrap_or_else(|| video.default_layout());
        let (frames, source) = video.into_canonical(layout)?;
        let (recovered, _) = self.remove_canonical(frames)?;
        Ok(VideoTensor::from_canonical(recovered, layout, source))
    }

    /// Run the core pipeline on canonical THWC frames.
    fn remove_canonical(&self, frames: Array4<f32>) -> Result<(Array4<f32>, Shift)> {
        let average = mean_frame(&frames)?;
        let (_, h, w, _) = frames.dim();

        let cropped = self.template.crop_to(h, w)?;
        let shift = detect_shift(&average, &cropped);
        let aligned = roll3(cropped.rgba(), shift.dy, shift.dx);

        let recovered = recover_background(&frames, &aligned);
        Ok((recovered, shift))
    }

    /// Process a directory of frame images as one video.
    ///
    /// Frames are the supported image files in `input_dir`, taken in
    /// lexicographic order; all must share the same dimensions. Recovered
    /// frames are written to `output_dir` as PNG under the original file
    /// stems. Decode and encode are parallelized when the `cli` feature is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFrames`] if the directory holds no supported
    /// images, [`Error::FrameSizeMismatch`] on inconsistent dimensions,
    /// and I/O or decode errors from the filesystem surface.
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<ProcessSummary> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(input_dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_supported_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::NoFrames(input_dir.to_path_buf()));
        }

        let frames = decode_frames(&paths)?;
        let (want_w, want_h) = (frames[0].width(), frames[0].height());
        for (frame, path) in frames.iter().zip(&paths) {
            if frame.width() != want_w || frame.height() != want_h {
                return Err(Error::FrameSizeMismatch {
                    path: path.clone(),
                    got_w: frame.width(),
                    got_h: frame.height(),
                    want_w,
                    want_h,
                });
            }
        }

        let video = stack_frames(&frames);
        let (frames_f32, _) = VideoTensor::from(video).into_canonical(Layout::Thwc)?;
        let (recovered, shift) = self.remove_canonical(frames_f32)?;

        std::fs::create_dir_all(output_dir)?;
        encode_frames(&recovered, &paths, output_dir)?;

        Ok(ProcessSummary {
            output_dir: output_dir.to_path_buf(),
            frames: paths.len(),
            shift,
        })
    }
}

/// Check if a file has a supported frame-image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

#[cfg(feature = "cli")]
fn decode_frames(paths: &[PathBuf]) -> Result<Vec<RgbImage>> {
    use rayon::prelude::*;
    paths
        .par_iter()
        .map(|p| Ok(image::open(p)?.to_rgb8()))
        .collect()
}

#[cfg(not(feature = "cli"))]
fn decode_frames(paths: &[PathBuf]) -> Result<Vec<RgbImage>> {
    paths.iter().map(|p| Ok(image::open(p)?.to_rgb8())).collect()
}

/// Stack decoded frames into a (T, H, W, 3) array of pixel levels.
fn stack_frames(frames: &[RgbImage]) -> Array4<u8> {
    let (w, h) = (frames[0].width() as usize, frames[0].height() as usize);
    let mut buf = Vec::with_capacity(frames.len() * h * w * 3);
    for frame in frames {
        buf.extend_from_slice(frame.as_raw());
    }
    // Length checked per frame above.
    Array4::from_shape_vec((frames.len(), h, w, 3), buf)
        .expect("frame buffers match their dimensions")
}

fn encode_frames(recovered: &Array4<f32>, paths: &[PathBuf], output_dir: &Path) -> Result<()> {
    let outputs: Vec<PathBuf> = paths
        .iter()
        .map(|p| {
            let stem = p.file_stem().unwrap_or_default().to_string_lossy();
            output_dir.join(format!("{stem}.png"))
        })
        .collect();

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        (0..outputs.len())
            .into_par_iter()
            .map(|i| save_frame(recovered.index_axis(Axis(0), i), &outputs[i]))
            .collect::<Result<Vec<_>>>()?;
    }

    #[cfg(not(feature = "cli"))]
    {
        for (frame, path) in recovered.axis_iter(Axis(0)).zip(&outputs) {
            save_frame(frame, path)?;
        }
    }

    Ok(())
}

/// Quantize a recovered frame back to 8-bit pixel levels, row-major RGB.
fn quantize_frame(frame: ArrayView3<'_, f32>) -> Vec<u8> {
    let (h, w, _) = frame.dim();
    let mut buf = Vec::with_capacity(h * w * 3);
    for i in 0..h {
        for j in 0..w {
            for c in 0..3 {
                buf.push((frame[[i, j, c]] * 255.0).round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    buf
}

fn save_frame(frame: ArrayView3<'_, f32>, path: &Path) -> Result<()> {
    let (h, w, _) = frame.dim();
    let buf = quantize_frame(frame);
    // Length h*w*3 by construction.
    let img = RgbImage::from_raw(w as u32, h as u32, buf).expect("buffer matches dimensions");
    img.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn transparent_template(h: usize, w: usize) -> WatermarkTemplate {
        WatermarkTemplate::from_array(Array3::<f32>::zeros((h, w, 4))).unwrap()
    }

    #[test]
    fn transparent_template_leaves_video_unchanged() {
        let remover = WatermarkRemover::from_template(transparent_template(16, 16));
        let video = Array4::from_shape_fn((2, 16, 16, 3), |(t, i, j, c)| {
            ((t * 13 + i * 5 + j * 3 + c) % 7) as f32 / 7.0
        });

        let recovered = remover
            .remove(video.clone().into(), None)
            .unwrap()
            .into_nd_f32()
            .unwrap();
        for (orig, rec) in video.iter().zip(recovered.iter()) {
            assert!((orig - rec).abs() < 1e-6);
        }
    }

    #[test]
    fn frames_larger_than_template_are_rejected() {
        let remover = WatermarkRemover::from_template(transparent_template(8, 8));
        let video = Array4::<f32>::zeros((1, 16, 16, 3));
        let err = remover.remove(video.into(), None);
        assert!(matches!(err, Err(Error::TemplateTooSmall { .. })));
    }

    #[test]
    fn empty_video_is_rejected() {
        let remover = WatermarkRemover::from_template(transparent_template(8, 8));
        let video = Array4::<f32>::zeros((0, 8, 8, 3));
        let err = remover.remove(video.into(), None);
        assert!(matches!(err, Err(Error::EmptyVideo)));
    }

    #[test]
    fn u8_video_comes_back_floating() {
        let remover = WatermarkRemover::from_template(transparent_template(8, 8));
        let video = Array4::<u8>::from_elem((1, 8, 8, 3), 128);
        let recovered = remover
            .remove(video.into(), None)
            .unwrap()
            .into_nd_f32()
            .unwrap();
        for &v in recovered.iter() {
            assert!((v - 128.0 / 255.0).abs() < 1e-6);
        }
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("frame_0001.png")));
        assert!(is_supported_image(Path::new("frame_0001.JPG")));
        assert!(is_supported_image(Path::new("frame_0001.webp")));
        assert!(!is_supported_image(Path::new("frame_0001.gif")));
        assert!(!is_supported_image(Path::new("frames.txt")));
        assert!(!is_supported_image(Path::new("frames")));
    }

    #[test]
    fn quantize_frame_rounds_and_clamps() {
        let mut frame = Array3::from_elem((2, 2, 3), 0.5);
        frame[[0, 0, 0]] = -0.1;
        frame[[1, 1, 2]] = 1.2;
        let buf = quantize_frame(frame.view());
        // 0.5 * 255 = 127.5 rounds to 128; out-of-range values clamp.
        assert_eq!(buf[0], 0);
        assert_eq!(buf[11], 255);
        assert_eq!(buf[1], 128);
    }
}
