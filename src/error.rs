//! Error types for the video-watermark-removal crate.

use std::path::PathBuf;

/// Errors that can occur during watermark alignment and removal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to decode the watermark template image.
    #[error("failed to decode watermark template: {0}")]
    TemplateDecode(image::ImageError),

    /// The template image has no alpha channel.
    ///
    /// Without alpha there is nothing to invert: the compositing equation
    /// degenerates to the template itself.
    #[error("watermark template has no alpha channel (decoded as {color})")]
    TemplateMissingAlpha {
        /// Color type the template decoded to.
        color: String,
    },

    /// The template image is not stored with floating-point precision.
    #[error("watermark template is not floating-point (decoded as {color})")]
    TemplateNotFloat {
        /// Color type the template decoded to.
        color: String,
    },

    /// The video frames are larger than the watermark template.
    #[error("template ({tw}x{th}) smaller than requested crop ({w}x{h})")]
    TemplateTooSmall {
        /// Template width in pixels.
        tw: usize,
        /// Template height in pixels.
        th: usize,
        /// Requested crop width.
        w: usize,
        /// Requested crop height.
        h: usize,
    },

    /// A tensor operand does not describe a valid RGB video.
    #[error("invalid video shape {shape:?}: {reason}")]
    InvalidShape {
        /// The offending shape, in the order the caller supplied it.
        shape: Vec<usize>,
        /// Why the shape was rejected.
        reason: &'static str,
    },

    /// The video contains no frames, so the temporal average is undefined.
    #[error("video has no frames")]
    EmptyVideo,

    /// A frame directory contained no decodable frames.
    #[error("no frame images found in {dir}", dir = .0.display())]
    NoFrames(PathBuf),

    /// A frame's dimensions differ from the first frame of the sequence.
    #[error("frame {path} is {got_w}x{got_h}, expected {want_w}x{want_h}", path = .path.display())]
    FrameSizeMismatch {
        /// Path of the mismatched frame.
        path: PathBuf,
        /// Width of the mismatched frame.
        got_w: u32,
        /// Height of the mismatched frame.
        got_h: u32,
        /// Width of the first frame.
        want_w: u32,
        /// Height of the first frame.
        want_h: u32,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while decoding or encoding a frame image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
