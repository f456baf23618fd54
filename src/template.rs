//! The watermark template asset.
//!
//! The template is a single RGBA floating-point image describing the overlay
//! pattern: RGB is what the watermark paints, alpha is how opaque it is at
//! each pixel. It is logically constant for the process lifetime; the
//! process-wide copy is loaded at most once behind [`get_template`].

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::DynamicImage;
use ndarray::{s, Array3};

use crate::error::{Error, Result};

/// Environment variable that overrides the default template location.
pub const TEMPLATE_PATH_ENV: &str = "VIDEO_WATERMARK_TEMPLATE";

/// Default template file, resolved against the working directory.
pub const DEFAULT_TEMPLATE_PATH: &str = "watermark.exr";

/// The RGBA watermark pattern, values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct WatermarkTemplate {
    rgba: Array3<f32>,
}

impl WatermarkTemplate {
    /// Build a template directly from an H x W x 4 RGBA array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`] if the last axis is not 4.
    pub fn from_array(rgba: Array3<f32>) -> Result<Self> {
        if rgba.dim().2 != 4 {
            return Err(Error::InvalidShape {
                shape: rgba.shape().to_vec(),
                reason: "template must have 4 channels (RGBA)",
            });
        }
        Ok(Self { rgba })
    }

    /// Template height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rgba.dim().0
    }

    /// Template width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rgba.dim().1
    }

    /// The raw RGBA pattern.
    #[must_use]
    pub fn rgba(&self) -> &Array3<f32> {
        &self.rgba
    }

    /// Top-left crop to exactly `h` x `w`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateTooSmall`] if either requested dimension
    /// exceeds the template. The template is never padded to fit.
    pub fn crop_to(&self, h: usize, w: usize) -> Result<Self> {
        let (th, tw, _) = self.rgba.dim();
        if h > th || w > tw {
            return Err(Error::TemplateTooSmall { tw, th, w, h });
        }
        Ok(Self {
            rgba: self.rgba.slice(s![..h, ..w, ..]).to_owned(),
        })
    }
}

/// Validate a decoded image as a watermark template.
///
/// The asset must carry an alpha channel (otherwise there is nothing to
/// invert) and floating-point precision (quantized alpha introduces banding
/// into the recovered background).
fn template_from_image(img: DynamicImage) -> Result<WatermarkTemplate> {
    let color = img.color();
    match img {
        DynamicImage::ImageRgba32F(buf) => {
            let (w, h) = (buf.width() as usize, buf.height() as usize);
            let rgba = Array3::from_shape_vec((h, w, 4), buf.into_raw()).map_err(|_| {
                Error::InvalidShape {
                    shape: vec![h, w, 4],
                    reason: "decoded template buffer does not match its dimensions",
                }
            })?;
            WatermarkTemplate::from_array(rgba)
        }
        _ if !color.has_alpha() => Err(Error::TemplateMissingAlpha {
            color: format!("{color:?}"),
        }),
        _ => Err(Error::TemplateNotFloat {
            color: format!("{color:?}"),
        }),
    }
}

/// Load and validate a watermark template from an image file.
///
/// # Errors
///
/// Returns [`Error::TemplateDecode`] if the file cannot be decoded,
/// [`Error::TemplateMissingAlpha`] or [`Error::TemplateNotFloat`] if the
/// decoded image is not RGBA floating-point.
pub fn load_template(path: &Path) -> Result<WatermarkTemplate> {
    let img = image::open(path).map_err(Error::TemplateDecode)?;
    template_from_image(img)
}

static TEMPLATE: OnceLock<WatermarkTemplate> = OnceLock::new();

fn template_path() -> PathBuf {
    env::var_os(TEMPLATE_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH), PathBuf::from)
}

/// The process-wide template, loaded on first use.
///
/// Resolution order: [`TEMPLATE_PATH_ENV`], then [`DEFAULT_TEMPLATE_PATH`].
/// The first successful load is published exactly once, even under
/// concurrent first use, and later calls return the cached value without
/// touching the filesystem. A failed load is not cached, so the error
/// surfaces on every call until the asset is fixed.
///
/// # Errors
///
/// Propagates [`load_template`] failures.
pub fn get_template() -> Result<&'static WatermarkTemplate> {
    if let Some(t) = TEMPLATE.get() {
        return Ok(t);
    }
    let loaded = load_template(&template_path())?;
    Ok(TEMPLATE.get_or_init(|| loaded))
}
