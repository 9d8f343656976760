//! Frame preprocessing.
//!
//! Converts a decoded raster (still image or video frame) into the fixed-shape
//! tensor the classifier expects. The step order is part of the numeric
//! contract and must not change:
//!
//! 1. Optional region-of-interest crop (video frames only, and only when the frame is large enough)
//! 2. Channel conversion (single-channel grayscale, or BGR for color pipelines)
//! 3. Resize to the pipeline's target size
//! 4. Reshape to `[1, H, W, C]`
//! 5. Scale by `1 / 255` into `[0, 1]`
//!
//! Preprocessing is a pure function of its input. `FrameTensor` values are
//! ephemeral: one is created per classification call and dropped afterwards.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageReader, Luma, RgbImage};
use tract_onnx::prelude::tract_ndarray::{Array4, ArrayView4};
use tract_onnx::prelude::{IntoTensor, Tensor};

use crate::error::{Error, Result};

// ----------------------------------------------------------------------------
// Pipeline parameters
// ----------------------------------------------------------------------------

/// Rectangle cropped out of large video frames before classification.
///
/// Bounds are half-open: rows `top..bottom`, columns `left..right`. The crop
/// only applies when the frame covers the whole rectangle; smaller frames are
/// used as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Roi {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Roi {
    /// Hand region used by the grayscale pipeline: rows 40..300, columns 0..300.
    pub const HAND: Roi = Roi {
        top: 40,
        bottom: 300,
        left: 0,
        right: 300,
    };

    /// Frames must be at least `right` wide and `bottom` tall for the crop to apply.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width >= self.right && height >= self.bottom
    }

    pub fn is_valid(&self) -> bool {
        self.top < self.bottom && self.left < self.right
    }

    fn crop(&self, frame: &RgbImage) -> RgbImage {
        imageops::crop_imm(
            frame,
            self.left,
            self.top,
            self.right - self.left,
            self.bottom - self.top,
        )
        .to_image()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Grayscale,
    /// Three channels in BGR order.
    Color,
}

impl ColorMode {
    pub fn channels(&self) -> usize {
        match self {
            ColorMode::Grayscale => 1,
            ColorMode::Color => 3,
        }
    }
}

// ----------------------------------------------------------------------------
// FrameTensor
// ----------------------------------------------------------------------------

/// Normalised `[1, H, W, C]` float tensor, values in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTensor {
    data: Array4<f32>,
}

impl FrameTensor {
    pub fn from_array(data: Array4<f32>) -> Self {
        Self { data }
    }

    /// `[batch, height, width, channels]`.
    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied()
    }

    pub fn into_tensor(self) -> Tensor {
        self.data.into_tensor()
    }
}

// ----------------------------------------------------------------------------
// Preprocessor
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preprocessor {
    pub width: u32,
    pub height: u32,
    pub color: ColorMode,
    pub roi: Option<Roi>,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32, color: ColorMode) -> Self {
        Self {
            width,
            height,
            color,
            roi: None,
        }
    }

    pub fn with_roi(mut self, roi: Option<Roi>) -> Self {
        self.roi = roi;
        self
    }

    /// Tensor shape this preprocessor produces.
    pub fn input_shape(&self) -> [usize; 4] {
        [
            1,
            self.height as usize,
            self.width as usize,
            self.color.channels(),
        ]
    }

    /// Preprocess a still image. Still images are never cropped.
    pub fn preprocess_image(&self, image: &RgbImage) -> Result<FrameTensor> {
        self.run(image, None)
    }

    /// Preprocess a video frame, cropping the region of interest when it fits.
    pub fn preprocess_frame(&self, frame: &RgbImage) -> Result<FrameTensor> {
        self.run(frame, self.roi)
    }

    fn run(&self, frame: &RgbImage, roi: Option<Roi>) -> Result<FrameTensor> {
        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::Detection(format!("cannot preprocess empty {w}x{h} frame")));
        }

        let cropped;
        let source = match roi {
            Some(roi) if roi.fits(w, h) => {
                cropped = roi.crop(frame);
                &cropped
            }
            _ => frame,
        };

        let width = self.width as usize;
        let height = self.height as usize;
        let data = match self.color {
            ColorMode::Grayscale => {
                let gray = to_gray(source);
                let resized = imageops::resize(&gray, self.width, self.height, FilterType::Triangle);
                Array4::from_shape_fn((1, height, width, 1), |(_, y, x, _)| {
                    resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
                })
            }
            ColorMode::Color => {
                let resized = imageops::resize(source, self.width, self.height, FilterType::Triangle);
                Array4::from_shape_fn((1, height, width, 3), |(_, y, x, channel)| {
                    // RGB raster -> BGR tensor
                    resized.get_pixel(x as u32, y as u32)[2 - channel] as f32 / 255.0
                })
            }
        };

        Ok(FrameTensor::from_array(data))
    }
}

/// Decode an image file into an RGB raster.
///
/// The format is sniffed from content, not the extension.
pub fn decode_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| Error::image_read(path, e))?
        .with_guessed_format()
        .map_err(|e| Error::image_read(path, e))?;
    let image = reader.decode().map_err(|e| Error::image_read(path, e))?;
    let rgb = image.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(Error::image_read(path, "decoded image is empty"));
    }
    Ok(rgb)
}

/// ITU-R BT.601 luma, rounded to the nearest integer.
fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

fn to_gray(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        Luma([bt601_luma(r, g, b)])
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
