//! Video frame ingestion.
//!
//! This module provides sequential frame sources for local video files:
//! - Animated GIF (always available)
//! - Any container FFmpeg can decode (feature: video-ffmpeg)
//!
//! All sources produce RGB rasters in decode order. A source is opened per
//! request and released before the request's result is returned; the worker
//! process never restarts, so a leaked handle would accumulate.

pub mod file;
#[cfg(feature = "video-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub(crate) mod file_gif;

pub use file::VideoSource;

use image::RgbImage;

use crate::error::Result;

/// Sequential frame source.
pub trait FrameSource {
    /// Decode the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Release the underlying handle.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}
