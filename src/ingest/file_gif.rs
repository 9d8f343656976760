//! Animated GIF frame source.
//!
//! Frames come out composited onto the full logical screen, as a player
//! would show them.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, RgbImage};

use crate::error::{Error, Result};

pub(crate) struct GifFileSource {
    path: PathBuf,
    frames: Frames<'static>,
    frame_count: u64,
}

impl GifFileSource {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::video_open(path, e))?;
        let decoder =
            GifDecoder::new(BufReader::new(file)).map_err(|e| Error::video_open(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            frames: decoder.into_frames(),
            frame_count: 0,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.frames.next() {
            None => Ok(None),
            Some(Ok(frame)) => {
                self.frame_count += 1;
                Ok(Some(DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8()))
            }
            Some(Err(e)) => Err(Error::Detection(format!(
                "failed to decode frame {} of {}: {}",
                self.frame_count,
                self.path.display(),
                e
            ))),
        }
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frame_count
    }
}
