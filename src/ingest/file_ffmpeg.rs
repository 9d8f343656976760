//! Local video file source using FFmpeg.
//!
//! Decodes the best video stream of any container FFmpeg understands and
//! converts each frame to packed RGB in memory.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use image::RgbImage;

use crate::error::{Error, Result};

pub(crate) struct FfmpegFileSource {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().map_err(|e| Error::video_open(path, format!("initialize ffmpeg: {e}")))?;
        let input = ffmpeg::format::input(&path).map_err(|e| Error::video_open(path, e))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| Error::video_open(path, "file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|e| Error::video_open(path, format!("load video decoder parameters: {e}")))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| Error::video_open(path, format!("open video decoder: {e}")))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| Error::video_open(path, format!("create scaler: {e}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        // A single packet can carry several frames; drain those first.
        if let Some(frame) = receive_rgb(&mut self.decoder, &mut self.scaler)? {
            self.frame_count += 1;
            return Ok(Some(frame));
        }
        if self.eof_sent {
            return Ok(None);
        }

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| decode_error(&self.path, self.frame_count, e))?;
            if let Some(frame) = receive_rgb(&mut self.decoder, &mut self.scaler)? {
                self.frame_count += 1;
                return Ok(Some(frame));
            }
        }

        // Packets exhausted: flush frames still buffered in the decoder.
        self.eof_sent = true;
        self.decoder
            .send_eof()
            .map_err(|e| decode_error(&self.path, self.frame_count, e))?;
        let frame = receive_rgb(&mut self.decoder, &mut self.scaler)?;
        if frame.is_some() {
            self.frame_count += 1;
        }
        Ok(frame)
    }

    pub(crate) fn frames_read(&self) -> u64 {
        self.frame_count
    }
}

fn decode_error(path: &Path, frame: u64, err: ffmpeg::Error) -> Error {
    Error::Detection(format!(
        "failed to decode frame {} of {}: {}",
        frame,
        path.display(),
        err
    ))
}

fn receive_rgb(
    decoder: &mut ffmpeg::codec::decoder::Video,
    scaler: &mut ffmpeg::software::scaling::Context,
) -> Result<Option<RgbImage>> {
    let mut decoded = ffmpeg::frame::Video::empty();
    if decoder.receive_frame(&mut decoded).is_err() {
        return Ok(None);
    }
    let mut rgb_frame = ffmpeg::frame::Video::empty();
    scaler
        .run(&decoded, &mut rgb_frame)
        .map_err(|e| Error::Detection(format!("scale frame to RGB: {e}")))?;
    frame_to_image(&rgb_frame).map(Some)
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        let line = data
            .get(start..end)
            .ok_or_else(|| Error::Detection("ffmpeg frame row is out of bounds".into()))?;
        pixels.extend_from_slice(line);
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| Error::Detection("ffmpeg frame has inconsistent dimensions".into()))
}
