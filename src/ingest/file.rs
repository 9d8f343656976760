//! Local video file source.
//!
//! `VideoSource` picks a decoder from the file's leading bytes rather than its
//! extension: uploaded files frequently arrive under temporary names.
//!
//! The source MUST NOT:
//! - Fetch remote URLs
//! - Write decoded frames anywhere
//! - Outlive the request that opened it

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use image::RgbImage;

#[cfg(feature = "video-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::file_gif::GifFileSource;
use super::FrameSource;
use crate::error::{Error, Result};

const GIF_MAGIC: [&[u8]; 2] = [b"GIF87a", b"GIF89a"];

/// Local video file frame source.
pub struct VideoSource {
    path: PathBuf,
    backend: VideoBackend,
}

enum VideoBackend {
    Gif(GifFileSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl VideoSource {
    pub fn open(path: &Path) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(Error::video_open(
                path,
                "video ingestion only supports local paths (no URL schemes)",
            ));
        }
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let backend = if is_gif(path)? {
            VideoBackend::Gif(GifFileSource::open(path)?)
        } else {
            open_container(path)?
        };
        log::debug!("VideoSource: opened {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            backend,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        match &self.backend {
            VideoBackend::Gif(source) => source.frames_read(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.frames_read(),
        }
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match &mut self.backend {
            VideoBackend::Gif(source) => source.next_frame(),
            #[cfg(feature = "video-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        log::debug!(
            "VideoSource: released {} after {} frames",
            self.path.display(),
            self.frames_read()
        );
    }
}

#[cfg(feature = "video-ffmpeg")]
fn open_container(path: &Path) -> Result<VideoBackend> {
    Ok(VideoBackend::Ffmpeg(FfmpegFileSource::open(path)?))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_container(path: &Path) -> Result<VideoBackend> {
    Err(Error::video_open(
        path,
        "decoding this container requires the video-ffmpeg feature",
    ))
}

fn is_gif(path: &Path) -> Result<bool> {
    let mut file = File::open(path).map_err(|e| Error::video_open(path, e))?;
    let mut magic = [0u8; 6];
    let mut filled = 0;
    while filled < magic.len() {
        let n = file
            .read(&mut magic[filled..])
            .map_err(|e| Error::video_open(path, e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(GIF_MAGIC.iter().any(|m| &magic[..filled] == *m))
}

fn is_local_file_path(path: &Path) -> bool {
    let text = path.to_string_lossy();
    !text.trim().is_empty() && !text.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_url_schemes() {
        let err = VideoSource::open(Path::new("rtsp://camera/stream")).err().unwrap();
        assert_eq!(err.kind(), "video_open_error");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = VideoSource::open(Path::new("/no/such/clip.gif")).err().unwrap();
        assert_eq!(err.kind(), "file_not_found");
    }

    #[cfg(not(feature = "video-ffmpeg"))]
    #[test]
    fn non_gif_container_needs_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();
        let err = VideoSource::open(&path).err().unwrap();
        assert_eq!(err.kind(), "video_open_error");
    }
}
