// # Still-Image Capture Source
//
// Presents a fixed list of frames as a video stream: each read advances to the
// next frame, and the last frame repeats until the track is stopped. Used by
// the `viewfinder --image` shell and by tests that need a deterministic feed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::stream::{MediaTrack, PixelFormat, TrackHandle, VideoFrame, VideoStream};
use super::{CaptureSource, MediaConstraints};
use crate::error::{ScanError, ScanResult};

enum Frames {
    Files(Vec<PathBuf>),
    Memory(Vec<VideoFrame>),
}

/// Capture source replaying image files or in-memory frames.
pub struct StillImageSource {
    frames: Frames,
}

impl StillImageSource {
    /// Source that decodes `paths` (PNG or JPEG) when the stream is requested.
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            frames: Frames::Files(paths),
        }
    }

    /// Source serving already decoded frames.
    pub fn from_frames(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames: Frames::Memory(frames),
        }
    }

    fn load(&self) -> ScanResult<Vec<VideoFrame>> {
        let frames = match &self.frames {
            Frames::Memory(frames) => frames.clone(),
            Frames::Files(paths) => {
                let mut frames = Vec::with_capacity(paths.len());
                for path in paths {
                    let img = image::open(path).map_err(|e| {
                        ScanError::capture_denied(path.display().to_string(), e.to_string())
                    })?;
                    let rgba = img.to_rgba8();
                    let (w, h) = rgba.dimensions();
                    debug!(path = %path.display(), w, h, "Loaded still frame");
                    frames.push(VideoFrame::new(rgba.into_raw(), w, h, PixelFormat::Rgba8));
                }
                frames
            }
        };

        if frames.is_empty() {
            return Err(ScanError::capture_denied(
                "still images",
                "no frames to play back",
            ));
        }
        Ok(frames)
    }
}

#[async_trait]
impl CaptureSource for StillImageSource {
    async fn request(&self, constraints: &MediaConstraints) -> ScanResult<Box<dyn VideoStream>> {
        // Stills have a fixed resolution; the hints are only logged.
        let frames = self.load()?;
        info!(
            frames = frames.len(),
            ideal_width = constraints.ideal_width,
            ideal_height = constraints.ideal_height,
            "Still image stream opened"
        );
        Ok(Box::new(StillStream {
            frames,
            cursor: AtomicUsize::new(0),
            track: TrackHandle::new("still-0"),
        }))
    }

    fn name(&self) -> &str {
        "still images"
    }
}

struct StillStream {
    frames: Vec<VideoFrame>,
    cursor: AtomicUsize,
    track: Arc<TrackHandle>,
}

impl VideoStream for StillStream {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone() as Arc<dyn MediaTrack>]
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.track.is_live() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        let last = self.frames.len() - 1;
        self.frames.get(i.min(last)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, v: u8) -> VideoFrame {
        VideoFrame::new(vec![v; (w * h * 4) as usize], w, h, PixelFormat::Rgba8)
    }

    #[tokio::test]
    async fn test_frames_advance_then_repeat_last() {
        let source = StillImageSource::from_frames(vec![solid(2, 2, 1), solid(2, 2, 2)]);
        let stream = source.request(&MediaConstraints::default()).await.unwrap();

        assert_eq!(stream.current_frame().unwrap().data[0], 1);
        assert_eq!(stream.current_frame().unwrap().data[0], 2);
        assert_eq!(stream.current_frame().unwrap().data[0], 2);

        for track in stream.tracks() {
            track.stop();
        }
        assert!(stream.current_frame().is_none());
    }

    #[tokio::test]
    async fn test_empty_source_is_denied() {
        let source = StillImageSource::from_frames(Vec::new());
        let err = source.request(&MediaConstraints::default()).await.err().unwrap();
        assert_eq!(err.category(), "capture_denied");
    }

    #[tokio::test]
    async fn test_missing_file_is_denied() {
        let source = StillImageSource::from_paths(vec![PathBuf::from("/nonexistent/qr.png")]);
        let err = source.request(&MediaConstraints::default()).await.err().unwrap();
        assert_eq!(err.category(), "capture_denied");
    }
}
