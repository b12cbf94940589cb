//! # Frame Sampler
//!
//! Copies the current video frame into the working buffer, an RGBA8 raster at
//! the stream's native resolution, and reads scan bands out of it.
//!
//! The working buffer is allocated on the first frame and reused for every
//! later tick; it is only reallocated when the video resolution changes.

use scan_region::cpu::extract_rgba;
use scan_region::{ScanRegion, Size};
use tracing::debug;

use crate::capture::{PixelFormat, VideoFrame};
use crate::error::{ScanError, ScanResult};

/// Owner of the working buffer.
#[derive(Debug, Default)]
pub struct FrameSampler {
    working: Vec<u8>,
    size: Option<Size>,
    allocations: usize,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `frame` into the working buffer.
    ///
    /// Returns `None` when the frame is not usable yet (zero area or a buffer
    /// shorter than its dimensions claim); the caller treats that like a video
    /// element without enough data.
    pub fn sample(&mut self, frame: &VideoFrame) -> Option<Size> {
        if !frame.is_complete() {
            return None;
        }
        let size = Size {
            w: frame.width,
            h: frame.height,
        };
        if self.size != Some(size) {
            self.working = vec![0u8; size.rgba_len()];
            self.size = Some(size);
            self.allocations += 1;
            debug!(w = size.w, h = size.h, "Working buffer allocated");
        }

        let bpp = frame.format.bytes_per_pixel();
        let row_in = frame.width as usize * bpp;
        let row_out = frame.width as usize * 4;
        for y in 0..frame.height as usize {
            let src = &frame.data[y * frame.stride..y * frame.stride + row_in];
            let dst = &mut self.working[y * row_out..(y + 1) * row_out];
            match frame.format {
                PixelFormat::Rgba8 => dst.copy_from_slice(src),
                PixelFormat::Bgra8 => {
                    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                        d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
                    }
                }
                PixelFormat::Rgb8 => {
                    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
                        d.copy_from_slice(&[s[0], s[1], s[2], 255]);
                    }
                }
            }
        }
        Some(size)
    }

    /// Working buffer contents (RGBA8, tightly packed).
    pub fn working(&self) -> &[u8] {
        &self.working
    }

    /// Resolution of the last sampled frame.
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// How many times the working buffer has been (re)allocated.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Pixels of `region` from the working buffer.
    pub fn extract(&self, region: &ScanRegion) -> ScanResult<(Vec<u8>, Size)> {
        let size = self
            .size
            .ok_or_else(|| ScanError::state("empty", "extract", "no frame sampled yet"))?;
        let rect = region.pixel_rect();
        let pixels = extract_rgba(&self.working, size, rect)?;
        Ok((pixels, rect.size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_reused_across_same_size_frames() {
        let mut sampler = FrameSampler::new();
        let frame = VideoFrame::new(vec![9u8; 8 * 4 * 4], 8, 4, PixelFormat::Rgba8);
        for _ in 0..5 {
            assert_eq!(sampler.sample(&frame), Some(Size { w: 8, h: 4 }));
        }
        assert_eq!(sampler.allocations(), 1);

        let bigger = VideoFrame::new(vec![9u8; 16 * 4 * 4], 16, 4, PixelFormat::Rgba8);
        sampler.sample(&bigger);
        assert_eq!(sampler.allocations(), 2);
        assert_eq!(sampler.working().len(), 16 * 4 * 4);
    }

    #[test]
    fn test_converts_bgra_and_rgb() {
        let mut sampler = FrameSampler::new();
        let bgra = VideoFrame::new(vec![1, 2, 3, 4], 1, 1, PixelFormat::Bgra8);
        sampler.sample(&bgra).unwrap();
        assert_eq!(sampler.working(), &[3, 2, 1, 4]);

        let rgb = VideoFrame::new(vec![5, 6, 7], 1, 1, PixelFormat::Rgb8);
        sampler.sample(&rgb).unwrap();
        assert_eq!(sampler.working(), &[5, 6, 7, 255]);
    }

    #[test]
    fn test_respects_stride() {
        let mut frame = VideoFrame::new(vec![0u8; 2 * 8], 1, 2, PixelFormat::Rgba8);
        frame.stride = 8;
        frame.data = std::sync::Arc::new(vec![1, 1, 1, 1, 0xEE, 0xEE, 0xEE, 0xEE, 2, 2, 2, 2]);
        let mut sampler = FrameSampler::new();
        sampler.sample(&frame).unwrap();
        assert_eq!(sampler.working(), &[1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_incomplete_frame_is_not_sampled() {
        let mut sampler = FrameSampler::new();
        let frame = VideoFrame::new(vec![0u8; 3], 2, 2, PixelFormat::Rgba8);
        assert!(sampler.sample(&frame).is_none());
        assert!(sampler.extract(&ScanRegion::centered(Size { w: 2, h: 2 })).is_err());
    }

    #[test]
    fn test_extract_hd_band() {
        let mut sampler = FrameSampler::new();
        let frame = VideoFrame::new(vec![0u8; 1280 * 720 * 4], 1280, 720, PixelFormat::Rgba8);
        let size = sampler.sample(&frame).unwrap();
        let (pixels, band) = sampler.extract(&ScanRegion::centered(size)).unwrap();
        assert_eq!(band, Size { w: 800, h: 266 });
        assert_eq!(pixels.len(), 800 * 266 * 4);
    }
}
