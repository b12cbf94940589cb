// SPDX-License-Identifier: MIT
//! # Scan Region Geometry
//!
//! Computes the band of the video frame that is handed to the decoder.
//!
//! ## Design Philosophy
//!
//! The band is described in two spaces:
//! 1. **ScanRegion**: fractional geometry, exactly as the formula produces it
//! 2. **PixelRect**: the integer rectangle actually read, obtained by truncating
//!    every component toward zero (the same conversion a 2D canvas applies to
//!    `getImageData` arguments)
//!
//! The band is horizontally and vertically centered, covers at most 80% of the
//! frame width (hard cap 800 px), and keeps a fixed 3:1 width:height ratio.
//! That ratio suits a single-line symbol more than a square matrix code; it is
//! kept as-is for compatibility with the captures users already have.

/// Default fraction of the video width covered by the band.
pub const DEFAULT_WIDTH_FRACTION: f64 = 0.8;
/// Default hard cap on the band width, in pixels.
pub const DEFAULT_MAX_WIDTH: f64 = 800.0;
/// Default width:height ratio of the band.
pub const DEFAULT_ASPECT: f64 = 3.0;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Number of bytes in a tightly packed RGBA8 raster of this size.
    pub fn rgba_len(&self) -> usize {
        self.w as usize * self.h as usize * 4
    }
}

/// Parameters of the band formula. [`RegionGeometry::default`] reproduces the
/// shipped geometry (80%, 800 px, 3:1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionGeometry {
    pub width_fraction: f64,
    pub max_width: f64,
    pub aspect: f64,
}

impl Default for RegionGeometry {
    fn default() -> Self {
        Self {
            width_fraction: DEFAULT_WIDTH_FRACTION,
            max_width: DEFAULT_MAX_WIDTH,
            aspect: DEFAULT_ASPECT,
        }
    }
}

/// Fractional scan band in video pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer rectangle derived from a [`ScanRegion`].
///
/// `x`/`y` may be negative when the band is taller than the frame; reads outside
/// the frame yield transparent black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn size(&self) -> Size {
        Size {
            w: self.w,
            h: self.h,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl ScanRegion {
    /// Band for the default geometry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scan_region::region::{ScanRegion, Size};
    ///
    /// let r = ScanRegion::centered(Size { w: 1280, h: 720 });
    /// assert_eq!((r.x, r.width), (240.0, 800.0));
    /// assert!((r.y - 226.666).abs() < 0.01);
    /// ```
    pub fn centered(video: Size) -> Self {
        Self::centered_with(video, RegionGeometry::default())
    }

    /// Band for an explicit geometry.
    pub fn centered_with(video: Size, geometry: RegionGeometry) -> Self {
        let video_w = video.w as f64;
        let video_h = video.h as f64;
        let width = (video_w * geometry.width_fraction).min(geometry.max_width);
        let height = width / geometry.aspect;
        Self {
            x: (video_w - width) / 2.0,
            y: (video_h - height) / 2.0,
            width,
            height,
        }
    }

    /// Integer rectangle read from the working buffer. Every component is
    /// truncated toward zero.
    pub fn pixel_rect(&self) -> PixelRect {
        PixelRect {
            x: self.x.trunc() as i64,
            y: self.y.trunc() as i64,
            w: clamp_dim(self.width),
            h: clamp_dim(self.height),
        }
    }

    /// Size of the capture buffer allocated when this region is frozen.
    pub fn capture_size(&self) -> Size {
        self.pixel_rect().size()
    }
}

fn clamp_dim(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn hd_frame_is_capped_at_800() {
        let r = ScanRegion::centered(Size { w: 1280, h: 720 });
        assert!(approx(r.width, 800.0));
        assert!(approx(r.height, 800.0 / 3.0));
        assert!(approx(r.x, 240.0));
        assert!(approx(r.y, (720.0 - 800.0 / 3.0) / 2.0));

        let px = r.pixel_rect();
        assert_eq!(px, PixelRect { x: 240, y: 226, w: 800, h: 266 });
    }

    #[test]
    fn small_frame_uses_eighty_percent() {
        let r = ScanRegion::centered(Size { w: 640, h: 480 });
        assert!(approx(r.width, 512.0));
        assert!(approx(r.height, 512.0 / 3.0));
        assert!(approx(r.x, 64.0));
        assert!(approx(r.y, (480.0 - 512.0 / 3.0) / 2.0));
    }

    #[test]
    fn band_is_centered_for_many_sizes() {
        for &(w, h) in &[(1u32, 1u32), (320, 240), (999, 333), (1000, 1000), (1920, 1080), (3840, 2160)] {
            let r = ScanRegion::centered(Size { w, h });
            let expected_w = (w as f64 * 0.8).min(800.0);
            assert!(approx(r.width, expected_w));
            assert!(approx(r.height, expected_w / 3.0));
            assert!(approx(r.x * 2.0 + r.width, w as f64));
            assert!(approx(r.y * 2.0 + r.height, h as f64));
        }
    }

    #[test]
    fn wide_short_frame_produces_negative_origin() {
        let r = ScanRegion::centered(Size { w: 1200, h: 100 });
        assert!(r.y < 0.0);
        let px = r.pixel_rect();
        assert_eq!(px.w, 800);
        assert_eq!(px.h, 266);
        // -83.33 truncates toward zero
        assert_eq!(px.y, -83);
    }

    #[test]
    fn empty_video_gives_empty_rect() {
        let r = ScanRegion::centered(Size { w: 0, h: 0 });
        assert!(r.pixel_rect().is_empty());
    }

    #[test]
    fn custom_geometry() {
        let g = RegionGeometry {
            width_fraction: 0.5,
            max_width: 100.0,
            aspect: 1.0,
        };
        let r = ScanRegion::centered_with(Size { w: 400, h: 300 }, g);
        assert!(approx(r.width, 100.0));
        assert!(approx(r.height, 100.0));
        assert!(approx(r.x, 150.0));
        assert!(approx(r.y, 100.0));
    }
}
