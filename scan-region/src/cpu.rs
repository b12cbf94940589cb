// SPDX-License-Identifier: MIT
// CPU region access built on fast_image_resize.
// RGBA8 in → RGBA8 out, tightly packed rows.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeAlg, ResizeOptions, Resizer};

use crate::region::{PixelRect, ScanRegion, Size};

#[derive(Debug)]
pub enum RegionError {
    BufferTooSmall { needed: usize, got: usize },
    EmptyRegion,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for RegionError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for RegionError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for RegionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionError::BufferTooSmall { needed, got } => {
                write!(f, "Buffer too small: need {} bytes, got {}", needed, got)
            }
            RegionError::EmptyRegion => write!(f, "Scan region has zero area"),
            RegionError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            RegionError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for RegionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegionError::Fir(e) => Some(e),
            RegionError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Read `rect` out of a tightly packed RGBA8 raster of `size`.
///
/// Pixels of `rect` that fall outside the raster read as transparent black.
pub fn extract_rgba(src_rgba: &[u8], size: Size, rect: PixelRect) -> Result<Vec<u8>, RegionError> {
    check_len(src_rgba, size)?;
    if rect.is_empty() {
        return Err(RegionError::EmptyRegion);
    }

    let row_bytes = rect.w as usize * 4;
    let mut out = vec![0u8; row_bytes * rect.h as usize];

    // Horizontal overlap of the rect with the raster, in raster columns.
    let col_start = rect.x.max(0);
    let col_end = (rect.x + rect.w as i64).min(size.w as i64);
    if col_start >= col_end {
        return Ok(out);
    }
    let copy_bytes = (col_end - col_start) as usize * 4;
    let dst_offset = (col_start - rect.x) as usize * 4;

    for row in 0..rect.h as i64 {
        let src_y = rect.y + row;
        if src_y < 0 || src_y >= size.h as i64 {
            continue;
        }
        let s = (src_y as usize * size.w as usize + col_start as usize) * 4;
        let d = row as usize * row_bytes + dst_offset;
        out[d..d + copy_bytes].copy_from_slice(&src_rgba[s..s + copy_bytes]);
    }

    Ok(out)
}

/// Re-draw the fractional `region` of `src_rgba` into `dst`, which must be
/// exactly `region.capture_size()` RGBA8 pixels.
///
/// A band lying fully inside the raster goes through a nearest-neighbour crop,
/// so integral regions are copied verbatim. A band crossing the border falls
/// back to [`extract_rgba`] on the truncated rect.
pub fn redraw_region(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    size: Size,
    region: &ScanRegion,
    dst: &mut [u8],
) -> Result<(), RegionError> {
    check_len(src_rgba, size)?;
    let out = region.capture_size();
    if out.is_empty() {
        return Err(RegionError::EmptyRegion);
    }
    let dst_len = out.rgba_len();
    if dst.len() < dst_len {
        return Err(RegionError::BufferTooSmall {
            needed: dst_len,
            got: dst.len(),
        });
    }

    let inside = region.x >= 0.0
        && region.y >= 0.0
        && region.x + region.width <= size.w as f64
        && region.y + region.height <= size.h as f64;

    if !inside {
        let copy = extract_rgba(src_rgba, size, region.pixel_rect())?;
        dst[..dst_len].copy_from_slice(&copy);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(size.w, size.h, &src_rgba[..size.rgba_len()])?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(out.w, out.h, &mut dst[..dst_len])?;

    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Nearest)
        .crop(region.x, region.y, region.width, region.height);
    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}

#[inline]
fn check_len(src: &[u8], size: Size) -> Result<(), RegionError> {
    let needed = size.rgba_len();
    if src.len() < needed {
        return Err(RegionError::BufferTooSmall {
            needed,
            got: src.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raster whose pixel at (x, y) is [x, y, 7, 255] (coordinates mod 256).
    fn coordinate_raster(size: Size) -> Vec<u8> {
        let mut data = Vec::with_capacity(size.rgba_len());
        for y in 0..size.h {
            for x in 0..size.w {
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 7, 255]);
            }
        }
        data
    }

    fn pixel(buf: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * w + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn extract_inside_copies_rows() {
        let size = Size { w: 20, h: 10 };
        let src = coordinate_raster(size);
        let rect = PixelRect { x: 3, y: 2, w: 5, h: 4 };
        let out = extract_rgba(&src, size, rect).unwrap();
        assert_eq!(out.len(), 5 * 4 * 4);
        assert_eq!(pixel(&out, 5, 0, 0), [3, 2, 7, 255]);
        assert_eq!(pixel(&out, 5, 4, 3), [7, 5, 7, 255]);
    }

    #[test]
    fn extract_outside_reads_transparent_black() {
        let size = Size { w: 4, h: 4 };
        let src = coordinate_raster(size);
        let rect = PixelRect { x: -1, y: -2, w: 3, h: 4 };
        let out = extract_rgba(&src, size, rect).unwrap();
        // Rows 0 and 1 are above the raster.
        assert_eq!(pixel(&out, 3, 1, 1), [0, 0, 0, 0]);
        // Column 0 is left of the raster.
        assert_eq!(pixel(&out, 3, 0, 2), [0, 0, 0, 0]);
        assert_eq!(pixel(&out, 3, 1, 2), [0, 0, 7, 255]);
        assert_eq!(pixel(&out, 3, 2, 3), [1, 1, 7, 255]);
    }

    #[test]
    fn extract_rejects_short_buffer() {
        let size = Size { w: 4, h: 4 };
        let err = extract_rgba(&[0u8; 10], size, PixelRect { x: 0, y: 0, w: 1, h: 1 }).unwrap_err();
        assert!(matches!(err, RegionError::BufferTooSmall { needed: 64, got: 10 }));
    }

    #[test]
    fn extract_rejects_empty_rect() {
        let size = Size { w: 4, h: 4 };
        let src = coordinate_raster(size);
        let err = extract_rgba(&src, size, PixelRect { x: 0, y: 0, w: 0, h: 3 }).unwrap_err();
        assert!(matches!(err, RegionError::EmptyRegion));
    }

    #[test]
    fn redraw_integral_region_matches_extraction() {
        // 600x300 gives a 480x160 band at (60, 70): every component is integral.
        let size = Size { w: 600, h: 300 };
        let src = coordinate_raster(size);
        let region = ScanRegion::centered(size);
        assert_eq!(region.pixel_rect(), PixelRect { x: 60, y: 70, w: 480, h: 160 });

        let mut resizer = Resizer::new();
        let mut dst = vec![0u8; region.capture_size().rgba_len()];
        redraw_region(&mut resizer, &src, size, &region, &mut dst).unwrap();

        let expected = extract_rgba(&src, size, region.pixel_rect()).unwrap();
        assert_eq!(dst, expected);
    }

    #[test]
    fn redraw_border_crossing_region_falls_back_to_extraction() {
        let size = Size { w: 1200, h: 100 };
        let src = coordinate_raster(size);
        let region = ScanRegion::centered(size);

        let mut resizer = Resizer::new();
        let mut dst = vec![0u8; region.capture_size().rgba_len()];
        redraw_region(&mut resizer, &src, size, &region, &mut dst).unwrap();

        let expected = extract_rgba(&src, size, region.pixel_rect()).unwrap();
        assert_eq!(dst, expected);
    }

    #[test]
    fn redraw_rejects_small_destination() {
        let size = Size { w: 600, h: 300 };
        let src = coordinate_raster(size);
        let region = ScanRegion::centered(size);
        let mut resizer = Resizer::new();
        let mut dst = vec![0u8; 16];
        let err = redraw_region(&mut resizer, &src, size, &region, &mut dst).unwrap_err();
        assert!(matches!(err, RegionError::BufferTooSmall { .. }));
    }
}
