//! QR decoding through `rqrr`.
//!
//! RGBA is reduced to luma with Rec. 709 weights before detection. Each
//! polarity pass from [`InversionAttempts::passes`] prepares its own image;
//! the first grid that decodes wins.

use rqrr::PreparedImage;
use tracing::{debug, trace};

use super::{DecodeOptions, DecodedCode, Decoder, Point, RegionPixels};
use crate::error::{ScanError, ScanResult};

/// Pure-Rust QR decoder.
#[derive(Debug, Default)]
pub struct RqrrDecoder {
    luma: Vec<u8>,
}

impl RqrrDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fill_luma(&mut self, pixels: &RegionPixels<'_>) {
        let len = pixels.width as usize * pixels.height as usize;
        self.luma.clear();
        self.luma.reserve(len);
        for px in pixels.data[..len * 4].chunks_exact(4) {
            let y = 0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32;
            self.luma.push(y.round().clamp(0.0, 255.0) as u8);
        }
    }

    fn detect(&self, width: usize, height: usize, inverted: bool) -> Option<DecodedCode> {
        let luma = &self.luma;
        let mut prepared = PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            let v = luma[y * width + x];
            if inverted { 255 - v } else { v }
        });

        let grids = prepared.detect_grids();
        trace!(grids = grids.len(), inverted, "Grid candidates");
        for grid in grids {
            match grid.decode() {
                Ok((_, payload)) => {
                    let b = &grid.bounds;
                    return Some(DecodedCode {
                        payload,
                        corners: [
                            Point { x: b[0].x, y: b[0].y },
                            Point { x: b[1].x, y: b[1].y },
                            Point { x: b[2].x, y: b[2].y },
                            Point { x: b[3].x, y: b[3].y },
                        ],
                        inverted,
                    });
                }
                Err(e) => debug!(error = ?e, "Grid decode failed"),
            }
        }
        None
    }
}

impl Decoder for RqrrDecoder {
    fn decode(
        &mut self,
        pixels: &RegionPixels<'_>,
        options: &DecodeOptions,
    ) -> ScanResult<Option<DecodedCode>> {
        let (w, h) = (pixels.width as usize, pixels.height as usize);
        if w == 0 || h == 0 {
            return Err(ScanError::decode(self.name(), "empty scan band"));
        }
        let needed = w * h * 4;
        if pixels.data.len() < needed {
            return Err(ScanError::decode(
                self.name(),
                format!(
                    "pixel buffer holds {} bytes, {}x{} RGBA needs {}",
                    pixels.data.len(),
                    w,
                    h,
                    needed
                ),
            ));
        }

        self.fill_luma(pixels);
        for &inverted in options.inversion_attempts.passes() {
            if let Some(code) = self.detect(w, h, inverted) {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        "rqrr"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::InversionAttempts;

    #[test]
    fn test_blank_band_has_no_code() {
        let data = vec![255u8; 60 * 20 * 4];
        let pixels = RegionPixels { data: &data, width: 60, height: 20 };
        let mut decoder = RqrrDecoder::new();
        let result = decoder.decode(&pixels, &DecodeOptions::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_short_buffer_is_an_error() {
        let data = vec![0u8; 10];
        let pixels = RegionPixels { data: &data, width: 60, height: 20 };
        let mut decoder = RqrrDecoder::new();
        let err = decoder.decode(&pixels, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn test_empty_band_is_an_error() {
        let pixels = RegionPixels { data: &[], width: 0, height: 20 };
        let mut decoder = RqrrDecoder::new();
        let options = DecodeOptions {
            inversion_attempts: InversionAttempts::AttemptBoth,
        };
        assert!(decoder.decode(&pixels, &options).is_err());
    }
}
