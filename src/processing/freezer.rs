//! # Capture Freezer
//!
//! Turns a successful decode into a shareable artifact: the scan band is
//! re-drawn from the working buffer (never from live video, so a frame that
//! advances mid-copy cannot tear the capture) into a capture buffer of its own,
//! encoded as PNG and wrapped in a `data:` URL.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fast_image_resize::Resizer;
use image::{ImageFormat, RgbaImage};
use scan_region::cpu::redraw_region;
use scan_region::{ScanRegion, Size};
use tracing::info;

use crate::decode::DecodedCode;
use crate::error::{ScanError, ScanResult};

/// Prefix of every data URL produced by the freezer.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Default file name used when a capture is downloaded.
pub const DEFAULT_DOWNLOAD_NAME: &str = "qr-scan.png";

/// The frozen result of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub code: DecodedCode,
    pub region: ScanRegion,
    pub width: u32,
    pub height: u32,
    data_url: String,
}

impl CapturedImage {
    /// Decoded text of the code.
    pub fn payload(&self) -> &str {
        &self.code.payload
    }

    /// `data:image/png;base64,...` serialization of the capture buffer.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Raw PNG bytes behind the data URL.
    pub fn png_bytes(&self) -> ScanResult<Vec<u8>> {
        let encoded = self
            .data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| ScanError::encoding("data url", "missing image/png prefix"))?;
        Ok(STANDARD.decode(encoded)?)
    }

    /// Write the PNG into `dir` as `file_name` and return the full path.
    pub fn download(&self, dir: &Path, file_name: &str) -> ScanResult<PathBuf> {
        let path = dir.join(file_name);
        let bytes = self.png_bytes()?;
        std::fs::write(&path, bytes).map_err(|e| {
            ScanError::io("download", e).with_path(path.display().to_string())
        })?;
        info!(path = %path.display(), "Capture downloaded");
        Ok(path)
    }
}

/// Encodes frozen scan bands.
pub struct CaptureFreezer {
    resizer: Resizer,
}

impl CaptureFreezer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Re-draw `region` of the working buffer into a fresh capture buffer and
    /// serialize it.
    pub fn freeze(
        &mut self,
        working: &[u8],
        size: Size,
        region: &ScanRegion,
        code: DecodedCode,
    ) -> ScanResult<CapturedImage> {
        let out = region.capture_size();
        let mut capture = vec![0u8; out.rgba_len()];
        redraw_region(&mut self.resizer, working, size, region, &mut capture)
            .map_err(|e| ScanError::region("redraw", e))?;

        let data_url = encode_png_data_url(capture, out)?;
        Ok(CapturedImage {
            code,
            region: *region,
            width: out.w,
            height: out.h,
            data_url,
        })
    }
}

impl Default for CaptureFreezer {
    fn default() -> Self {
        Self::new()
    }
}

/// PNG-encode an RGBA8 buffer and wrap it as a data URL.
pub fn encode_png_data_url(rgba: Vec<u8>, size: Size) -> ScanResult<String> {
    let img = RgbaImage::from_raw(size.w, size.h, rgba).ok_or_else(|| {
        ScanError::encoding("png", format!("buffer does not match {}x{}", size.w, size.h))
    })?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&png)))
}
