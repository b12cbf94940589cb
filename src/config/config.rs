//! # Scanner Configuration
//!
//! Configuration shared by the `viewfinder` binary and library callers. It is
//! the validated front door to [`ScanOptions`](crate::ScanOptions).
//!
//! ## Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `facing_mode` | `FacingMode` | environment, user | Requested camera |
//! | `ideal_width` | `u32` | > 0 | Width hint for the stream |
//! | `ideal_height` | `u32` | > 0 | Height hint for the stream |
//! | `fps` | `u32` | 1-240 | Frame-callback rate of the scan loop |
//! | `inversion` | `InversionAttempts` | 4 modes | Polarities tried by the decoder |
//! | `max_scan_width` | `f64` | > 0 | Hard cap on the scan band width (px) |
//! | `file_name` | `String` | `*.png` | Name used when a capture is downloaded |
//!
//! ## Examples
//!
//! ```rust
//! use qr_viewfinder::config::config::ScannerConfig;
//!
//! let config = ScannerConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let options = config.to_scan_options();
//! assert_eq!(options.fps, 60);
//! assert_eq!(options.download_name, "qr-scan.png");
//! ```

use scan_region::region::{DEFAULT_MAX_WIDTH, RegionGeometry};

use crate::capture::{FacingMode, MediaConstraints};
use crate::decode::{DecodeOptions, InversionAttempts};
use crate::error::{ScanError, ScanResult};
use crate::processing::DEFAULT_DOWNLOAD_NAME;

/// Highest frame-callback rate accepted by [`ScannerConfig::validate`].
pub const MAX_FPS: u32 = 240;

/// Configuration for a scanning session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Which camera to ask for. Sources without a notion of facing ignore it.
    pub facing_mode: FacingMode,

    /// Ideal stream width. A hint; the source picks the closest mode.
    pub ideal_width: u32,

    /// Ideal stream height. A hint; the source picks the closest mode.
    pub ideal_height: u32,

    /// Frame callbacks per second driving the scan loop.
    pub fps: u32,

    /// Decoder polarity passes.
    pub inversion: InversionAttempts,

    /// Upper bound on the scan band width in pixels. The band is otherwise
    /// 80% of the frame width.
    pub max_scan_width: f64,

    /// File name for downloaded captures.
    pub file_name: String,
}

impl Default for ScannerConfig {
    /// Default values:
    /// - `facing_mode`: environment (rear camera)
    /// - `ideal_width` x `ideal_height`: 1280 x 720
    /// - `fps`: 60 (display rate)
    /// - `inversion`: dont-invert
    /// - `max_scan_width`: 800
    /// - `file_name`: "qr-scan.png"
    fn default() -> Self {
        let constraints = MediaConstraints::default();
        Self {
            facing_mode: constraints.facing_mode,
            ideal_width: constraints.ideal_width,
            ideal_height: constraints.ideal_height,
            fps: 60,
            inversion: InversionAttempts::DontInvert,
            max_scan_width: DEFAULT_MAX_WIDTH,
            file_name: DEFAULT_DOWNLOAD_NAME.to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn new(
        facing_mode: FacingMode,
        ideal_width: u32,
        ideal_height: u32,
        fps: u32,
        inversion: InversionAttempts,
        file_name: String,
    ) -> Self {
        Self {
            facing_mode,
            ideal_width,
            ideal_height,
            fps,
            inversion,
            max_scan_width: DEFAULT_MAX_WIDTH,
            file_name,
        }
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// `ScanError::Config` naming the first offending field.
    pub fn validate(&self) -> ScanResult<()> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(ScanError::config(
                "fps",
                self.fps.to_string(),
                format!("must be between 1 and {}", MAX_FPS),
            ));
        }
        if self.ideal_width == 0 {
            return Err(ScanError::config("ideal_width", "0", "must be greater than 0"));
        }
        if self.ideal_height == 0 {
            return Err(ScanError::config("ideal_height", "0", "must be greater than 0"));
        }
        if !self.max_scan_width.is_finite() || self.max_scan_width <= 0.0 {
            return Err(ScanError::config(
                "max_scan_width",
                self.max_scan_width.to_string(),
                "must be greater than 0",
            ));
        }
        if self.file_name.trim().is_empty() {
            return Err(ScanError::config("file_name", "", "must not be empty"));
        }
        if !self.file_name.to_ascii_lowercase().ends_with(".png") {
            return Err(ScanError::config(
                "file_name",
                self.file_name.clone(),
                "captures are PNG, use a .png name",
            ));
        }
        Ok(())
    }

    pub fn to_scan_options(&self) -> crate::ScanOptions {
        crate::ScanOptions {
            constraints: MediaConstraints {
                facing_mode: self.facing_mode,
                ideal_width: self.ideal_width,
                ideal_height: self.ideal_height,
            },
            fps: self.fps,
            decode: DecodeOptions {
                inversion_attempts: self.inversion,
            },
            geometry: RegionGeometry {
                max_width: self.max_scan_width,
                ..RegionGeometry::default()
            },
            download_name: self.file_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.facing_mode, FacingMode::Environment);
        assert_eq!((config.ideal_width, config.ideal_height), (1280, 720));
        assert_eq!(config.fps, 60);
        assert_eq!(config.file_name, "qr-scan.png");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        config.fps = 0;
        assert!(config.validate().is_err());
        config.fps = MAX_FPS + 1;
        assert!(config.validate().is_err());
        config.fps = 30;

        config.ideal_height = 0;
        assert!(config.validate().is_err());
        config.ideal_height = 720;

        config.max_scan_width = f64::NAN;
        assert!(config.validate().is_err());
        config.max_scan_width = 800.0;

        config.file_name = "  ".to_string();
        assert!(config.validate().is_err());
        config.file_name = "scan.jpg".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "config");
        config.file_name = "Scan.PNG".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_scan_options() {
        let config = ScannerConfig::new(
            FacingMode::User,
            640,
            480,
            30,
            InversionAttempts::AttemptBoth,
            "out.png".to_string(),
        );
        let options = config.to_scan_options();
        assert_eq!(options.constraints.facing_mode, FacingMode::User);
        assert_eq!(options.constraints.ideal_width, 640);
        assert_eq!(options.fps, 30);
        assert_eq!(options.decode.inversion_attempts, InversionAttempts::AttemptBoth);
        assert_eq!(options.geometry, RegionGeometry::default());
        assert_eq!(options.download_name, "out.png");
    }
}
