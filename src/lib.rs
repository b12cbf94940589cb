//! # QR Viewfinder
//!
//! A scan-and-freeze viewfinder for matrix codes. Mounting a [`Viewfinder`]
//! acquires a video stream, samples each frame into a working buffer, decodes
//! the centered scan band and, on the first hit, freezes that band into a PNG
//! capture that can be shown or downloaded.
//!
//! ## Architecture
//!
//! - `capture`: video sources (camera, still images) and stream ownership
//! - `processing`: working-buffer sampling and capture freezing
//! - `decode`: the pluggable decoder seam and the `rqrr` backend
//! - `session`: the scanning/captured state machine and the scan loop
//! - `viewfinder`: mount/unmount lifecycle tying everything together
//! - `notify`: user notifications
//! - `config`: validated settings
//!
//! ## Example
//!
//! ```rust,no_run
//! use qr_viewfinder::Viewfinder;
//! use qr_viewfinder::capture::still::StillImageSource;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mounted = Viewfinder::builder()
//!     .source(StillImageSource::from_paths(vec!["code.png".into()]))
//!     .build()?
//!     .mount();
//!
//! if let Some(image) = mounted.captured().await {
//!     println!("{}", image.payload());
//!     mounted.download(std::path::Path::new("."))?;
//! }
//! mounted.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod decode;
pub mod error;
pub mod notify;
pub mod processing;
pub mod session;
pub mod viewfinder;

pub use error::{
    HasRecoverySuggestion, HasSeverity, Recoverable, Retryable, ScanError, ScanResult,
};

pub use scan_region::{ScanRegion, Size};

pub use processing::CapturedImage;
pub use session::{LoopOutcome, ScanReport, ScanState, ScanStats};
pub use viewfinder::{MountedViewfinder, Viewfinder, ViewfinderBuilder};

use capture::MediaConstraints;
use decode::DecodeOptions;
use scan_region::region::RegionGeometry;

/// Options for one viewfinder session.
///
/// Usually produced by
/// [`ScannerConfig::to_scan_options`](config::ScannerConfig::to_scan_options),
/// which validates them first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Constraints passed to the capture source on mount.
    pub constraints: MediaConstraints,

    /// Frame callbacks per second for the default [`session::FrameClock`].
    pub fps: u32,

    /// Options handed to the decoder on every tick.
    pub decode: DecodeOptions,

    /// Scan band formula.
    pub geometry: RegionGeometry,

    /// File name used by [`MountedViewfinder::download`].
    pub download_name: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        config::ScannerConfig::default().to_scan_options()
    }
}
