// SPDX-License-Identifier: MIT
//! # scan-region: Scan-Band Geometry and Pixel Extraction
//!
//! This crate owns the only piece of arithmetic the viewfinder depends on for
//! compatibility: where the scan band sits inside a video frame, and how its
//! pixels are pulled out of an RGBA raster.
//!
//! ## Key Components
//!
//! - [`region`]: the centered 3:1 scan band computed from the video dimensions
//! - [`cpu`]: RGBA8 extraction (integer rect, canvas `getImageData` semantics)
//!   and the fractional re-draw used when a frame is frozen
//!
//! ## Geometry
//!
//! ```text
//! scan_width  = min(video_width * 0.8, 800)
//! scan_height = scan_width / 3
//! x = (video_width  - scan_width)  / 2
//! y = (video_height - scan_height) / 2
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use scan_region::cpu::extract_rgba;
//! use scan_region::region::{ScanRegion, Size};
//!
//! let video = Size { w: 1280, h: 720 };
//! let region = ScanRegion::centered(video);
//! assert_eq!(region.width, 800.0);
//!
//! let frame = vec![0u8; (video.w * video.h * 4) as usize];
//! let band = extract_rgba(&frame, video, region.pixel_rect()).unwrap();
//! assert_eq!(band.len(), 800 * 266 * 4);
//! ```

pub mod cpu;
pub mod region;

pub use cpu::RegionError;
pub use region::{PixelRect, ScanRegion, Size};
