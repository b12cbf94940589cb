//! # Processing Module
//!
//! Per-tick frame work: sampling the video into the working buffer and
//! freezing the scan band once a code is found.

pub mod freezer;
pub mod sampler;

// Re-export commonly used types for convenience
pub use freezer::{CaptureFreezer, CapturedImage, DEFAULT_DOWNLOAD_NAME, PNG_DATA_URL_PREFIX};
pub use sampler::FrameSampler;
