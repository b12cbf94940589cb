// # Capture Module
//
// Video sources for the viewfinder. A source turns a set of constraints into a
// live stream; the stream exposes its tracks and the latest decoded frame.
//
// - `stream`: frames, tracks, the owning `StreamHandle` and the `VideoElement`
// - `still`: replays image files (or in-memory frames) as a stream
// - `camera`: live camera through nokhwa (feature `camera`)

#[cfg(feature = "camera")]
pub mod camera;
pub mod still;
pub mod stream;

use async_trait::async_trait;

use crate::error::ScanResult;

pub use stream::{
    MediaTrack, PixelFormat, StreamHandle, TrackHandle, VideoElement, VideoFrame, VideoStream,
};

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, pointing away from the user.
    #[default]
    Environment,
    /// Front camera, pointing at the user.
    User,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            other => Err(format!(
                "Invalid facing mode: {}. Use: environment, user",
                other
            )),
        }
    }
}

/// Constraints passed to [`CaptureSource::request`]. Width and height are
/// hints; sources pick the closest mode they support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Abstract interface for video sources.
/// Enables pluggable capture backends (camera, still images, test doubles).
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Acquire a stream matching `constraints`.
    ///
    /// # Errors
    ///
    /// `ScanError::CaptureDenied` when permission is refused or no device is
    /// available.
    async fn request(&self, constraints: &MediaConstraints) -> ScanResult<Box<dyn VideoStream>>;

    /// Human-readable name used in logs and error messages.
    fn name(&self) -> &str {
        "capture source"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints_prefer_rear_720p() {
        let c = MediaConstraints::default();
        assert_eq!(c.facing_mode, FacingMode::Environment);
        assert_eq!((c.ideal_width, c.ideal_height), (1280, 720));
    }

    #[test]
    fn test_facing_mode_parse() {
        assert_eq!("Environment".parse::<FacingMode>(), Ok(FacingMode::Environment));
        assert_eq!("front".parse::<FacingMode>(), Ok(FacingMode::User));
        assert!("sideways".parse::<FacingMode>().is_err());
    }
}
