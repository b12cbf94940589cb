// # Camera Capture Source (nokhwa)
//
// Opens a local camera through nokhwa. The `Camera` object is not `Send` on
// every backend, so it lives on a dedicated thread that publishes the latest
// decoded frame into a shared slot. Stopping the track ends the thread, which
// stops the camera stream before exiting.
//
// Facing mode is matched against device names ("back", "rear", "front", ...)
// because desktop backends do not report which way a camera faces.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use async_trait::async_trait;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, CameraInfo, FrameFormat, RequestedFormat,
    RequestedFormatType, Resolution,
};
use nokhwa::{query, Camera};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::stream::{MediaTrack, PixelFormat, TrackHandle, VideoFrame, VideoStream};
use super::{CaptureSource, FacingMode, MediaConstraints};
use crate::error::{ScanError, ScanResult};

const TARGET_FPS: u32 = 30;

/// Live camera source.
#[derive(Debug, Clone, Default)]
pub struct CameraSource {
    /// Explicit device index; when `None` the device is picked by facing mode.
    pub index: Option<u32>,
}

impl CameraSource {
    pub fn new(index: Option<u32>) -> Self {
        Self { index }
    }

    fn pick_device(&self, facing: FacingMode) -> CameraIndex {
        if let Some(i) = self.index {
            return CameraIndex::Index(i);
        }
        let devices: Vec<CameraInfo> = query(ApiBackend::Auto).unwrap_or_default();
        let wanted: &[&str] = match facing {
            FacingMode::Environment => &["back", "rear", "environment", "world"],
            FacingMode::User => &["front", "user", "face"],
        };
        devices
            .iter()
            .find(|d| {
                let name = d.human_name().to_ascii_lowercase();
                wanted.iter().any(|w| name.contains(w))
            })
            .or_else(|| devices.first())
            .map(|d| d.index().clone())
            .unwrap_or(CameraIndex::Index(0))
    }
}

#[async_trait]
impl CaptureSource for CameraSource {
    async fn request(&self, constraints: &MediaConstraints) -> ScanResult<Box<dyn VideoStream>> {
        let index = self.pick_device(constraints.facing_mode);
        let device = index.to_string();
        let latest: Arc<Mutex<Option<VideoFrame>>> = Arc::new(Mutex::new(None));
        let track = TrackHandle::new(format!("camera-{}", device));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();

        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(constraints.ideal_width, constraints.ideal_height),
                FrameFormat::MJPEG,
                TARGET_FPS,
            ),
        ));

        let slot = latest.clone();
        let producer_track = track.clone();
        thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || capture_thread(index, format, slot, producer_track, ready_tx))
            .map_err(|e| ScanError::io("spawn camera thread", e))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                info!(device = %device, "Camera stream opened");
                Ok(Box::new(CameraStream { latest, track }))
            }
            Ok(Err(reason)) => Err(ScanError::capture_denied(device, reason)),
            Err(_) => Err(ScanError::capture_denied(
                device,
                "camera thread exited before opening the stream",
            )),
        }
    }

    fn name(&self) -> &str {
        "camera"
    }
}

fn capture_thread(
    index: CameraIndex,
    format: RequestedFormat,
    slot: Arc<Mutex<Option<VideoFrame>>>,
    track: Arc<TrackHandle>,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let mut camera = match Camera::new(index, format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(format!("Create camera: {e}")));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(format!("Open stream: {e}")));
        return;
    }
    if ready.send(Ok(())).is_err() {
        // Requester went away before the stream was handed over.
        let _ = camera.stop_stream();
        return;
    }

    while track.is_live() {
        let decoded = camera
            .frame()
            .and_then(|buffer| buffer.decode_image::<RgbFormat>());
        match decoded {
            Ok(img) => {
                let (w, h) = (img.width(), img.height());
                let frame = VideoFrame::new(img.into_raw(), w, h, PixelFormat::Rgb8);
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
            }
            Err(e) => warn!(error = %e, "Dropped camera frame"),
        }
    }

    if let Err(e) = camera.stop_stream() {
        warn!(error = %e, "Failed to stop camera stream");
    }
    debug!("Camera thread exited");
}

struct CameraStream {
    latest: Arc<Mutex<Option<VideoFrame>>>,
    track: Arc<TrackHandle>,
}

impl VideoStream for CameraStream {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone() as Arc<dyn MediaTrack>]
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.track.is_live() {
            return None;
        }
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
