//! Common test utilities for the viewfinder integration tests
//!
//! Mock capture sources, counting decoders, a zero-delay frame scheduler and a
//! QR frame renderer.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qr_viewfinder::capture::{
    CaptureSource, MediaConstraints, MediaTrack, PixelFormat, TrackHandle, VideoFrame, VideoStream,
};
use qr_viewfinder::decode::{DecodeOptions, DecodedCode, Decoder, Point, RegionPixels};
use qr_viewfinder::session::FrameScheduler;
use qr_viewfinder::{ScanError, ScanResult};
use qrcode::{Color, QrCode};
use tokio::sync::Notify;

/// Stream serving the same frame on every read.
pub struct FixedStream {
    frame: VideoFrame,
    track: Arc<TrackHandle>,
}

impl VideoStream for FixedStream {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone() as Arc<dyn MediaTrack>]
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        self.track.is_live().then(|| self.frame.clone())
    }
}

/// What a [`MockSource`] does when asked for a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquisition {
    Grant,
    Deny,
}

/// Capture source with an optional gate. While gated, `request` stays pending
/// until [`MockSource::open_gate`] is called.
pub struct MockSource {
    frame: VideoFrame,
    outcome: Acquisition,
    gate: Option<Arc<Notify>>,
    track: Arc<TrackHandle>,
    requests: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn granting(frame: VideoFrame) -> Self {
        Self {
            frame,
            outcome: Acquisition::Grant,
            gate: None,
            track: TrackHandle::new("mock-video"),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denying() -> Self {
        Self {
            outcome: Acquisition::Deny,
            ..Self::granting(blank_frame(64, 48))
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Track handed out with the stream.
    pub fn track(&self) -> Arc<TrackHandle> {
        self.track.clone()
    }

    pub fn requests(&self) -> Arc<AtomicUsize> {
        self.requests.clone()
    }

    /// Handle that releases a pending `request`.
    pub fn gate(&self) -> Option<Arc<Notify>> {
        self.gate.clone()
    }
}

#[async_trait]
impl CaptureSource for MockSource {
    async fn request(&self, _constraints: &MediaConstraints) -> ScanResult<Box<dyn VideoStream>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.outcome {
            Acquisition::Grant => Ok(Box::new(FixedStream {
                frame: self.frame.clone(),
                track: self.track.clone(),
            })),
            Acquisition::Deny => Err(ScanError::capture_denied("mock", "permission denied")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Canned decoder behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Hit,
    Miss,
    Fail,
}

/// Decoder returning a fixed verdict and counting calls.
pub struct ScriptedDecoder {
    verdict: Verdict,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDecoder {
    pub fn new(verdict: Verdict) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                verdict,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(
        &mut self,
        _pixels: &RegionPixels<'_>,
        _options: &DecodeOptions,
    ) -> ScanResult<Option<DecodedCode>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.verdict {
            Verdict::Hit => Ok(Some(DecodedCode {
                payload: format!("payload-{}", n),
                corners: [Point { x: 0, y: 0 }; 4],
                inverted: false,
            })),
            Verdict::Miss => Ok(None),
            Verdict::Fail => Err(ScanError::decode("scripted", "corrupt input")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Wraps a real decoder and counts calls.
pub struct Counting<D> {
    inner: D,
    calls: Arc<AtomicUsize>,
}

impl<D: Decoder> Counting<D> {
    pub fn new(inner: D) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl<D: Decoder> Decoder for Counting<D> {
    fn decode(
        &mut self,
        pixels: &RegionPixels<'_>,
        options: &DecodeOptions,
    ) -> ScanResult<Option<DecodedCode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(pixels, options)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Frame callbacks with no delay; each tick yields to the runtime once.
pub struct YieldScheduler;

#[async_trait]
impl FrameScheduler for YieldScheduler {
    async fn next_frame(&mut self) {
        tokio::task::yield_now().await;
    }
}

pub fn blank_frame(width: u32, height: u32) -> VideoFrame {
    VideoFrame::new(
        vec![255u8; (width * height * 4) as usize],
        width,
        height,
        PixelFormat::Rgba8,
    )
}

/// Render `payload` as a QR code with its top-left corner at (`left`, `top`)
/// on a white RGBA frame.
pub fn qr_frame_at(
    payload: &str,
    width: u32,
    height: u32,
    left: u32,
    top: u32,
    module_px: u32,
    inverted: bool,
) -> VideoFrame {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let (dark, light) = if inverted { (255u8, 0u8) } else { (0u8, 255u8) };

    let mut data = vec![light; (width * height * 4) as usize];
    for px in data.chunks_exact_mut(4) {
        px[3] = 255;
    }
    // Quiet zone of four modules around the symbol.
    let quiet = 4 * module_px;
    for my in 0..modules {
        for mx in 0..modules {
            let v = match colors[(my * modules + mx) as usize] {
                Color::Dark => dark,
                Color::Light => light,
            };
            for dy in 0..module_px {
                for dx in 0..module_px {
                    let x = left + quiet + mx * module_px + dx;
                    let y = top + quiet + my * module_px + dy;
                    if x < width && y < height {
                        let i = ((y * width + x) * 4) as usize;
                        data[i..i + 3].copy_from_slice(&[v, v, v]);
                    }
                }
            }
        }
    }
    VideoFrame::new(data, width, height, PixelFormat::Rgba8)
}

/// QR code centered in the frame.
pub fn qr_frame(payload: &str, width: u32, height: u32, inverted: bool) -> VideoFrame {
    let module_px = 5;
    let side = (QrCode::new(payload.as_bytes()).unwrap().width() as u32 + 8) * module_px;
    qr_frame_at(
        payload,
        width,
        height,
        (width - side) / 2,
        (height - side) / 2,
        module_px,
        inverted,
    )
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {}", what);
}
