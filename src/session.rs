//! # Scan Session and Scan Loop
//!
//! The state machine at the heart of the viewfinder and the loop that drives it.
//!
//! ## State
//!
//! A session is either [`ScanState::Scanning`] or [`ScanState::Captured`]. The
//! captured image only exists inside the `Captured` variant, and
//! [`ScanSession::capture`] refuses a second transition, so "at most one
//! capture per session" holds by construction. Readers observe the state
//! through a `tokio::sync::watch` receiver.
//!
//! ## Loop
//!
//! ```text
//! loop {
//!     captured?          → stop
//!     cancelled?         → stop
//!     wait next frame    (FrameScheduler)
//!     tick:  video ready? → sample → extract band → decode → (hit) freeze
//! }
//! ```
//!
//! Ticks run one at a time and never overlap: the next frame is only awaited
//! after the previous tick returned. A video that is not ready yet makes the
//! tick a no-op; a decoder error is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scan_region::region::RegionGeometry;
use scan_region::{ScanRegion, Size};
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture::VideoElement;
use crate::decode::{DecodeOptions, DecodedCode, Decoder, RegionPixels};
use crate::error::{ScanError, ScanResult};
use crate::notify::{Notification, Notifier};
use crate::processing::{CaptureFreezer, CapturedImage, FrameSampler};

/// Observable state of a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    #[default]
    Scanning,
    Captured(CapturedImage),
}

impl ScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning)
    }

    pub fn captured(&self) -> Option<&CapturedImage> {
        match self {
            ScanState::Captured(image) => Some(image),
            ScanState::Scanning => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Scanning => "scanning",
            ScanState::Captured(_) => "captured",
        }
    }
}

/// Single writer of a session's [`ScanState`].
#[derive(Debug)]
pub struct ScanSession {
    state: watch::Sender<ScanState>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ScanState::Scanning);
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.borrow().is_scanning()
    }

    pub fn snapshot(&self) -> ScanState {
        self.state.borrow().clone()
    }

    /// Move from `Scanning` to `Captured(image)`.
    ///
    /// # Errors
    ///
    /// `ScanError::State` when the session already captured; the image is
    /// dropped and the existing capture is kept.
    pub fn capture(&self, image: CapturedImage) -> ScanResult<()> {
        let changed = self.state.send_if_modified(move |state| {
            if !state.is_scanning() {
                return false;
            }
            *state = ScanState::Captured(image);
            true
        });
        if changed {
            Ok(())
        } else {
            Err(ScanError::state(
                "captured",
                "capture",
                "a session captures at most one image",
            ))
        }
    }
}

/// Source of frame callbacks. Each `next_frame` resolves once per tick.
#[async_trait]
pub trait FrameScheduler: Send {
    async fn next_frame(&mut self);
}

/// Display-rate frame callbacks backed by a tokio interval. Late callbacks
/// are skipped rather than queued.
#[derive(Debug)]
pub struct FrameClock {
    period: Duration,
    interval: Option<Interval>,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl FrameScheduler for FrameClock {
    async fn next_frame(&mut self) {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session already captured; nothing done.
    Stopped,
    /// No stream or the stream has no usable frame yet.
    NotReady,
    /// Frame scanned, no code in the band.
    NoCode,
    /// Decoder or region extraction failed; frame skipped.
    Skipped,
    /// Code decoded and frame frozen.
    Captured,
}

/// Per-loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub ticks: u64,
    pub frames_sampled: u64,
    pub misses: u64,
    pub decode_errors: u64,
    pub skipped: u64,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Captured,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub outcome: LoopOutcome,
    pub stats: ScanStats,
}

/// Drives one session from mount until capture or cancellation.
pub struct ScanLoop {
    video: VideoElement,
    session: ScanSession,
    sampler: FrameSampler,
    freezer: CaptureFreezer,
    decoder: Box<dyn Decoder>,
    options: DecodeOptions,
    geometry: RegionGeometry,
    notifier: Arc<dyn Notifier>,
    scheduler: Box<dyn FrameScheduler>,
    stats: ScanStats,
}

impl ScanLoop {
    pub fn new(
        video: VideoElement,
        session: ScanSession,
        decoder: Box<dyn Decoder>,
        notifier: Arc<dyn Notifier>,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Self {
        Self {
            video,
            session,
            sampler: FrameSampler::new(),
            freezer: CaptureFreezer::new(),
            decoder,
            options: DecodeOptions::default(),
            geometry: RegionGeometry::default(),
            notifier,
            scheduler,
            stats: ScanStats::default(),
        }
    }

    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_geometry(mut self, geometry: RegionGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Run until the session captures or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> ScanReport {
        info!(decoder = self.decoder.name(), "Scan loop started");

        let outcome = loop {
            if !self.session.is_scanning() {
                break LoopOutcome::Captured;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break LoopOutcome::Cancelled,
                _ = self.scheduler.next_frame() => {}
            }
            self.tick();
        };

        info!(
            ?outcome,
            ticks = self.stats.ticks,
            frames = self.stats.frames_sampled,
            decode_errors = self.stats.decode_errors,
            "Scan loop finished"
        );
        ScanReport {
            outcome,
            stats: self.stats,
        }
    }

    /// One frame callback's worth of work.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.session.is_scanning() {
            return TickOutcome::Stopped;
        }
        self.stats.ticks += 1;

        let Some(frame) = self.video.current_frame() else {
            return TickOutcome::NotReady;
        };
        let Some(size) = self.sampler.sample(&frame) else {
            return TickOutcome::NotReady;
        };
        self.stats.frames_sampled += 1;

        let region = ScanRegion::centered_with(size, self.geometry);
        let (pixels, band) = match self.sampler.extract(&region) {
            Ok(extracted) => extracted,
            Err(e) => {
                debug!(error = %e, w = size.w, h = size.h, "Scan band unavailable");
                self.stats.skipped += 1;
                return TickOutcome::Skipped;
            }
        };

        let decoded = self.decoder.decode(
            &RegionPixels {
                data: &pixels,
                width: band.w,
                height: band.h,
            },
            &self.options,
        );
        match decoded {
            Ok(None) => {
                self.stats.misses += 1;
                TickOutcome::NoCode
            }
            Ok(Some(code)) => self.freeze(size, &region, code),
            Err(e) => {
                warn!(error = %e, decoder = self.decoder.name(), "Decode failed, skipping frame");
                self.stats.decode_errors += 1;
                TickOutcome::Skipped
            }
        }
    }

    fn freeze(&mut self, size: Size, region: &ScanRegion, code: DecodedCode) -> TickOutcome {
        let image = match self.freezer.freeze(self.sampler.working(), size, region, code) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "Failed to freeze capture, scanning continues");
                self.stats.skipped += 1;
                return TickOutcome::Skipped;
            }
        };

        let payload = image.payload().to_string();
        match self.session.capture(image) {
            Ok(()) => {
                info!(payload = %payload, w = region.width, h = region.height, "Code captured");
                self.notifier.notify(Notification::CodeDetected { payload });
                TickOutcome::Captured
            }
            Err(e) => {
                debug!(error = %e, "Capture refused");
                TickOutcome::Stopped
            }
        }
    }
}
