//! # Viewfinder Lifecycle
//!
//! Mounting a [`Viewfinder`] starts two tasks: one acquires the video stream,
//! the other runs the [`ScanLoop`]. The returned [`MountedViewfinder`] owns
//! both, exposes the session state, and tears everything down on
//! [`MountedViewfinder::unmount`] or drop.
//!
//! Teardown is safe at any point of acquisition. If the stream arrives after
//! unmount, the closed [`VideoElement`] hands it back to the acquisition task,
//! which releases it without touching the session or notifying anyone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ScanOptions;
use crate::capture::{CaptureSource, MediaConstraints, StreamHandle, VideoElement};
use crate::decode::{Decoder, RqrrDecoder};
use crate::error::{ScanError, ScanResult};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::processing::CapturedImage;
use crate::session::{FrameClock, FrameScheduler, ScanLoop, ScanReport, ScanSession, ScanState};

/// An unmounted scanner, ready to [`mount`](Viewfinder::mount).
pub struct Viewfinder {
    options: ScanOptions,
    source: Arc<dyn CaptureSource>,
    decoder: Box<dyn Decoder>,
    notifier: Arc<dyn Notifier>,
    scheduler: Box<dyn FrameScheduler>,
}

/// Builder for [`Viewfinder`]. Only the capture source is mandatory.
#[derive(Default)]
pub struct ViewfinderBuilder {
    options: Option<ScanOptions>,
    source: Option<Arc<dyn CaptureSource>>,
    decoder: Option<Box<dyn Decoder>>,
    notifier: Option<Arc<dyn Notifier>>,
    scheduler: Option<Box<dyn FrameScheduler>>,
}

impl ViewfinderBuilder {
    pub fn options(mut self, options: ScanOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn source<S: CaptureSource + 'static>(self, source: S) -> Self {
        self.shared_source(Arc::new(source))
    }

    pub fn shared_source(mut self, source: Arc<dyn CaptureSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn decoder<D: Decoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn scheduler<S: FrameScheduler + 'static>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    /// Defaults: [`RqrrDecoder`], [`TracingNotifier`], and a [`FrameClock`]
    /// at the configured frame rate.
    pub fn build(self) -> ScanResult<Viewfinder> {
        let source = self
            .source
            .ok_or_else(|| ScanError::config("source", "none", "a capture source is required"))?;
        let options = self.options.unwrap_or_default();
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Box::new(FrameClock::new(options.fps)));

        Ok(Viewfinder {
            source,
            decoder: self.decoder.unwrap_or_else(|| Box::new(RqrrDecoder::new())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            scheduler,
            options,
        })
    }
}

impl Viewfinder {
    pub fn builder() -> ViewfinderBuilder {
        ViewfinderBuilder::default()
    }

    /// Start acquisition and scanning. Must be called inside a tokio runtime.
    pub fn mount(self) -> MountedViewfinder {
        let lifetime = CancellationToken::new();
        let video = VideoElement::new();
        let session = ScanSession::new();
        let state = session.subscribe();

        info!(
            source = self.source.name(),
            facing = self.options.constraints.facing_mode.as_str(),
            "Mounting viewfinder"
        );

        let acquisition = tokio::spawn(acquire(
            self.source,
            self.options.constraints,
            video.clone(),
            self.notifier.clone(),
            lifetime.clone(),
        ));

        let scan = ScanLoop::new(
            video.clone(),
            session,
            self.decoder,
            self.notifier.clone(),
            self.scheduler,
        )
        .with_decode_options(self.options.decode)
        .with_geometry(self.options.geometry);
        let scan_loop = tokio::spawn(scan.run(lifetime.child_token()));

        MountedViewfinder {
            lifetime,
            video,
            state,
            notifier: self.notifier,
            download_name: self.options.download_name,
            acquisition: Some(acquisition),
            scan_loop: Some(scan_loop),
            unmounted: false,
        }
    }
}

async fn acquire(
    source: Arc<dyn CaptureSource>,
    constraints: MediaConstraints,
    video: VideoElement,
    notifier: Arc<dyn Notifier>,
    lifetime: CancellationToken,
) {
    debug!(source = source.name(), ?constraints, "Requesting stream");
    match source.request(&constraints).await {
        Ok(stream) => match video.attach(StreamHandle::new(stream)) {
            Ok(()) => info!(source = source.name(), "Stream attached"),
            Err(mut late) => {
                let stopped = late.release();
                debug!(stopped, "Stream arrived after unmount, released");
            }
        },
        Err(e) if lifetime.is_cancelled() => {
            debug!(error = %e, "Acquisition failed after unmount");
        }
        Err(e) => {
            warn!(error = %e, source = source.name(), "Stream acquisition failed");
            notifier.notify(Notification::CaptureDenied {
                reason: e.to_string(),
            });
        }
    }
}

/// A running viewfinder. Dropping it unmounts.
pub struct MountedViewfinder {
    lifetime: CancellationToken,
    video: VideoElement,
    state: watch::Receiver<ScanState>,
    notifier: Arc<dyn Notifier>,
    download_name: String,
    acquisition: Option<JoinHandle<()>>,
    scan_loop: Option<JoinHandle<ScanReport>>,
    unmounted: bool,
}

impl MountedViewfinder {
    pub fn state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.borrow().is_scanning()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.clone()
    }

    /// Whether a stream is currently attached to the video element.
    pub fn has_video(&self) -> bool {
        self.video.has_stream()
    }

    /// Wait for the capture. Resolves to `None` if the scan loop ends
    /// without one (unmount).
    pub async fn captured(&self) -> Option<CapturedImage> {
        let mut rx = self.state.clone();
        let waited = rx
            .wait_for(|state| !state.is_scanning())
            .await
            .map(|state| state.captured().cloned());
        match waited {
            Ok(captured) => captured,
            Err(_) => rx.borrow().captured().cloned(),
        }
    }

    /// Save the captured PNG into `dir` and notify `Downloaded`.
    ///
    /// # Errors
    ///
    /// `ScanError::State` while still scanning, `ScanError::Io` when the file
    /// cannot be written.
    pub fn download(&self, dir: &Path) -> ScanResult<PathBuf> {
        let state = self.state();
        let image = state
            .captured()
            .ok_or_else(|| ScanError::state("scanning", "download", "nothing captured yet"))?;
        let path = image.download(dir, &self.download_name)?;
        self.notifier.notify(Notification::Downloaded { path: path.clone() });
        Ok(path)
    }

    /// Stop scanning and release the stream. Idempotent.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;
        self.lifetime.cancel();
        let stopped = self.video.close();
        info!(stopped, "Viewfinder unmounted");
    }

    /// Unmount and wait for both tasks to finish.
    pub async fn shutdown(mut self) -> ScanResult<ScanReport> {
        self.unmount();

        let acquisition = self.acquisition.take();
        let scan_loop = self.scan_loop.take();
        let (acquired, report) = join(
            async move {
                match acquisition {
                    Some(handle) => handle.await,
                    None => Ok(()),
                }
            },
            async move {
                match scan_loop {
                    Some(handle) => handle.await.map(Some),
                    None => Ok(None),
                }
            },
        )
        .await;

        acquired.map_err(|e| ScanError::external("tokio", e).with_operation("acquisition"))?;
        report
            .map_err(|e| ScanError::external("tokio", e).with_operation("scan loop"))?
            .ok_or_else(|| ScanError::state("unmounted", "shutdown", "scan loop already joined"))
    }
}

impl Drop for MountedViewfinder {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::still::StillImageSource;

    #[test]
    fn test_builder_requires_source() {
        let err = Viewfinder::builder().build().err().unwrap();
        assert_eq!(err.category(), "config");
    }

    #[tokio::test]
    async fn test_unmount_is_idempotent() {
        let mut mounted = Viewfinder::builder()
            .source(StillImageSource::from_frames(Vec::new()))
            .build()
            .unwrap()
            .mount();
        mounted.unmount();
        mounted.unmount();
        let report = mounted.shutdown().await.unwrap();
        assert_eq!(report.outcome, crate::session::LoopOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_download_before_capture_is_refused() {
        let mounted = Viewfinder::builder()
            .source(StillImageSource::from_frames(Vec::new()))
            .build()
            .unwrap()
            .mount();
        let dir = tempfile::tempdir().unwrap();
        let err = mounted.download(dir.path()).unwrap_err();
        assert_eq!(err.category(), "state");
    }
}
