// # Streams, Tracks and the Video Element
//
// Ownership model for an acquired camera:
//
// ```text
// CaptureSource ──request──▶ Box<dyn VideoStream> ──▶ StreamHandle ──attach──▶ VideoElement
//                                                       (stops live tracks        (slot read by
//                                                        once, also on drop)       the scan loop)
// ```
//
// A `VideoElement` is closed exactly once, on unmount. Closing releases the
// attached stream; a stream that arrives after closing is handed back to the
// caller so it can be released without touching the element.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Pixel layout of a [`VideoFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// One decoded video frame.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row; at least `width * bytes_per_pixel`.
    pub stride: usize,
    pub format: PixelFormat,
    pub pts_ns: Option<u64>,
}

impl VideoFrame {
    /// Tightly packed frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data: Arc::new(data),
            width,
            height,
            stride: width as usize * format.bytes_per_pixel(),
            format,
            pts_ns: None,
        }
    }

    /// True when the buffer holds `height` rows of `stride` bytes and the frame
    /// has a non-zero area.
    pub fn is_complete(&self) -> bool {
        let row = self.width as usize * self.format.bytes_per_pixel();
        self.width > 0
            && self.height > 0
            && self.stride >= row
            && self.data.len() >= self.stride * (self.height as usize - 1) + row
    }
}

/// A single track of a stream (video only for this crate).
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;
    /// False once the track has been stopped.
    fn is_live(&self) -> bool;
    /// Stop the track and release the device behind it.
    fn stop(&self);
}

/// A live stream handed out by a [`super::CaptureSource`].
pub trait VideoStream: Send + Sync {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Latest frame, or `None` while the stream is not producing frames yet.
    fn current_frame(&self) -> Option<VideoFrame>;
}

/// Reusable [`MediaTrack`] backed by atomics. Sources share it with their
/// producer side to learn when the consumer stopped the track.
#[derive(Debug)]
pub struct TrackHandle {
    id: String,
    live: AtomicBool,
    stop_calls: AtomicUsize,
}

impl TrackHandle {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            live: AtomicBool::new(true),
            stop_calls: AtomicUsize::new(0),
        })
    }

    /// Number of times `stop` was called, including calls on a stopped track.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl MediaTrack for TrackHandle {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
    }
}

/// Exclusive owner of an acquired stream.
///
/// [`StreamHandle::release`] stops every live track once; later calls and the
/// `Drop` impl are no-ops.
pub struct StreamHandle {
    stream: Box<dyn VideoStream>,
    released: bool,
}

impl StreamHandle {
    pub fn new(stream: Box<dyn VideoStream>) -> Self {
        Self {
            stream,
            released: false,
        }
    }

    pub fn current_frame(&self) -> Option<VideoFrame> {
        if self.released {
            return None;
        }
        self.stream.current_frame()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop all live tracks. Returns how many tracks were stopped by this call.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;

        let mut stopped = 0;
        for track in self.stream.tracks() {
            if track.is_live() {
                track.stop();
                stopped += 1;
            }
        }
        debug!(stopped, "Stream released");
        stopped
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct ElementSlot {
    stream: Option<StreamHandle>,
    closed: bool,
}

/// Shared slot the acquisition task writes and the scan loop reads.
#[derive(Clone, Default)]
pub struct VideoElement {
    slot: Arc<Mutex<ElementSlot>>,
}

impl VideoElement {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ElementSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a freshly acquired stream.
    ///
    /// # Errors
    ///
    /// Returns the handle unchanged when the element is already closed; the
    /// caller owns it and must release it.
    pub fn attach(&self, handle: StreamHandle) -> Result<(), StreamHandle> {
        let mut slot = self.lock();
        if slot.closed {
            return Err(handle);
        }
        // A second attach replaces the first stream, which is released on drop.
        slot.stream = Some(handle);
        Ok(())
    }

    /// Latest frame of the attached stream, `None` while nothing is attached or
    /// the stream is not ready.
    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.lock().stream.as_ref().and_then(StreamHandle::current_frame)
    }

    pub fn has_stream(&self) -> bool {
        self.lock().stream.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Close the element and release the attached stream. Idempotent; returns
    /// the number of tracks stopped by this call.
    pub fn close(&self) -> usize {
        let taken = {
            let mut slot = self.lock();
            slot.closed = true;
            slot.stream.take()
        };
        taken.map(|mut handle| handle.release()).unwrap_or(0)
    }
}
