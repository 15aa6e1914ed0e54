// SPDX-License-Identifier: GPL-3.0-only

//! Frame routing from the capture thread to the presentation side
//!
//! ```text
//!  driver capture thread                 │  UI thread
//!                                        │
//!  on_amplitude / on_blobs               │
//!     │ snapshot mode (ModeCell)         │
//!     │ drop if the mode does not        │
//!     │ render this kind of frame        │
//!     │ validate length (amplitude)      │
//!     ▼                                  │
//!  TaggedFrame ──► watch (latest wins) ──┼──► Presenter
//!                                        │      drop if tag != current mode
//!                                        │      render into RgbaImage
//! ```
//!
//! The capture thread never touches presentation buffers. Frames that arrive
//! faster than the UI drains them replace each other; only the newest one is
//! rendered.

pub mod present;
pub mod surface;

pub use present::{PresentedView, Presenter};
pub use surface::{DrawingSurface, draw_blob_overlay};

use crate::backends::FrameSink;
use crate::constants::timing;
use crate::mode::{Mode, ModeCell};
use crate::session::{Resolution, ResolutionCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Frame content as delivered by the driver
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// ARGB pixels, `resolution.pixel_count()` entries
    Amplitude {
        pixels: Arc<[u32]>,
        resolution: Resolution,
    },
    /// Flat `(x, y)` pairs; a trailing odd value is ignored downstream
    Blobs(Arc<[i32]>),
}

/// A frame tagged with the mode that was active when it arrived
#[derive(Debug, Clone)]
pub struct TaggedFrame {
    pub mode: Mode,
    pub sequence: u64,
    pub captured_at: Instant,
    pub payload: FramePayload,
}

/// Counters for routed frames
#[derive(Debug, Default)]
pub struct RouterStats {
    forwarded: AtomicU64,
    inactive: AtomicU64,
    malformed: AtomicU64,
}

/// Snapshot of [`RouterStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterCounts {
    pub forwarded: u64,
    /// Dropped because the current mode does not render that frame kind
    pub inactive: u64,
    /// Dropped because the session is closed or the buffer has the wrong length
    pub malformed: u64,
}

impl RouterStats {
    pub fn snapshot(&self) -> RouterCounts {
        RouterCounts {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            inactive: self.inactive.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Driver callback sink that forwards frames to the UI side
pub struct FrameRouter {
    mode: ModeCell,
    resolution: ResolutionCell,
    sender: watch::Sender<Option<TaggedFrame>>,
    sequence: AtomicU64,
    stats: RouterStats,
}

impl FrameRouter {
    pub fn new(mode: ModeCell, resolution: ResolutionCell) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            mode,
            resolution,
            sender,
            sequence: AtomicU64::new(0),
            stats: RouterStats::default(),
        }
    }

    /// New receiving end for a presenter
    pub fn subscribe(&self) -> watch::Receiver<Option<TaggedFrame>> {
        self.sender.subscribe()
    }

    pub fn mode_cell(&self) -> &ModeCell {
        &self.mode
    }

    pub fn stats(&self) -> RouterCounts {
        self.stats.snapshot()
    }

    fn forward(&self, mode: Mode, payload: FramePayload) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        if sequence.is_multiple_of(timing::FRAME_LOG_INTERVAL) {
            trace!(sequence, %mode, "Frame forwarded");
        }
        self.sender.send_replace(Some(TaggedFrame {
            mode,
            sequence,
            captured_at: Instant::now(),
            payload,
        }));
    }

    fn drop_inactive(&self, mode: Option<Mode>, kind: &'static str) {
        let dropped = self.stats.inactive.fetch_add(1, Ordering::Relaxed);
        if dropped.is_multiple_of(timing::FRAME_LOG_INTERVAL) {
            debug!(?mode, kind, dropped = dropped + 1, "Frame not rendered in current mode");
        }
    }
}

impl FrameSink for FrameRouter {
    fn on_amplitude(&self, pixels: Vec<u32>) {
        let mode = self.mode.load();
        let Some(mode) = mode.filter(|m| m.renders_amplitude()) else {
            self.drop_inactive(mode, "amplitude");
            return;
        };

        let Some(resolution) = self.resolution.load() else {
            self.stats.malformed.fetch_add(1, Ordering::Relaxed);
            warn!("Amplitude frame without an open session");
            return;
        };
        if pixels.len() != resolution.pixel_count() {
            let dropped = self.stats.malformed.fetch_add(1, Ordering::Relaxed);
            if dropped.is_multiple_of(timing::FRAME_LOG_INTERVAL) {
                warn!(
                    got = pixels.len(),
                    expected = resolution.pixel_count(),
                    %resolution,
                    "Unexpected amplitude buffer size"
                );
            }
            return;
        }

        self.forward(
            mode,
            FramePayload::Amplitude {
                pixels: Arc::from(pixels),
                resolution,
            },
        );
    }

    fn on_blobs(&self, descriptors: Vec<i32>) {
        let mode = self.mode.load();
        let Some(mode) = mode.filter(|m| m.renders_blobs()) else {
            self.drop_inactive(mode, "blobs");
            return;
        };
        self.forward(mode, FramePayload::Blobs(Arc::from(descriptors)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(mode: Mode) -> (FrameRouter, ResolutionCell) {
        let resolution = ResolutionCell::new();
        resolution.store(Some(Resolution::new(4, 2)));
        (FrameRouter::new(ModeCell::new(mode), resolution.clone()), resolution)
    }

    #[test]
    fn test_amplitude_dropped_in_calibration_mode() {
        let (router, _) = router(Mode::Calibration);
        let receiver = router.subscribe();
        router.on_amplitude(vec![0; 8]);
        assert!(receiver.borrow().is_none());
        assert_eq!(router.stats().inactive, 1);
    }

    #[test]
    fn test_blobs_only_forwarded_in_test_mode() {
        let (router, _) = router(Mode::AmplitudeView);
        let receiver = router.subscribe();
        router.on_blobs(vec![10, 20]);
        assert!(receiver.borrow().is_none());

        router.mode_cell().store(Mode::Test);
        router.on_blobs(vec![10, 20]);
        let frame = receiver.borrow().clone().unwrap();
        assert_eq!(frame.mode, Mode::Test);
        assert!(matches!(frame.payload, FramePayload::Blobs(ref b) if b.len() == 2));
    }

    #[test]
    fn test_wrong_length_is_malformed() {
        let (router, _) = router(Mode::DepthView);
        let receiver = router.subscribe();
        router.on_amplitude(vec![0; 7]);
        assert!(receiver.borrow().is_none());
        assert_eq!(router.stats().malformed, 1);
    }

    #[test]
    fn test_no_resolution_means_no_frames() {
        let (router, resolution) = router(Mode::DepthView);
        resolution.store(None);
        router.on_amplitude(vec![0; 8]);
        assert_eq!(router.stats().forwarded, 0);
    }

    #[test]
    fn test_latest_frame_wins() {
        let (router, _) = router(Mode::AmplitudeView);
        let receiver = router.subscribe();
        router.on_amplitude(vec![1; 8]);
        router.on_amplitude(vec![2; 8]);
        let frame = receiver.borrow().clone().unwrap();
        assert_eq!(frame.sequence, 1);
        let FramePayload::Amplitude { pixels, .. } = frame.payload else {
            panic!("expected amplitude");
        };
        assert_eq!(pixels[0], 2);
    }
}
