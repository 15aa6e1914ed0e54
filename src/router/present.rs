// SPDX-License-Identifier: GPL-3.0-only

//! UI-side presentation of routed frames
//!
//! The presenter owns the destination images. The camera image is allocated
//! the first time an amplitude frame arrives and reused while the resolution
//! stays the same; the projector overlay is allocated once.

use super::surface::draw_blob_overlay;
use super::{FramePayload, TaggedFrame};
use crate::errors::{AppError, AppResult};
use crate::mode::{Mode, ModeCell};
use crate::session::Resolution;
use image::{Rgba, RgbaImage};
use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, info};

/// What the last presented frame updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentedView {
    /// Camera image refreshed from an amplitude frame
    Camera { sequence: u64 },
    /// Projector overlay redrawn with this many markers
    Overlay { sequence: u64, markers: usize },
}

/// Renders the newest routed frame on the UI thread
pub struct Presenter {
    receiver: watch::Receiver<Option<TaggedFrame>>,
    mode: ModeCell,
    projector_size: (u32, u32),
    camera: Option<RgbaImage>,
    overlay: Option<RgbaImage>,
    last_view: Option<PresentedView>,
    allocations: usize,
    presented: u64,
    stale: u64,
}

impl Presenter {
    pub fn new(
        receiver: watch::Receiver<Option<TaggedFrame>>,
        mode: ModeCell,
        projector_size: (u32, u32),
    ) -> Self {
        Self {
            receiver,
            mode,
            projector_size,
            camera: None,
            overlay: None,
            last_view: None,
            allocations: 0,
            presented: 0,
            stale: 0,
        }
    }

    /// Render the newest frame if one arrived since the last call
    pub fn present_pending(&mut self) -> Option<PresentedView> {
        match self.receiver.has_changed() {
            Ok(true) => self.present_current(),
            _ => None,
        }
    }

    /// Wait for the next frame that belongs to the current mode and render it
    ///
    /// Returns `None` once the router is gone.
    pub async fn next_frame(&mut self) -> Option<PresentedView> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(view) = self.present_current() {
                return Some(view);
            }
        }
    }

    fn present_current(&mut self) -> Option<PresentedView> {
        let frame = self.receiver.borrow_and_update().clone()?;

        // Tagged under a mode the user already left
        if self.mode.load() != Some(frame.mode) {
            self.stale += 1;
            debug!(tag = %frame.mode, current = ?self.mode.load(), "Discarding stale frame");
            return None;
        }

        let view = match &frame.payload {
            FramePayload::Amplitude { pixels, resolution } => {
                self.render_amplitude(pixels, *resolution);
                PresentedView::Camera {
                    sequence: frame.sequence,
                }
            }
            FramePayload::Blobs(descriptors) => {
                let markers = self.render_blobs(descriptors);
                PresentedView::Overlay {
                    sequence: frame.sequence,
                    markers,
                }
            }
        };
        self.presented += 1;
        self.last_view = Some(view);
        Some(view)
    }

    fn render_amplitude(&mut self, pixels: &[u32], resolution: Resolution) {
        let fits = self
            .camera
            .as_ref()
            .is_some_and(|image| image.dimensions() == (resolution.width, resolution.height));
        if !fits {
            info!(%resolution, "Allocating camera image");
            self.camera = Some(RgbaImage::new(resolution.width, resolution.height));
            self.allocations += 1;
        }
        let Some(image) = self.camera.as_mut() else {
            return;
        };
        for (dst, argb) in image.pixels_mut().zip(pixels) {
            *dst = argb_to_rgba(*argb);
        }
    }

    fn render_blobs(&mut self, descriptors: &[i32]) -> usize {
        let (width, height) = self.projector_size;
        let overlay = self.overlay.get_or_insert_with(|| {
            info!(width, height, "Allocating projector overlay");
            RgbaImage::new(width, height)
        });
        draw_blob_overlay(overlay, descriptors)
    }

    /// Camera image as last rendered
    pub fn camera_image(&self) -> Option<&RgbaImage> {
        self.camera.as_ref()
    }

    /// Projector overlay as last rendered
    pub fn overlay_image(&self) -> Option<&RgbaImage> {
        self.overlay.as_ref()
    }

    pub fn last_view(&self) -> Option<PresentedView> {
        self.last_view
    }

    /// Camera image allocations so far
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Frames discarded because their mode tag was outdated
    pub fn stale(&self) -> u64 {
        self.stale
    }

    /// Mode the presenter renders for
    pub fn current_mode(&self) -> Option<Mode> {
        self.mode.load()
    }

    /// Write the image behind the last presented view as PNG
    pub fn save_snapshot(&self, path: &Path) -> AppResult<()> {
        let image = match self.last_view {
            Some(PresentedView::Camera { .. }) => self.camera.as_ref(),
            Some(PresentedView::Overlay { .. }) => self.overlay.as_ref(),
            None => None,
        }
        .ok_or_else(|| AppError::Other("Nothing has been presented yet".to_string()))?;

        image
            .save(path)
            .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Snapshot saved");
        Ok(())
    }
}

/// Packed `0xAARRGGBB` to an RGBA pixel
pub fn argb_to_rgba(argb: u32) -> Rgba<u8> {
    let [a, r, g, b] = argb.to_be_bytes();
    Rgba([r, g, b, a])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::FrameSink;
    use crate::router::FrameRouter;
    use crate::session::ResolutionCell;

    fn setup(mode: Mode) -> (FrameRouter, Presenter, ResolutionCell) {
        let cell = ModeCell::new(mode);
        let resolution = ResolutionCell::new();
        resolution.store(Some(Resolution::new(2, 2)));
        let router = FrameRouter::new(cell.clone(), resolution.clone());
        let presenter = Presenter::new(router.subscribe(), cell, (64, 32));
        (router, presenter, resolution)
    }

    #[test]
    fn test_argb_conversion() {
        assert_eq!(argb_to_rgba(0xFF10_2030).0, [0x10, 0x20, 0x30, 0xFF]);
    }

    #[test]
    fn test_camera_image_allocated_once_per_resolution() {
        let (router, mut presenter, resolution) = setup(Mode::AmplitudeView);
        assert_eq!(presenter.present_pending(), None);

        for frame in 0..3 {
            router.on_amplitude(vec![0xFF00_0000 | frame; 4]);
            assert!(matches!(
                presenter.present_pending(),
                Some(PresentedView::Camera { .. })
            ));
        }
        assert_eq!(presenter.allocations(), 1);
        assert_eq!(presenter.camera_image().unwrap().get_pixel(1, 1).0, [0, 0, 2, 255]);

        resolution.store(Some(Resolution::new(3, 1)));
        router.on_amplitude(vec![0; 3]);
        presenter.present_pending();
        assert_eq!(presenter.allocations(), 2);
    }

    #[test]
    fn test_stale_frame_is_discarded() {
        let (router, mut presenter, _) = setup(Mode::DepthView);
        router.on_amplitude(vec![0; 4]);
        router.mode_cell().store(Mode::Calibration);

        assert_eq!(presenter.present_pending(), None);
        assert_eq!(presenter.stale(), 1);
        assert!(presenter.camera_image().is_none());
    }

    #[test]
    fn test_blob_frame_draws_overlay() {
        let (router, mut presenter, _) = setup(Mode::Test);
        router.on_blobs(vec![10, 10, 30, 20, 7]);
        assert_eq!(
            presenter.present_pending(),
            Some(PresentedView::Overlay {
                sequence: 0,
                markers: 2
            })
        );
        assert_eq!(presenter.overlay_image().unwrap().dimensions(), (64, 32));
    }

    #[tokio::test]
    async fn test_next_frame_waits_for_delivery() {
        let (router, mut presenter, _) = setup(Mode::AmplitudeView);
        let router = std::sync::Arc::new(router);
        let producer = std::sync::Arc::clone(&router);
        let handle = tokio::task::spawn_blocking(move || producer.on_amplitude(vec![0; 4]));

        let view = presenter.next_frame().await;
        handle.await.unwrap();
        assert!(matches!(view, Some(PresentedView::Camera { .. })));
    }
}
