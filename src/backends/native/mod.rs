// SPDX-License-Identifier: GPL-3.0-only

//! Native camera / solver boundary
//!
//! The driver decodes depth and amplitude, detects retro-reflective blobs and
//! owns the calibration math. The core only issues the commands below and
//! consumes their results. Return values mirror the driver's own conventions
//! (booleans, a resolution pair, a fixed coefficient vector); the session and
//! workflow layers turn them into typed results.

pub mod simulated;

pub use simulated::{SimulatedCamera, SimulatedOptions, SimulatedProbe};

use super::usb::TransportHandle;
use std::sync::Arc;

/// Receiver of asynchronous driver callbacks
///
/// Called from the driver's capture thread, one callback at a time.
pub trait FrameSink: Send + Sync {
    /// Flat ARGB pixel buffer of `width * height` entries
    fn on_amplitude(&self, pixels: Vec<u32>);

    /// Flat `(x, y)` blob-center pairs in projector pixels
    fn on_blobs(&self, descriptors: Vec<i32>);
}

/// Commands understood by the native camera driver
pub trait NativeCamera: Send {
    /// Open the camera behind `transport`
    ///
    /// Returns `[width, height]`; a non-positive width means the open failed.
    fn open(&mut self, transport: TransportHandle, vendor_id: u16, product_id: u16) -> [i32; 2];

    /// Install the callback sink (before any frames are expected)
    fn register_callback(&mut self, sink: Arc<dyn FrameSink>);

    fn start_capture(&mut self) -> bool;

    fn stop_capture(&mut self) -> bool;

    /// Switch the driver's processing mode
    fn change_mode(&mut self, code: i32);

    /// Record one calibration observation from the current frame
    fn add_point(&mut self) -> bool;

    /// Solve for the four calibration coefficients
    fn compute_calibration(&mut self) -> [f64; 4];

    /// Flip frame orientation
    fn toggle_flip(&mut self);

    /// Install previously saved coefficients
    fn load_calibration(&mut self, coefficients: [f64; 4]);
}
