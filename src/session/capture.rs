// SPDX-License-Identifier: GPL-3.0-only

//! Capture lifecycle on top of an open session
//!
//! The native start/stop calls report success as a boolean. The session only
//! records a state change when the driver confirms it, so `Capturing` always
//! means the driver believes it is streaming.

use super::device::DeviceSession;
use crate::backends::NativeCamera;
use crate::errors::CaptureError;
use tracing::{debug, info, warn};

impl DeviceSession {
    /// Start streaming if not already
    ///
    /// Returns `Ok(true)` when capture was started by this call.
    pub fn start_capture(&mut self, native: &mut dyn NativeCamera) -> Result<bool, CaptureError> {
        let Some(session) = self.open.as_mut() else {
            return Err(CaptureError::SessionClosed);
        };
        if session.capturing {
            return Ok(false);
        }
        if !native.start_capture() {
            warn!(device = %session.device, "Driver refused to start capture");
            return Err(CaptureError::StartFailed);
        }
        session.capturing = true;
        info!(device = %session.device, "Capture started");
        Ok(true)
    }

    /// Stop streaming if running
    ///
    /// Returns `Ok(true)` when capture was stopped by this call. A closed or
    /// idle session is not an error.
    pub fn stop_capture(&mut self, native: &mut dyn NativeCamera) -> Result<bool, CaptureError> {
        let Some(session) = self.open.as_mut() else {
            return Ok(false);
        };
        if !session.capturing {
            return Ok(false);
        }
        if !native.stop_capture() {
            warn!(device = %session.device, "Driver refused to stop capture");
            return Err(CaptureError::StopFailed);
        }
        session.capturing = false;
        debug!(device = %session.device, "Capture stopped");
        Ok(true)
    }

    pub fn is_capturing(&self) -> bool {
        self.open.as_ref().is_some_and(|session| session.capturing)
    }
}
