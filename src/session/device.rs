// SPDX-License-Identifier: GPL-3.0-only

//! Device discovery, permission and open/close
//!
//! ```text
//! discover_and_open
//!    │
//!    ├─ no supported device ─────────────► Err(NoCameraFound)
//!    ├─ permission missing ──► request ──► AwaitingPermission(pending)
//!    │                                          │ complete_permission(granted)
//!    └─ permission present ──► open_handle ◄────┘
//!                                 │
//!                                 ├─ transport open, native open
//!                                 ├─ width <= 0 ─► Err(OpenFailed), transport released
//!                                 └─ register sink ─► Opened(resolution)
//! ```

use crate::backends::{FrameSink, NativeCamera, UsbDeviceInfo, UsbHost, UsbTransport};
use crate::errors::SessionError;
use crate::session::permission::{
    PendingPermission, PermissionBroker, PermissionDecision, RequestId,
};
use crate::session::state::{Resolution, ResolutionCell, SessionState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of an open attempt that did not fail outright
#[derive(Debug)]
pub enum OpenOutcome {
    /// Session is open (either just now or already)
    Opened(Resolution),
    /// Permission was requested; the open resumes when the decision arrives
    AwaitingPermission(PendingPermission),
    /// A request for the same device is already outstanding
    StillPending(RequestId),
}

/// What a permission decision led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionResolution {
    /// Decision dropped (paused, unknown request, or already answered)
    Ignored,
    /// User refused access
    Denied(UsbDeviceInfo),
    /// Access granted and the session opened
    Opened(Resolution),
}

/// Everything owned by an open session
pub(crate) struct OpenSession {
    pub(crate) device: UsbDeviceInfo,
    transport: Box<dyn UsbTransport>,
    pub(crate) resolution: Resolution,
    pub(crate) capturing: bool,
}

/// Owns the USB host, the transport and pending permission requests
///
/// Capture start/stop lives in `capture.rs`; together they make up the
/// session lifecycle.
pub struct DeviceSession {
    host: Box<dyn UsbHost>,
    permissions: PermissionBroker,
    pub(crate) open: Option<OpenSession>,
    resolution: ResolutionCell,
}

impl DeviceSession {
    pub fn new(host: Box<dyn UsbHost>, resolution: ResolutionCell) -> Self {
        Self {
            host,
            permissions: PermissionBroker::new(),
            open: None,
            resolution,
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.open {
            None => SessionState::Closed,
            Some(session) if session.capturing => SessionState::Capturing {
                resolution: session.resolution,
            },
            Some(session) => SessionState::Open {
                resolution: session.resolution,
            },
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.open.as_ref().map(|session| session.resolution)
    }

    /// Device backing the open session
    pub fn device(&self) -> Option<&UsbDeviceInfo> {
        self.open.as_ref().map(|session| &session.device)
    }

    pub fn permissions(&self) -> &PermissionBroker {
        &self.permissions
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.permissions.set_listening(listening);
    }

    /// Attached devices with their support status
    pub fn list_devices(&self) -> Vec<(UsbDeviceInfo, bool)> {
        self.host
            .devices()
            .into_iter()
            .map(|device| {
                let supported = device.is_supported_camera();
                (device, supported)
            })
            .collect()
    }

    /// First attached device whose vendor is on the allow-list
    pub fn find_camera(&self) -> Option<UsbDeviceInfo> {
        self.host
            .devices()
            .into_iter()
            .find(UsbDeviceInfo::is_supported_camera)
    }

    /// Find a supported camera and open it, asking for permission if needed
    ///
    /// A no-op when a session is already open.
    pub fn discover_and_open(
        &mut self,
        native: &mut dyn NativeCamera,
        sink: &Arc<dyn FrameSink>,
    ) -> Result<OpenOutcome, SessionError> {
        if let Some(resolution) = self.resolution() {
            return Ok(OpenOutcome::Opened(resolution));
        }

        let Some(device) = self.find_camera() else {
            warn!("No supported camera attached");
            return Err(SessionError::NoCameraFound);
        };
        debug!(%device, "Found supported camera");

        if self.host.has_permission(&device) {
            return self.open_handle(&device, native, sink).map(OpenOutcome::Opened);
        }

        if let Some(id) = self.permissions.pending_for(&device) {
            debug!(%id, %device, "Permission request already outstanding");
            return Ok(OpenOutcome::StillPending(id));
        }

        let pending = self.permissions.begin(&device);
        info!(request = %pending.id, %device, "Requesting USB permission");
        self.host.request_permission(&device, pending.id);
        Ok(OpenOutcome::AwaitingPermission(pending))
    }

    /// Continue the open sequence after the user answered a request
    pub fn complete_permission(
        &mut self,
        id: RequestId,
        granted: bool,
        native: &mut dyn NativeCamera,
        sink: &Arc<dyn FrameSink>,
    ) -> Result<PermissionResolution, SessionError> {
        let decision = PermissionDecision::from_granted(granted);
        let Some(device) = self.permissions.resolve(id, decision) else {
            return Ok(PermissionResolution::Ignored);
        };

        if decision == PermissionDecision::Denied {
            warn!(request = %id, %device, "USB permission denied");
            return Ok(PermissionResolution::Denied(device));
        }

        if let Some(resolution) = self.resolution() {
            debug!(%device, "Permission granted but a session is already open");
            return Ok(PermissionResolution::Opened(resolution));
        }

        self.open_handle(&device, native, sink)
            .map(PermissionResolution::Opened)
    }

    /// Open the transport and the native camera on it
    ///
    /// On success the sink is registered exactly once, before capture can
    /// start. On failure the transport is released again.
    pub fn open_handle(
        &mut self,
        device: &UsbDeviceInfo,
        native: &mut dyn NativeCamera,
        sink: &Arc<dyn FrameSink>,
    ) -> Result<Resolution, SessionError> {
        if let Some(resolution) = self.resolution() {
            return Ok(resolution);
        }

        let mut transport = self
            .host
            .open(device)
            .map_err(SessionError::TransportFailed)?;
        let handle = transport.handle();

        let raw = native.open(handle, device.vendor_id, device.product_id);
        let Some(resolution) = Resolution::from_native(raw) else {
            warn!(%device, width = raw[0], height = raw[1], "Native open failed");
            transport.close();
            return Err(SessionError::OpenFailed {
                width: raw[0],
                height: raw[1],
            });
        };

        native.register_callback(Arc::clone(sink));
        self.resolution.store(Some(resolution));
        info!(%device, %resolution, handle = handle.0, "Camera session opened");

        self.open = Some(OpenSession {
            device: device.clone(),
            transport,
            resolution,
            capturing: false,
        });
        Ok(resolution)
    }

    /// Release the transport
    ///
    /// Idempotent; the transport is closed at most once per open. Capture
    /// should be stopped first.
    pub fn close(&mut self) {
        if let Some(mut session) = self.open.take() {
            if session.capturing {
                warn!(device = %session.device, "Closing session while capture is running");
            }
            session.transport.close();
            self.resolution.store(None);
            info!(device = %session.device, "Camera session closed");
        }
    }

    /// The host reported `device` as removed
    ///
    /// Returns whether the open session or a pending permission request
    /// referred to it.
    pub fn on_device_detached(
        &mut self,
        device: &UsbDeviceInfo,
        native: &mut dyn NativeCamera,
    ) -> bool {
        let cancelled = self.permissions.cancel_device(device);
        if cancelled > 0 {
            debug!(%device, cancelled, "Cancelled permission requests for detached device");
        }

        let ours = self
            .open
            .as_ref()
            .is_some_and(|session| session.device.same_device(device));
        if ours {
            warn!(%device, "Camera detached");
            if let Err(e) = self.stop_capture(native) {
                debug!(error = %e, "Stop after detach failed");
            }
            self.close();
        }
        ours || cancelled > 0
    }

    /// Drop every outstanding permission request
    pub fn cancel_permissions(&mut self) {
        self.permissions.cancel_all();
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}
