// SPDX-License-Identifier: GPL-3.0-only

//! In-memory USB host
//!
//! Stands in for the OS when running the demo or tests. Clones share state, so
//! a test can keep one clone to attach devices, grant permissions and inspect
//! transport usage after handing another clone to the controller.

use super::{TransportHandle, UsbDeviceInfo, UsbHost, UsbTransport};
use crate::session::RequestId;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct HostState {
    devices: Vec<(UsbDeviceInfo, bool)>,
    permission_requests: Vec<(RequestId, UsbDeviceInfo)>,
    refuse_open: bool,
    next_handle: i32,
    opened: usize,
    closed: usize,
}

/// Shared in-memory host
#[derive(Debug, Clone, Default)]
pub struct MemoryUsbHost {
    state: Arc<Mutex<HostState>>,
}

impl MemoryUsbHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a device, optionally with permission already granted
    pub fn attach(&self, device: UsbDeviceInfo, permission_granted: bool) {
        self.lock().devices.push((device, permission_granted));
    }

    /// Remove a device from the bus
    pub fn detach(&self, device: &UsbDeviceInfo) {
        self.lock().devices.retain(|(d, _)| !d.same_device(device));
    }

    /// Record the user's decision so later `has_permission` calls see it
    pub fn set_permission(&self, device: &UsbDeviceInfo, granted: bool) {
        for (d, permission) in self.lock().devices.iter_mut() {
            if d.same_device(device) {
                *permission = granted;
            }
        }
    }

    /// Make subsequent `open` calls fail
    pub fn refuse_open(&self, refuse: bool) {
        self.lock().refuse_open = refuse;
    }

    /// Permission requests issued so far, oldest first
    pub fn permission_requests(&self) -> Vec<(RequestId, UsbDeviceInfo)> {
        self.lock().permission_requests.clone()
    }

    /// Number of transports opened
    pub fn opened_transports(&self) -> usize {
        self.lock().opened
    }

    /// Number of transports closed
    pub fn closed_transports(&self) -> usize {
        self.lock().closed
    }
}

impl UsbHost for MemoryUsbHost {
    fn devices(&self) -> Vec<UsbDeviceInfo> {
        self.lock().devices.iter().map(|(d, _)| d.clone()).collect()
    }

    fn has_permission(&self, device: &UsbDeviceInfo) -> bool {
        self.lock()
            .devices
            .iter()
            .any(|(d, granted)| *granted && d.same_device(device))
    }

    fn request_permission(&mut self, device: &UsbDeviceInfo, request: RequestId) {
        debug!(%device, %request, "Permission requested");
        self.lock()
            .permission_requests
            .push((request, device.clone()));
    }

    fn open(&mut self, device: &UsbDeviceInfo) -> Result<Box<dyn UsbTransport>, String> {
        let mut state = self.lock();
        if state.refuse_open {
            return Err(format!("{} refused to open", device.path));
        }
        if !state
            .devices
            .iter()
            .any(|(d, granted)| *granted && d.same_device(device))
        {
            return Err(format!("no access to {}", device.path));
        }
        state.next_handle += 1;
        state.opened += 1;
        Ok(Box::new(MemoryTransport {
            handle: TransportHandle(100 + state.next_handle),
            host: self.clone(),
            closed: false,
        }))
    }
}

struct MemoryTransport {
    handle: TransportHandle,
    host: MemoryUsbHost,
    closed: bool,
}

impl UsbTransport for MemoryTransport {
    fn handle(&self) -> TransportHandle {
        self.handle
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.host.lock().closed += 1;
        }
    }
}
