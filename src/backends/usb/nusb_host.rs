// SPDX-License-Identifier: GPL-3.0-only

//! Desktop USB host backed by nusb
//!
//! Desktop systems have no interactive permission dialog: access is decided by
//! device node permissions (udev rules on Linux). `has_permission` therefore
//! probes whether the device can actually be opened. A permission request
//! cannot be shown to the user; it stays pending until the caller cancels it.

use super::{TransportHandle, UsbDeviceInfo, UsbHost, UsbTransport};
use crate::session::RequestId;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct NusbHost;

impl NusbHost {
    pub fn new() -> Self {
        Self
    }

    fn find(&self, device: &UsbDeviceInfo) -> Option<nusb::DeviceInfo> {
        let devices = nusb::list_devices().ok()?;
        devices
            .into_iter()
            .find(|info| describe(info).same_device(device))
    }
}

fn describe(info: &nusb::DeviceInfo) -> UsbDeviceInfo {
    UsbDeviceInfo {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        name: info.product_string().unwrap_or("USB device").to_string(),
        path: format!("bus {} addr {}", info.bus_number(), info.device_address()),
    }
}

impl UsbHost for NusbHost {
    fn devices(&self) -> Vec<UsbDeviceInfo> {
        match nusb::list_devices() {
            Ok(devices) => devices.map(|info| describe(&info)).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to enumerate USB devices");
                Vec::new()
            }
        }
    }

    fn has_permission(&self, device: &UsbDeviceInfo) -> bool {
        self.find(device)
            .map(|info| info.open().is_ok())
            .unwrap_or(false)
    }

    fn request_permission(&mut self, device: &UsbDeviceInfo, request: RequestId) {
        warn!(
            %device,
            %request,
            "No permission dialog on this host; check udev rules for the device"
        );
    }

    fn open(&mut self, device: &UsbDeviceInfo) -> Result<Box<dyn UsbTransport>, String> {
        let info = self
            .find(device)
            .ok_or_else(|| format!("{} is no longer attached", device))?;
        let handle = info.open().map_err(|e| e.to_string())?;
        let node = open_device_node(&info);
        debug!(%device, has_fd = node.is_some(), "Opened USB transport");
        Ok(Box::new(NusbTransport {
            device: Some(handle),
            node,
        }))
    }
}

/// usbfs node for the device, giving the native layer a raw descriptor
#[cfg(target_os = "linux")]
fn open_device_node(info: &nusb::DeviceInfo) -> Option<std::fs::File> {
    let path = format!(
        "/dev/bus/usb/{:03}/{:03}",
        info.bus_number(),
        info.device_address()
    );
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| debug!(path = %path, error = %e, "Cannot open usbfs node"))
        .ok()
}

#[cfg(not(target_os = "linux"))]
fn open_device_node(_info: &nusb::DeviceInfo) -> Option<std::fs::File> {
    None
}

struct NusbTransport {
    device: Option<nusb::Device>,
    node: Option<std::fs::File>,
}

impl UsbTransport for NusbTransport {
    fn handle(&self) -> TransportHandle {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            if let Some(node) = &self.node {
                return TransportHandle(node.as_raw_fd());
            }
        }
        TransportHandle(-1)
    }

    fn close(&mut self) {
        self.node.take();
        self.device.take();
    }
}
