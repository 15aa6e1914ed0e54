// SPDX-License-Identifier: GPL-3.0-only

//! USB host boundary
//!
//! The host OS owns enumeration, permission dialogs and the device transport.
//! A permission request is fire-and-forget from the host's point of view: the
//! decision comes back later as an event carrying the same [`RequestId`],
//! which the embedding layer forwards to the controller.

pub mod memory;
pub mod nusb_host;

pub use memory::MemoryUsbHost;
pub use nusb_host::NusbHost;

use crate::session::RequestId;

/// An attached USB device as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Product string, or a generic label if the device has none
    pub name: String,
    /// Host-specific location (e.g. "bus 1 addr 4")
    pub path: String,
}

impl UsbDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, name: &str) -> Self {
        Self {
            vendor_id,
            product_id,
            name: name.to_string(),
            path: format!("usb:{:04x}:{:04x}", vendor_id, product_id),
        }
    }

    /// Whether the vendor id is on the supported-camera allow-list
    pub fn is_supported_camera(&self) -> bool {
        crate::constants::usb::is_supported_vendor(self.vendor_id)
    }

    /// Same physical device identity (vendor, product, location)
    pub fn same_device(&self, other: &UsbDeviceInfo) -> bool {
        self.vendor_id == other.vendor_id
            && self.product_id == other.product_id
            && self.path == other.path
    }
}

impl std::fmt::Display for UsbDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{:04x}:{:04x}] ({})",
            self.name, self.vendor_id, self.product_id, self.path
        )
    }
}

/// Opaque handle the native layer uses to reach the device
/// (a file descriptor on Android/Linux)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHandle(pub i32);

/// An open USB transport
///
/// Owned exclusively by the device session; `close` is called exactly once.
pub trait UsbTransport: Send {
    /// Handle passed to the native open entry point
    fn handle(&self) -> TransportHandle;

    /// Release the transport
    fn close(&mut self);
}

/// Host-side USB services
pub trait UsbHost: Send {
    /// Currently attached devices, in host enumeration order
    fn devices(&self) -> Vec<UsbDeviceInfo>;

    /// Whether the app may open the device without asking
    fn has_permission(&self, device: &UsbDeviceInfo) -> bool;

    /// Ask the user for access
    ///
    /// Returns immediately; the decision is delivered later, out of band,
    /// tagged with `request`.
    fn request_permission(&mut self, device: &UsbDeviceInfo, request: RequestId);

    /// Open the device transport (permission must already be granted)
    fn open(&mut self, device: &UsbDeviceInfo) -> Result<Box<dyn UsbTransport>, String>;
}
