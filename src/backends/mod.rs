// SPDX-License-Identifier: MPL-2.0

//! Hardware boundary
//!
//! The core never talks to hardware directly. It goes through two traits:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │     CameraController         │
//! └───────┬──────────────┬───────┘
//!         │              │
//!         ▼              ▼
//! ┌──────────────┐ ┌──────────────────┐
//! │  UsbHost     │ │  NativeCamera    │ ← open / capture / mode / solver
//! │ (enumerate,  │ │                  │
//! │  permission) │ │  FrameSink  ◄────┼── capture thread callbacks
//! └──────────────┘ └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`usb`]: USB enumeration, permission requests and transports
//! - [`native`]: camera driver / solver commands and frame callbacks
//! - [`frame_loop`]: named capture thread used by drivers to deliver frames

pub mod frame_loop;
pub mod native;
pub mod usb;

pub use frame_loop::{CaptureLoop, LoopAction};
pub use native::{FrameSink, NativeCamera, SimulatedCamera, SimulatedOptions, SimulatedProbe};
pub use usb::{
    MemoryUsbHost, NusbHost, TransportHandle, UsbDeviceInfo, UsbHost, UsbTransport,
};
