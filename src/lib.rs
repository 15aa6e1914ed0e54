// SPDX-License-Identifier: MPL-2.0

//! ToF Calibrator - projector calibration with a USB time-of-flight camera
//!
//! This library coordinates a depth camera through its operating modes,
//! routes frames from the driver's capture thread to the presentation side
//! and runs the calibration point-collection, solve and persist workflow.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: USB host and native driver boundaries, with desktop,
//!   in-memory and simulated implementations
//! - [`session`]: Device discovery, permission round trips, open/close, capture
//! - [`router`]: Frame routing from the capture thread and UI-side presentation
//! - [`calibration`]: Calibration points, solver results and calibration files
//! - [`controller`]: Mode state machine tying the above together
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```no_run
//! use tof_calibrator::backends::{NusbHost, SimulatedCamera};
//! use tof_calibrator::{CameraController, Config, Mode};
//!
//! let config = Config::load()?;
//! let (mut controller, _notices) = CameraController::new(
//!     &config,
//!     Box::new(NusbHost::new()),
//!     Box::new(SimulatedCamera::default()),
//! );
//! controller.select_mode(Mode::Calibration)?;
//! # Ok::<(), tof_calibrator::AppError>(())
//! ```

pub mod backends;
pub mod calibration;
pub mod config;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod mode;
pub mod notice;
pub mod router;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use controller::{CameraController, ModeOutcome};
pub use errors::{AppError, AppResult};
pub use mode::{Mode, ModeSet};
pub use notice::Notice;
