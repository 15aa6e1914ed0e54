// SPDX-License-Identifier: GPL-3.0-only

//! Device session
//!
//! Discovery, permission round trips, open/close and the capture lifecycle of
//! the one camera the app talks to.

mod capture;
pub mod device;
pub mod permission;
pub mod state;

pub use device::{DeviceSession, OpenOutcome, PermissionResolution};
pub use permission::{PendingPermission, PermissionBroker, PermissionDecision, RequestId};
pub use state::{Resolution, ResolutionCell, SessionState};
