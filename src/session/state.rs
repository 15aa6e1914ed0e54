// SPDX-License-Identifier: GPL-3.0-only

//! Session state types

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sensor resolution reported by the native open call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Interpret the native `[width, height]` pair
    ///
    /// Both dimensions must be positive for the open to count as successful.
    pub fn from_native(raw: [i32; 2]) -> Option<Self> {
        let width = u32::try_from(raw[0]).ok().filter(|w| *w > 0)?;
        let height = u32::try_from(raw[1]).ok().filter(|h| *h > 0)?;
        Some(Self { width, height })
    }

    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn pack(self) -> u64 {
        (u64::from(self.width) << 32) | u64::from(self.height)
    }

    fn unpack(packed: u64) -> Option<Self> {
        if packed == 0 {
            return None;
        }
        Some(Self {
            width: (packed >> 32) as u32,
            height: packed as u32,
        })
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where the device session stands
///
/// Capturing carries the resolution too: capture is only possible on an open
/// session, and an open session always has a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Open {
        resolution: Resolution,
    },
    Capturing {
        resolution: Resolution,
    },
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionState::Capturing { .. })
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            SessionState::Closed => None,
            SessionState::Open { resolution } | SessionState::Capturing { resolution } => {
                Some(*resolution)
            }
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Open { resolution } => write!(f, "open ({})", resolution),
            SessionState::Capturing { resolution } => write!(f, "capturing ({})", resolution),
        }
    }
}

/// Session resolution shared with the capture thread
///
/// Written by the session on open/close, read by frame callbacks.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCell(Arc<AtomicU64>);

impl ResolutionCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Option<Resolution> {
        Resolution::unpack(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, resolution: Option<Resolution>) {
        self.0
            .store(resolution.map_or(0, Resolution::pack), Ordering::Release);
    }
}
