// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// USB vendor ids of supported time-of-flight camera hardware
///
/// Discovery picks the first attached device whose vendor id appears here.
pub mod usb {
    /// pmd technologies (pico flexx, pico monstar)
    pub const VENDOR_PMD: u16 = 0x1C28;

    /// Infineon reference designs
    pub const VENDOR_INFINEON: u16 = 0x058B;

    /// Arrow / CamBoard evaluation kits
    pub const VENDOR_ARROW: u16 = 0x1F46;

    /// Allow-list in discovery order
    pub const SUPPORTED_VENDORS: [u16; 3] = [VENDOR_PMD, VENDOR_INFINEON, VENDOR_ARROW];

    /// Check whether a vendor id belongs to supported camera hardware
    pub fn is_supported_vendor(vendor_id: u16) -> bool {
        SUPPORTED_VENDORS.contains(&vendor_id)
    }
}

/// Calibration file layout
pub mod calibration {
    /// Directory (under the storage root) holding saved calibrations
    pub const DIR_NAME: &str = "Calibrator";

    /// chrono format for the file stem (`yyyy_MM_dd_HH_mm`)
    pub const FILE_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M";

    /// Appended to the stem when the orientation flag is set
    pub const FLIPPED_SUFFIX: &str = "_flipped";

    /// Extension of calibration files
    pub const FILE_EXTENSION: &str = "txt";

    /// Number of coefficients produced by the solver
    pub const COEFFICIENT_COUNT: usize = 4;
}

/// Test-pattern overlay geometry
pub mod overlay {
    /// Default projector display width in pixels
    pub const PROJECTOR_WIDTH: u32 = 1280;

    /// Default projector display height in pixels
    pub const PROJECTOR_HEIGHT: u32 = 720;

    /// Radius of the outer ring drawn around each blob center
    pub const OUTER_RING_RADIUS: u32 = 40;

    /// Radius of the filled dot at each blob center
    pub const CENTER_DOT_RADIUS: u32 = 5;

    /// Stroke width of rings and the framing rectangle
    pub const STROKE_WIDTH: u32 = 5;

    /// Background (opaque black), RGBA
    pub const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

    /// Marker and frame color (opaque white), RGBA
    pub const FOREGROUND: [u8; 4] = [255, 255, 255, 255];
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Interval between frames produced by the simulated driver (~30 fps)
    pub const SIMULATED_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Log every Nth presented frame
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// How long the CLI demo waits for a permission decision
    pub const PERMISSION_TIMEOUT: Duration = Duration::from_secs(10);
}
