// SPDX-License-Identifier: GPL-3.0-only

//! Operating modes
//!
//! Two layouts exist. The calibrator layout has two live views (depth and
//! amplitude), the calibration point-collection view and the projection test.
//! The projector layout folds the live views into a single camera view. Both
//! have the same shape: a live view, an interactive view and a diagnostic view,
//! so the router and the controls only ever look at a mode's [`ModeRole`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// An operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Live depth map (calibrator layout)
    DepthView,
    /// Live amplitude/gray image (calibrator layout)
    AmplitudeView,
    /// Calibration point collection (calibrator layout)
    Calibration,
    /// Pattern-projection test (both layouts)
    Test,
    /// Live camera image (projector layout)
    Camera,
    /// Pattern projection for point collection (projector layout)
    Project,
}

/// What a mode does with frames and controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRole {
    /// Amplitude frames are rendered
    LiveView,
    /// Calibration controls are shown, no frames rendered
    Interactive,
    /// Blob overlays are rendered
    Diagnostic,
}

impl Mode {
    pub fn role(self) -> ModeRole {
        match self {
            Mode::DepthView | Mode::AmplitudeView | Mode::Camera => ModeRole::LiveView,
            Mode::Calibration | Mode::Project => ModeRole::Interactive,
            Mode::Test => ModeRole::Diagnostic,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::DepthView => "DEPTH",
            Mode::AmplitudeView => "GRAY",
            Mode::Calibration => "CALIBRATION",
            Mode::Test => "TEST",
            Mode::Camera => "CAMERA",
            Mode::Project => "PROJECT",
        }
    }

    /// Whether amplitude frames may be rendered in this mode
    pub fn renders_amplitude(self) -> bool {
        self.role() == ModeRole::LiveView
    }

    /// Whether blob descriptors may be rendered in this mode
    pub fn renders_blobs(self) -> bool {
        self.role() == ModeRole::Diagnostic
    }

    /// Stable tag used for the atomic mode cell (0 is reserved for "none")
    fn tag(self) -> u8 {
        match self {
            Mode::DepthView => 1,
            Mode::AmplitudeView => 2,
            Mode::Calibration => 3,
            Mode::Test => 4,
            Mode::Camera => 5,
            Mode::Project => 6,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Mode::DepthView),
            2 => Some(Mode::AmplitudeView),
            3 => Some(Mode::Calibration),
            4 => Some(Mode::Test),
            5 => Some(Mode::Camera),
            6 => Some(Mode::Project),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Mode layout the controller runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModeSet {
    /// Depth, Gray, Calibration, Test
    #[default]
    Calibrator,
    /// Camera, Project, Test
    Projector,
}

impl ModeSet {
    pub const ALL: [ModeSet; 2] = [ModeSet::Calibrator, ModeSet::Projector];

    /// Modes in button order
    pub fn modes(self) -> &'static [Mode] {
        match self {
            ModeSet::Calibrator => &[
                Mode::DepthView,
                Mode::AmplitudeView,
                Mode::Calibration,
                Mode::Test,
            ],
            ModeSet::Projector => &[Mode::Camera, Mode::Project, Mode::Test],
        }
    }

    /// Mode active before the user picks one
    pub fn initial_mode(self) -> Mode {
        match self {
            ModeSet::Calibrator => Mode::AmplitudeView,
            ModeSet::Projector => Mode::Camera,
        }
    }

    pub fn contains(self, mode: Mode) -> bool {
        self.modes().contains(&mode)
    }

    /// Integer code understood by the native ChangeMode entry point
    ///
    /// Returns `None` for modes that are not part of this layout.
    pub fn native_code(self, mode: Mode) -> Option<i32> {
        self.modes()
            .iter()
            .position(|m| *m == mode)
            .map(|index| index as i32 + 1)
    }

    /// Look up a mode by its (case-insensitive) display name
    pub fn mode_by_name(self, name: &str) -> Option<Mode> {
        self.modes()
            .iter()
            .copied()
            .find(|m| m.display_name().eq_ignore_ascii_case(name))
    }
}

/// Which UI affordances are visible for the current mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlVisibility {
    /// "Add point" button
    pub add_point: bool,
    /// "Calculate" button
    pub compute: bool,
}

impl ControlVisibility {
    pub fn for_mode(mode: Mode) -> Self {
        let calibrating = mode.role() == ModeRole::Interactive;
        Self {
            add_point: calibrating,
            compute: calibrating,
        }
    }
}

/// Shared current-mode value
///
/// Written only by the controller on the control thread; read by frame
/// callbacks on the capture thread, which take a single snapshot per callback.
#[derive(Debug, Clone, Default)]
pub struct ModeCell(Arc<AtomicU8>);

impl ModeCell {
    pub fn new(mode: Mode) -> Self {
        Self(Arc::new(AtomicU8::new(mode.tag())))
    }

    pub fn load(&self) -> Option<Mode> {
        Mode::from_tag(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, mode: Mode) {
        self.0.store(mode.tag(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_codes_follow_button_order() {
        assert_eq!(ModeSet::Calibrator.native_code(Mode::DepthView), Some(1));
        assert_eq!(ModeSet::Calibrator.native_code(Mode::AmplitudeView), Some(2));
        assert_eq!(ModeSet::Calibrator.native_code(Mode::Calibration), Some(3));
        assert_eq!(ModeSet::Calibrator.native_code(Mode::Test), Some(4));

        assert_eq!(ModeSet::Projector.native_code(Mode::Camera), Some(1));
        assert_eq!(ModeSet::Projector.native_code(Mode::Project), Some(2));
        assert_eq!(ModeSet::Projector.native_code(Mode::Test), Some(3));

        assert_eq!(ModeSet::Projector.native_code(Mode::DepthView), None);
    }

    #[test]
    fn test_layouts_share_one_shape() {
        for set in ModeSet::ALL {
            let roles: Vec<ModeRole> = set.modes().iter().map(|m| m.role()).collect();
            assert_eq!(
                roles.iter().filter(|r| **r == ModeRole::Interactive).count(),
                1
            );
            assert_eq!(
                roles.iter().filter(|r| **r == ModeRole::Diagnostic).count(),
                1
            );
            assert!(set.initial_mode().renders_amplitude());
        }
    }

    #[test]
    fn test_controls_only_in_interactive_mode() {
        assert_eq!(
            ControlVisibility::for_mode(Mode::Calibration),
            ControlVisibility {
                add_point: true,
                compute: true
            }
        );
        assert_eq!(
            ControlVisibility::for_mode(Mode::Test),
            ControlVisibility::default()
        );
        assert!(ControlVisibility::for_mode(Mode::Project).add_point);
    }

    #[test]
    fn test_mode_cell_round_trips_every_mode() {
        let cell = ModeCell::new(Mode::AmplitudeView);
        for mode in ModeSet::Calibrator
            .modes()
            .iter()
            .chain(ModeSet::Projector.modes())
        {
            cell.store(*mode);
            assert_eq!(cell.load(), Some(*mode));
        }
    }

    #[test]
    fn test_mode_by_name() {
        assert_eq!(ModeSet::Calibrator.mode_by_name("gray"), Some(Mode::AmplitudeView));
        assert_eq!(ModeSet::Projector.mode_by_name("gray"), None);
    }
}
