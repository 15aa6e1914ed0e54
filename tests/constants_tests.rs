// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants and mode tables

use tof_calibrator::constants::usb;
use tof_calibrator::mode::{ControlVisibility, ModeRole};
use tof_calibrator::{Mode, ModeSet};

#[test]
fn test_vendor_allow_list() {
    for vendor in [0x1C28, 0x058B, 0x1F46] {
        assert!(usb::is_supported_vendor(vendor));
    }
    assert!(!usb::is_supported_vendor(0x046D));
    assert_eq!(usb::SUPPORTED_VENDORS.len(), 3);
}

#[test]
fn test_every_layout_has_one_mode_per_role() {
    for set in ModeSet::ALL {
        for role in [ModeRole::LiveView, ModeRole::Interactive, ModeRole::Diagnostic] {
            assert!(
                set.modes().iter().any(|m| m.role() == role),
                "{:?} has no {:?} mode",
                set,
                role
            );
        }
        assert!(set.contains(set.initial_mode()));
        assert_eq!(set.initial_mode().role(), ModeRole::LiveView);
    }
}

#[test]
fn test_native_codes_are_dense() {
    for set in ModeSet::ALL {
        let codes: Vec<i32> = set.modes().iter().filter_map(|m| set.native_code(*m)).collect();
        let expected: Vec<i32> = (1..=set.modes().len() as i32).collect();
        assert_eq!(codes, expected);
    }
    assert_eq!(ModeSet::Projector.native_code(Mode::DepthView), None);
}

#[test]
fn test_controls_only_in_interactive_modes() {
    for mode in [Mode::Calibration, Mode::Project] {
        let controls = ControlVisibility::for_mode(mode);
        assert!(controls.add_point && controls.compute);
    }
    for mode in [Mode::DepthView, Mode::AmplitudeView, Mode::Camera, Mode::Test] {
        assert_eq!(ControlVisibility::for_mode(mode), ControlVisibility::default());
    }
}

#[test]
fn test_modes_found_by_name() {
    assert_eq!(ModeSet::Calibrator.mode_by_name("gray"), Some(Mode::AmplitudeView));
    assert_eq!(ModeSet::Projector.mode_by_name("PROJECT"), Some(Mode::Project));
    assert_eq!(ModeSet::Projector.mode_by_name("depth"), None);
}
