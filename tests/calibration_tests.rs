// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the calibration workflow and calibration files

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tof_calibrator::backends::native::simulated::NativeCommand;
use tof_calibrator::backends::{
    MemoryUsbHost, SimulatedCamera, SimulatedOptions, SimulatedProbe, UsbDeviceInfo,
};
use tof_calibrator::calibration::{CalibrationStore, Coefficients};
use tof_calibrator::errors::CalibrationError;
use tof_calibrator::notice::{self, NoticeReceiver};
use tof_calibrator::{AppError, CameraController, Config, Mode, Notice};

struct Fixture {
    controller: CameraController,
    notices: NoticeReceiver,
    probe: SimulatedProbe,
    root: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn fixture() -> Fixture {
    let root = std::env::temp_dir().join(format!("tof-calibrator-{}", uuid::Uuid::new_v4()));
    let host = MemoryUsbHost::new();
    host.attach(UsbDeviceInfo::new(0x1F46, 0x0001, "arrow"), true);
    let config = Config {
        storage_root: Some(root.clone()),
        ..Config::default()
    };
    let native = SimulatedCamera::new(SimulatedOptions {
        stream_frames: false,
        ..SimulatedOptions::default()
    });
    let probe = native.probe();
    let (controller, notices) = CameraController::new(&config, Box::new(host), Box::new(native));
    Fixture {
        controller,
        notices,
        probe,
        root,
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_add_point_failure_keeps_collection() {
    let mut f = fixture();
    f.controller.select_mode(Mode::Calibration).unwrap();
    assert_eq!(f.controller.add_point(), Ok(1));

    f.probe.set_accept_points(false);
    assert_eq!(
        f.controller.add_point(),
        Err(AppError::Calibration(CalibrationError::PointRejected))
    );
    assert_eq!(f.controller.points(), 1);

    let notices = notice::drain(&mut f.notices);
    assert!(notices.contains(&Notice::PointAdded { count: 1 }));
    assert_eq!(notices.last(), Some(&Notice::PointRejected));
    assert_eq!(Notice::PointRejected.to_string(), "Point cannot be added");
}

#[test]
fn test_compute_and_save_then_load_round_trip() {
    let mut f = fixture();
    let expected = [0.125, -3.5e-4, 1024.0, -0.000_017_5];
    f.probe.set_coefficients(expected);

    f.controller.select_mode(Mode::Calibration).unwrap();
    f.controller.add_point().unwrap();
    f.controller.add_point().unwrap();
    let path = f.controller.compute_and_save().unwrap();

    assert!(path.starts_with(f.root.join("Calibrator")));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("_flipped.txt"), "unexpected file name {}", name);

    let loaded = f.controller.load_calibration(&path).unwrap();
    assert_eq!(loaded.coefficients, Coefficients(expected));
    assert!(loaded.is_complete());
    assert_eq!(f.probe.loaded_calibration(), Some(expected));

    let notices = notice::drain(&mut f.notices);
    assert!(notices.contains(&Notice::CalibrationSaved(path.clone())));
    assert!(notices.contains(&Notice::CalibrationLoaded(path)));
}

#[test]
fn test_unflipped_file_name() {
    let mut f = fixture();
    f.controller.toggle_flip();
    f.controller.select_mode(Mode::Calibration).unwrap();
    f.controller.add_point().unwrap();
    let path = f.controller.compute_and_save().unwrap();

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(!name.contains("_flipped"));
    // yyyy_MM_dd_HH_mm.txt
    assert_eq!(name.len(), "2024_03_09_14_05.txt".len());
}

#[test]
fn test_two_line_file_is_zero_padded() {
    let mut f = fixture();
    let path = write_file(&f.root, "short.txt", "1.5\n-2.25\n");

    let loaded = f.controller.load_calibration(&path).unwrap();
    assert_eq!(loaded.values_read, 2);
    assert_eq!(f.probe.loaded_calibration(), Some([1.5, -2.25, 0.0, 0.0]));
    assert!(
        notice::drain(&mut f.notices).contains(&Notice::CalibrationIncomplete { values_read: 2 })
    );
}

#[test]
fn test_empty_file_forwards_zeros() {
    let mut f = fixture();
    let path = write_file(&f.root, "empty.txt", "");

    let loaded = f.controller.load_calibration(&path).unwrap();
    assert_eq!(loaded.values_read, 0);
    assert_eq!(f.probe.loaded_calibration(), Some([0.0; 4]));

    let notices = notice::drain(&mut f.notices);
    assert!(notices.contains(&Notice::CalibrationLoaded(path)));
    assert!(notices.contains(&Notice::CalibrationIncomplete { values_read: 0 }));
}

#[test]
fn test_malformed_file_forwards_nothing() {
    let mut f = fixture();
    let path = write_file(&f.root, "bad.txt", "1.0\nhello\n3\n4\n");

    let result = f.controller.load_calibration(&path);
    assert!(matches!(
        result,
        Err(AppError::Calibration(CalibrationError::Parse { line: 2, .. }))
    ));
    assert_eq!(f.probe.loaded_calibration(), None);
    assert!(notice::drain(&mut f.notices).contains(&Notice::CalibrationNotLoaded));

    let missing = f.root.join("missing.txt");
    assert!(matches!(
        f.controller.load_calibration(&missing),
        Err(AppError::Storage(_))
    ));
}

#[test]
fn test_non_finite_result_is_not_saved() {
    let mut f = fixture();
    f.probe.set_coefficients([1.0, f64::INFINITY, 0.0, 0.0]);
    f.controller.select_mode(Mode::Calibration).unwrap();
    f.controller.add_point().unwrap();

    let result = f.controller.compute_and_save();
    assert!(matches!(
        result,
        Err(AppError::Calibration(CalibrationError::InvalidResult(_)))
    ));
    assert!(!f.root.join("Calibrator").exists());
    assert!(notice::drain(&mut f.notices).contains(&Notice::CalibrationNotSaved));
}

#[test]
fn test_compute_without_points_reaches_solver() {
    let mut f = fixture();
    f.controller.select_mode(Mode::Calibration).unwrap();
    assert!(matches!(
        f.controller.compute_and_save(),
        Err(AppError::Calibration(CalibrationError::InvalidResult(_)))
    ));
    assert_eq!(
        f.probe
            .count(|c| *c == NativeCommand::ComputeCalibration),
        1
    );
    assert!(!f.root.join("Calibrator").exists());
}

#[test]
fn test_solver_points_survive_reentering_calibration() {
    let mut f = fixture();
    f.controller.select_mode(Mode::Calibration).unwrap();
    f.controller.add_point().unwrap();

    f.controller.select_mode(Mode::Test).unwrap();
    f.controller.select_mode(Mode::Calibration).unwrap();
    assert_eq!(f.controller.points(), 0);
    assert_eq!(f.probe.points(), 1);

    let path = f.controller.compute_and_save().unwrap();
    let loaded = CalibrationStore::read(&path).unwrap();
    assert_eq!(
        loaded.coefficients,
        Coefficients(SimulatedOptions::default().coefficients)
    );
}

#[test]
fn test_calibration_actions_gated_by_mode() {
    let mut f = fixture();
    f.controller.select_mode(Mode::Test).unwrap();
    assert_eq!(
        f.controller.compute_and_save(),
        Err(AppError::Calibration(CalibrationError::NotInCalibrationMode))
    );
    assert_eq!(f.probe.count(|c| *c == NativeCommand::AddPoint), 0);
}

#[test]
fn test_store_lists_newest_first() {
    let root = std::env::temp_dir().join(format!("tof-calibrator-{}", uuid::Uuid::new_v4()));
    let store = CalibrationStore::new(root.join("Calibrator"));
    assert!(store.latest().unwrap().is_none());

    let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    let coefficients = Coefficients([1.0, 2.0, 3.0, 4.0]);
    let older = store
        .save(&coefficients, false, day.and_hms_opt(9, 0, 0).unwrap())
        .unwrap();
    let newer = store
        .save(&coefficients, true, day.and_hms_opt(17, 30, 0).unwrap())
        .unwrap();

    assert_eq!(store.list().unwrap(), vec![newer.clone(), older]);
    assert_eq!(store.latest().unwrap(), Some(newer));

    // Same minute overwrites
    let again = store
        .save(
            &Coefficients([5.0, 6.0, 7.0, 8.0]),
            true,
            day.and_hms_opt(17, 30, 59).unwrap(),
        )
        .unwrap();
    assert_eq!(store.list().unwrap().len(), 2);
    let loaded = CalibrationStore::read(&again).unwrap();
    assert_eq!(loaded.coefficients, Coefficients([5.0, 6.0, 7.0, 8.0]));

    std::fs::remove_dir_all(&root).unwrap();
}
