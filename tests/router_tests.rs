// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for frame routing and presentation

use std::time::Duration;
use tof_calibrator::backends::{
    MemoryUsbHost, SimulatedCamera, SimulatedOptions, SimulatedProbe, UsbDeviceInfo,
};
use tof_calibrator::router::PresentedView;
use tof_calibrator::{CameraController, Config, Mode};

fn setup(options: SimulatedOptions) -> (CameraController, SimulatedProbe, MemoryUsbHost) {
    let host = MemoryUsbHost::new();
    host.attach(UsbDeviceInfo::new(0x1C28, 0xC012, "pico flexx"), true);
    let config = Config {
        storage_root: Some(std::env::temp_dir().join(format!(
            "tof-calibrator-{}",
            uuid::Uuid::new_v4()
        ))),
        ..Config::default()
    };
    let native = SimulatedCamera::new(options);
    let probe = native.probe();
    let (controller, _notices) =
        CameraController::new(&config, Box::new(host.clone()), Box::new(native));
    (controller, probe, host)
}

fn manual() -> SimulatedOptions {
    SimulatedOptions {
        stream_frames: false,
        ..SimulatedOptions::default()
    }
}

#[test]
fn test_live_view_buffer_matches_resolution() {
    let (mut controller, probe, _host) = setup(manual());
    let mut presenter = controller.presenter();
    controller.select_mode(Mode::AmplitudeView).unwrap();

    for frame in 0..5 {
        assert!(probe.emit_amplitude(frame));
        assert!(matches!(
            presenter.present_pending(),
            Some(PresentedView::Camera { .. })
        ));
    }

    let image = presenter.camera_image().unwrap();
    assert_eq!(image.dimensions(), (224, 172));
    assert_eq!(image.as_raw().len(), 224 * 172 * 4);
    assert_eq!(presenter.allocations(), 1);
}

#[test]
fn test_inactive_modes_never_render() {
    let (mut controller, probe, _host) = setup(manual());
    let mut presenter = controller.presenter();

    controller.select_mode(Mode::Calibration).unwrap();
    probe.emit_amplitude(0);
    probe.emit_blobs(vec![100, 100]);
    assert_eq!(presenter.present_pending(), None);

    controller.select_mode(Mode::DepthView).unwrap();
    probe.emit_blobs(vec![100, 100]);
    assert_eq!(presenter.present_pending(), None);

    assert!(presenter.camera_image().is_none());
    assert!(presenter.overlay_image().is_none());
    assert_eq!(controller.frame_stats().inactive, 3);
    assert_eq!(controller.frame_stats().forwarded, 0);
}

#[test]
fn test_blob_markers_are_half_the_values() {
    let (mut controller, probe, _host) = setup(manual());
    let mut presenter = controller.presenter();
    controller.select_mode(Mode::Test).unwrap();

    for (descriptors, expected) in [
        (vec![], 0),
        (vec![640], 0),
        (vec![640, 360], 1),
        (vec![10, 20, 30, 40, 50], 2),
    ] {
        probe.emit_blobs(descriptors);
        assert!(matches!(
            presenter.present_pending(),
            Some(PresentedView::Overlay { markers, .. }) if markers == expected
        ));
    }
    assert_eq!(presenter.overlay_image().unwrap().dimensions(), (1280, 720));
}

#[test]
fn test_frame_from_previous_mode_is_stale() {
    let (mut controller, probe, _host) = setup(manual());
    let mut presenter = controller.presenter();
    controller.select_mode(Mode::AmplitudeView).unwrap();

    probe.emit_amplitude(0);
    controller.select_mode(Mode::Calibration).unwrap();

    assert_eq!(presenter.present_pending(), None);
    assert_eq!(presenter.stale(), 1);
}

#[test]
fn test_malformed_buffer_dropped() {
    let (mut controller, probe, _host) = setup(manual());
    let mut presenter = controller.presenter();
    controller.select_mode(Mode::DepthView).unwrap();

    probe.emit_pixels(vec![0; 10]);
    assert_eq!(presenter.present_pending(), None);
    assert_eq!(controller.frame_stats().malformed, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_streaming_capture_thread_reaches_presenter() {
    let (mut controller, _probe, _host) = setup(SimulatedOptions {
        frame_interval: Duration::from_millis(2),
        ..SimulatedOptions::default()
    });
    let mut presenter = controller.presenter();
    controller.select_mode(Mode::DepthView).unwrap();

    for _ in 0..3 {
        let view = tokio::time::timeout(Duration::from_secs(5), presenter.next_frame())
            .await
            .expect("frame within timeout");
        assert!(matches!(view, Some(PresentedView::Camera { .. })));
    }
    assert_eq!(presenter.allocations(), 1);

    controller.on_destroy();
}
