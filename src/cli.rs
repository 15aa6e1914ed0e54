// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing attached USB devices
//! - Running a mode end to end against the simulated camera
//! - Loading a saved calibration file
//! - Showing the configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tof_calibrator::backends::{
    MemoryUsbHost, NusbHost, SimulatedCamera, SimulatedOptions, UsbDeviceInfo,
};
use tof_calibrator::calibration::CalibrationStore;
use tof_calibrator::constants::{timing, usb};
use tof_calibrator::mode::ModeRole;
use tof_calibrator::notice::{self, NoticeReceiver};
use tof_calibrator::router::{PresentedView, Presenter};
use tof_calibrator::session::{DeviceSession, ResolutionCell};
use tof_calibrator::{CameraController, Config, ModeOutcome, ModeSet};

/// Product id reported by the simulated camera
const SIMULATED_PRODUCT_ID: u16 = 0xC012;

/// List attached USB devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let session = DeviceSession::new(Box::new(NusbHost::new()), ResolutionCell::new());
    let devices = session.list_devices();

    if devices.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("USB devices:");
    println!();
    for (index, (device, supported)) in devices.iter().enumerate() {
        let marker = if *supported { "*" } else { " " };
        println!("  {} [{}] {}", marker, index, device);
    }
    println!();
    if devices.iter().any(|(_, supported)| *supported) {
        println!("* supported camera");
    } else {
        println!("No camera found");
    }

    Ok(())
}

/// Options for the `demo` command
pub struct DemoOptions {
    pub mode_set: Option<ModeSet>,
    pub mode: String,
    pub seconds: u64,
    pub points: usize,
    pub snapshot: Option<PathBuf>,
    pub flip: bool,
}

/// Select a mode on a simulated camera and exercise it
pub fn run_demo(mut config: Config, options: DemoOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(mode_set) = options.mode_set {
        config.mode_set = mode_set;
    }
    let mode = config.mode_set.mode_by_name(&options.mode).ok_or_else(|| {
        let names: Vec<&str> = config
            .mode_set
            .modes()
            .iter()
            .map(|m| m.display_name())
            .collect();
        format!(
            "Unknown mode '{}' (available: {})",
            options.mode,
            names.join(", ")
        )
    })?;

    // A bus with an unsupported device first, then the camera
    let host = MemoryUsbHost::new();
    host.attach(UsbDeviceInfo::new(0x046d, 0x0825, "USB webcam"), true);
    host.attach(
        UsbDeviceInfo::new(usb::VENDOR_PMD, SIMULATED_PRODUCT_ID, "pico flexx (simulated)"),
        false,
    );
    let native = SimulatedCamera::new(SimulatedOptions {
        mode_set: config.mode_set,
        projector_size: config.projector_size(),
        ..SimulatedOptions::default()
    });

    let (mut controller, mut notices) =
        CameraController::new(&config, Box::new(host.clone()), Box::new(native));
    let mut presenter = controller.presenter();

    println!("Calibration directory: {}", controller.calibration_store().dir().display());
    println!("Selecting {}...", mode);

    match controller.select_mode(mode)? {
        ModeOutcome::Applied(_) => {}
        ModeOutcome::AwaitingPermission(pending) => {
            println!("Permission requested for {}, granting", pending.device);
            host.set_permission(&pending.device, true);
            controller.on_permission_result(pending.id, true)?;
        }
        ModeOutcome::StillPending(id) => {
            return Err(format!("Permission request {} is still pending", id).into());
        }
    }
    print_notices(&mut notices);
    println!("Camera: {}", controller.state());

    if options.flip {
        let flipped = controller.toggle_flip();
        println!("Orientation flipped: {}", flipped);
    }

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    match mode.role() {
        ModeRole::Interactive => {
            collect_and_compute(&mut controller, &mut notices, options.points, &stop_flag)?
        }
        ModeRole::LiveView | ModeRole::Diagnostic => {
            println!("Streaming for {}s (press Ctrl+C to stop early)", options.seconds);
            let rt = tokio::runtime::Runtime::new()?;
            let presented = rt.block_on(stream_frames(
                &mut presenter,
                Duration::from_secs(options.seconds),
                &stop_flag,
            ));
            let stats = controller.frame_stats();
            println!(
                "Presented {} frames ({} forwarded, {} not for this mode, {} stale)",
                presented,
                stats.forwarded,
                stats.inactive,
                presenter.stale()
            );
            if let Some(image) = presenter.camera_image() {
                println!("Camera image: {}x{}", image.width(), image.height());
            }
        }
    }

    if let Some(path) = &options.snapshot {
        match presenter.save_snapshot(path) {
            Ok(()) => println!("Snapshot saved: {}", path.display()),
            Err(e) => eprintln!("No snapshot: {}", e),
        }
    }

    controller.on_destroy();
    print_notices(&mut notices);
    Ok(())
}

fn collect_and_compute(
    controller: &mut CameraController,
    notices: &mut NoticeReceiver,
    points: usize,
    stop_flag: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..points {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        if let Err(e) = controller.add_point() {
            eprintln!("{}", e);
        }
        print_notices(notices);
        std::thread::sleep(timing::SIMULATED_FRAME_INTERVAL);
    }

    println!("Collected {} points, computing...", controller.points());
    let result = controller.compute_and_save();
    print_notices(notices);
    let path = result?;
    println!("Calibration saved: {}", path.display());
    Ok(())
}

async fn stream_frames(presenter: &mut Presenter, duration: Duration, stop_flag: &AtomicBool) -> u64 {
    let deadline = tokio::time::Instant::now() + duration;
    while !stop_flag.load(Ordering::SeqCst) {
        let next = tokio::time::timeout_at(deadline, presenter.next_frame()).await;
        match next {
            Ok(Some(view)) => {
                if presenter.presented() % timing::FRAME_LOG_INTERVAL == 1 {
                    match view {
                        PresentedView::Camera { sequence } => {
                            println!("  frame {} (camera)", sequence)
                        }
                        PresentedView::Overlay { sequence, markers } => {
                            println!("  frame {} ({} markers)", sequence, markers)
                        }
                    }
                }
            }
            Ok(None) | Err(_) => break,
        }
    }
    presenter.presented()
}

/// Load a calibration file through the regular load path
///
/// Without a native driver attached this validates the file and shows the
/// coefficients the driver would receive.
pub fn load_calibration(config: &Config, file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = match file {
        Some(path) => path,
        None => {
            let store = CalibrationStore::new(config.calibration_dir());
            store
                .latest()?
                .ok_or_else(|| format!("No calibration files in {}", store.dir().display()))?
        }
    };

    let (mut controller, mut notices) = CameraController::new(
        config,
        Box::new(NusbHost::new()),
        Box::new(SimulatedCamera::default()),
    );
    let result = controller.load_calibration(&path);
    print_notices(&mut notices);
    let loaded = result?;

    println!("File: {}", loaded.path.display());
    for (index, value) in loaded.coefficients.values().iter().enumerate() {
        println!("  c{} = {}", index, value);
    }
    if !loaded.is_complete() {
        println!("Only {} values present; the rest are zero", loaded.values_read);
    }
    Ok(())
}

/// Print the configuration in effect
pub fn show_config(config: &Config, path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match path.or_else(Config::default_path) {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} (not present, defaults)", path.display()),
        None => println!("Config file: none"),
    }
    println!("Calibration directory: {}", config.calibration_dir().display());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn print_notices(receiver: &mut NoticeReceiver) {
    for notice in notice::drain(receiver) {
        println!("> {}", notice);
    }
}
