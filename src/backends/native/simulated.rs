// SPDX-License-Identifier: GPL-3.0-only

//! Simulated time-of-flight driver
//!
//! Behaves like the real driver at the command boundary: it reports a sensor
//! resolution on open, streams synthetic amplitude frames in live-view modes
//! and synthetic blob centers in the test mode from its own capture thread,
//! and answers solver calls with configurable results. A [`SimulatedProbe`]
//! shares its state so callers can script failures and inspect the commands
//! that were issued.

use super::{FrameSink, NativeCamera};
use crate::backends::frame_loop::{CaptureLoop, LoopAction};
use crate::backends::usb::TransportHandle;
use crate::constants::{overlay, timing};
use crate::mode::{ModeRole, ModeSet};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sensor resolution of a pico flexx
const DEFAULT_RESOLUTION: [i32; 2] = [224, 172];

/// A command received by the simulated driver
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCommand {
    Open {
        handle: TransportHandle,
        vendor_id: u16,
        product_id: u16,
    },
    RegisterCallback,
    StartCapture,
    StopCapture,
    ChangeMode(i32),
    AddPoint,
    ComputeCalibration,
    ToggleFlip,
    LoadCalibration([f64; 4]),
}

/// Behaviour of the simulated driver
#[derive(Debug, Clone)]
pub struct SimulatedOptions {
    /// What `open` reports; a non-positive width simulates an open failure
    pub resolution: [i32; 2],
    /// Layout used to interpret mode codes
    pub mode_set: ModeSet,
    /// Pace of the capture thread
    pub frame_interval: Duration,
    /// Run a capture thread; when off, frames only arrive through the probe
    pub stream_frames: bool,
    pub start_succeeds: bool,
    pub stop_succeeds: bool,
    /// Whether `add_point` finds a usable retro-reflector
    pub accept_points: bool,
    /// Solver output once at least one point exists
    pub coefficients: [f64; 4],
    /// Number of blob centers streamed in the test mode
    pub blob_count: usize,
    /// Projector display size the blob centers are spread across
    pub projector_size: (u32, u32),
}

impl Default for SimulatedOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            mode_set: ModeSet::default(),
            frame_interval: timing::SIMULATED_FRAME_INTERVAL,
            stream_frames: true,
            start_succeeds: true,
            stop_succeeds: true,
            accept_points: true,
            coefficients: [12.5, -0.021, -8.75, -0.017],
            blob_count: 3,
            projector_size: (overlay::PROJECTOR_WIDTH, overlay::PROJECTOR_HEIGHT),
        }
    }
}

#[derive(Default)]
struct SimState {
    options: SimulatedOptions,
    commands: Vec<NativeCommand>,
    sink: Option<Arc<dyn FrameSink>>,
    opened: Option<[i32; 2]>,
    mode_code: i32,
    points: usize,
    flipped: bool,
    loaded: Option<[f64; 4]>,
}

impl SimState {
    fn frame_role(&self) -> Option<ModeRole> {
        let index = usize::try_from(self.mode_code).ok()?.checked_sub(1)?;
        self.options
            .mode_set
            .modes()
            .get(index)
            .map(|mode| mode.role())
    }
}

type SharedState = Arc<Mutex<SimState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// The simulated driver
pub struct SimulatedCamera {
    state: SharedState,
    capture: Option<CaptureLoop>,
}

impl SimulatedCamera {
    pub fn new(options: SimulatedOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                options,
                ..SimState::default()
            })),
            capture: None,
        }
    }

    /// Shared view of the driver state
    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn record(&self, command: NativeCommand) -> MutexGuard<'_, SimState> {
        let mut state = lock(&self.state);
        state.commands.push(command);
        state
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(SimulatedOptions::default())
    }
}

impl NativeCamera for SimulatedCamera {
    fn open(&mut self, transport: TransportHandle, vendor_id: u16, product_id: u16) -> [i32; 2] {
        let mut state = self.record(NativeCommand::Open {
            handle: transport,
            vendor_id,
            product_id,
        });
        let resolution = state.options.resolution;
        if resolution[0] > 0 {
            state.opened = Some(resolution);
            info!(
                width = resolution[0],
                height = resolution[1],
                "Simulated camera opened"
            );
        } else {
            warn!("Simulated camera refused to open");
        }
        resolution
    }

    fn register_callback(&mut self, sink: Arc<dyn FrameSink>) {
        self.record(NativeCommand::RegisterCallback).sink = Some(sink);
    }

    fn start_capture(&mut self) -> bool {
        let (succeeds, interval, stream) = {
            let state = self.record(NativeCommand::StartCapture);
            (
                state.opened.is_some() && state.options.start_succeeds,
                state.options.frame_interval,
                state.options.stream_frames,
            )
        };
        if !succeeds {
            return false;
        }
        if !stream || self.capture.as_ref().is_some_and(CaptureLoop::is_running) {
            return true;
        }

        let state = Arc::clone(&self.state);
        match CaptureLoop::spawn("tof-capture", interval, move |frame| {
            deliver_frame(&state, frame);
            LoopAction::Continue
        }) {
            Ok(capture) => {
                self.capture = Some(capture);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to spawn simulated capture thread");
                false
            }
        }
    }

    fn stop_capture(&mut self) -> bool {
        let succeeds = self.record(NativeCommand::StopCapture).options.stop_succeeds;
        if succeeds {
            if let Some(mut capture) = self.capture.take() {
                capture.stop();
            }
        }
        succeeds
    }

    fn change_mode(&mut self, code: i32) {
        let mut state = self.record(NativeCommand::ChangeMode(code));
        state.mode_code = code;
        debug!(code, role = ?state.frame_role(), "Simulated driver mode changed");
    }

    fn add_point(&mut self) -> bool {
        let mut state = self.record(NativeCommand::AddPoint);
        if state.options.accept_points {
            state.points += 1;
            true
        } else {
            false
        }
    }

    fn compute_calibration(&mut self) -> [f64; 4] {
        let state = self.record(NativeCommand::ComputeCalibration);
        if state.points == 0 {
            // An empty fit divides by zero in the real solver as well
            [f64::NAN; 4]
        } else {
            state.options.coefficients
        }
    }

    fn toggle_flip(&mut self) {
        let mut state = self.record(NativeCommand::ToggleFlip);
        state.flipped = !state.flipped;
    }

    fn load_calibration(&mut self, coefficients: [f64; 4]) {
        self.record(NativeCommand::LoadCalibration(coefficients)).loaded = Some(coefficients);
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
    }
}

/// One capture-thread iteration: synthesise whatever the current mode streams
fn deliver_frame(state: &SharedState, frame: u64) {
    let (sink, role, resolution, blob_count, projector) = {
        let state = lock(state);
        (
            state.sink.clone(),
            state.frame_role(),
            state.opened,
            state.options.blob_count,
            state.options.projector_size,
        )
    };
    let (Some(sink), Some(role), Some([width, height])) = (sink, role, resolution) else {
        return;
    };

    match role {
        ModeRole::LiveView => sink.on_amplitude(amplitude_pattern(width, height, frame)),
        ModeRole::Diagnostic => sink.on_blobs(blob_pattern(blob_count, projector, frame)),
        ModeRole::Interactive => {}
    }
}

/// Gray ramp scrolling one column per frame, as opaque ARGB
pub fn amplitude_pattern(width: i32, height: i32, frame: u64) -> Vec<u32> {
    let (width, height) = (width.max(0) as u64, height.max(0) as u64);
    (0..width * height)
        .map(|i| {
            let gray = ((i % width.max(1) + frame) % 256) as u32;
            0xFF00_0000 | gray << 16 | gray << 8 | gray
        })
        .collect()
}

/// Blob centers orbiting the projector center
pub fn blob_pattern(count: usize, (width, height): (u32, u32), frame: u64) -> Vec<i32> {
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let radius = cx.min(cy) / 2.0;
    let phase = frame as f64 * 0.05;
    (0..count)
        .flat_map(|k| {
            let angle = phase + TAU * k as f64 / count as f64;
            [
                (cx + radius * angle.cos()).round() as i32,
                (cy + radius * angle.sin()).round() as i32,
            ]
        })
        .collect()
}

/// Shared handle onto a [`SimulatedCamera`]
#[derive(Clone)]
pub struct SimulatedProbe {
    state: SharedState,
}

impl SimulatedProbe {
    /// Commands issued so far, oldest first
    pub fn commands(&self) -> Vec<NativeCommand> {
        lock(&self.state).commands.clone()
    }

    /// How many times a command matching `predicate` was issued
    pub fn count(&self, predicate: impl Fn(&NativeCommand) -> bool) -> usize {
        lock(&self.state)
            .commands
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    /// Last mode code sent through `change_mode`
    pub fn mode_code(&self) -> i32 {
        lock(&self.state).mode_code
    }

    /// Points accepted by the solver
    pub fn points(&self) -> usize {
        lock(&self.state).points
    }

    pub fn flipped(&self) -> bool {
        lock(&self.state).flipped
    }

    /// Whether a callback sink has been registered
    pub fn has_callback(&self) -> bool {
        lock(&self.state).sink.is_some()
    }

    /// Coefficients installed through `load_calibration`
    pub fn loaded_calibration(&self) -> Option<[f64; 4]> {
        lock(&self.state).loaded
    }

    pub fn set_accept_points(&self, accept: bool) {
        lock(&self.state).options.accept_points = accept;
    }

    pub fn set_start_succeeds(&self, succeeds: bool) {
        lock(&self.state).options.start_succeeds = succeeds;
    }

    pub fn set_coefficients(&self, coefficients: [f64; 4]) {
        lock(&self.state).options.coefficients = coefficients;
    }

    /// Deliver one amplitude frame through the registered sink on the calling thread
    ///
    /// Returns false if no sink is registered or the camera is not open.
    pub fn emit_amplitude(&self, frame: u64) -> bool {
        let (sink, resolution) = {
            let state = lock(&self.state);
            (state.sink.clone(), state.opened)
        };
        match (sink, resolution) {
            (Some(sink), Some([w, h])) => {
                sink.on_amplitude(amplitude_pattern(w, h, frame));
                true
            }
            _ => false,
        }
    }

    /// Deliver an arbitrary pixel buffer, e.g. one of the wrong length
    pub fn emit_pixels(&self, pixels: Vec<u32>) -> bool {
        let sink = lock(&self.state).sink.clone();
        match sink {
            Some(sink) => {
                sink.on_amplitude(pixels);
                true
            }
            None => false,
        }
    }

    /// Deliver a blob-descriptor array through the registered sink
    pub fn emit_blobs(&self, descriptors: Vec<i32>) -> bool {
        let sink = lock(&self.state).sink.clone();
        match sink {
            Some(sink) => {
                sink.on_blobs(descriptors);
                true
            }
            None => false,
        }
    }
}
