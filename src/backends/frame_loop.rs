// SPDX-License-Identifier: GPL-3.0-only
//! Capture thread lifecycle
//!
//! Drivers deliver frame callbacks from a dedicated thread. This module owns
//! that thread: it paces iterations at a fixed interval, hands each iteration
//! its frame counter and stops either on request or when the iteration asks to.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by one iteration to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep delivering frames
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// A paced capture loop running on its own named thread
///
/// # Example
///
/// ```ignore
/// let mut capture = CaptureLoop::spawn("tof-capture", Duration::from_millis(33), |frame| {
///     sink.on_amplitude(read_frame(frame));
///     LoopAction::Continue
/// })?;
///
/// // Later
/// capture.stop();
/// ```
pub struct CaptureLoop {
    thread_handle: Option<JoinHandle<u64>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoop {
    /// Spawn the loop
    ///
    /// `iteration` is called with a frame counter starting at 0, at most once
    /// per `interval`. Returns an error only if the OS refuses to spawn the
    /// thread.
    pub fn spawn<F>(name: &str, interval: Duration, mut iteration: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut frame = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    let started = Instant::now();
                    if iteration(frame) == LoopAction::Stop {
                        debug!(name = %thread_name, frame, "Loop requested stop");
                        frame += 1;
                        break;
                    }
                    frame += 1;
                    if let Some(rest) = interval.checked_sub(started.elapsed()) {
                        thread::sleep(rest);
                    }
                }
                info!(name = %thread_name, frames = frame, "Capture loop exiting");
                frame
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Whether the thread is still delivering
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread
    ///
    /// Returns the number of iterations that ran, or `None` if the loop was
    /// already joined.
    pub fn stop(&mut self) -> Option<u64> {
        self.request_stop();
        self.wait()
    }

    /// Wait for the loop to end on its own, without requesting a stop
    pub fn wait(&mut self) -> Option<u64> {
        let handle = self.thread_handle.take()?;
        match handle.join() {
            Ok(frames) => Some(frames),
            Err(e) => {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
                None
            }
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoop dropped, stopping");
            self.stop();
        }
    }
}
