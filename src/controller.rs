// SPDX-License-Identifier: GPL-3.0-only

//! Mode state machine and user actions
//!
//! The controller lives on the UI/control thread and is the only writer of
//! the session, the current mode and the calibration state. The capture
//! thread sees the mode through the shared [`ModeCell`] and delivers frames to
//! the [`FrameRouter`].
//!
//! Selecting a mode always runs the same steps:
//!
//! 1. make sure the session is open (may suspend on a permission request)
//! 2. make sure capture is running
//! 3. send the mode's native code
//! 4. record the mode
//! 5. update which calibration controls are visible
//!
//! A failure in step 1 or 2 blocks the transition; nothing after it runs.

use crate::backends::{FrameSink, NativeCamera, UsbDeviceInfo, UsbHost};
use crate::calibration::{CalibrationStore, CalibrationWorkflow, LoadedCalibration};
use crate::config::Config;
use crate::errors::{AppError, AppResult, CalibrationError, SessionError};
use crate::mode::{ControlVisibility, Mode, ModeCell, ModeRole, ModeSet};
use crate::notice::{Notice, NoticeReceiver, Notifier};
use crate::router::{FrameRouter, Presenter, RouterCounts};
use crate::session::{
    DeviceSession, OpenOutcome, PendingPermission, PermissionResolution, RequestId,
    ResolutionCell, SessionState,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a mode selection that did not fail
#[derive(Debug)]
pub enum ModeOutcome {
    /// Mode is active
    Applied(Mode),
    /// A permission dialog was opened; the mode is applied once it is granted
    AwaitingPermission(PendingPermission),
    /// The permission dialog from an earlier selection is still open
    StillPending(RequestId),
}

impl ModeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ModeOutcome::Applied(_))
    }
}

pub struct CameraController {
    session: DeviceSession,
    native: Box<dyn NativeCamera>,
    router: Arc<FrameRouter>,
    mode_set: ModeSet,
    mode: Mode,
    mode_cell: ModeCell,
    controls: ControlVisibility,
    /// Mode to apply once a pending permission request is granted
    deferred_mode: Option<Mode>,
    workflow: CalibrationWorkflow,
    flipped: bool,
    projector_size: (u32, u32),
    notifier: Notifier,
    destroyed: bool,
}

impl CameraController {
    pub fn new(
        config: &Config,
        host: Box<dyn UsbHost>,
        native: Box<dyn NativeCamera>,
    ) -> (Self, NoticeReceiver) {
        let mode_set = config.mode_set;
        let mode = mode_set.initial_mode();
        let mode_cell = ModeCell::new(mode);
        let resolution = ResolutionCell::new();
        let router = Arc::new(FrameRouter::new(mode_cell.clone(), resolution.clone()));
        let (notifier, notices) = Notifier::channel();
        let store = CalibrationStore::new(config.calibration_dir());

        info!(
            ?mode_set,
            %mode,
            calibration_dir = %store.dir().display(),
            "Controller created"
        );

        let controller = Self {
            session: DeviceSession::new(host, resolution),
            native,
            router,
            mode_set,
            mode,
            mode_cell,
            controls: ControlVisibility::for_mode(mode),
            deferred_mode: None,
            workflow: CalibrationWorkflow::new(store),
            flipped: config.flip_on_start,
            projector_size: config.projector_size(),
            notifier,
            destroyed: false,
        };
        (controller, notices)
    }

    fn sink(&self) -> Arc<dyn FrameSink> {
        self.router.clone()
    }

    /// Switch to `mode`, opening the camera and starting capture as needed
    pub fn select_mode(&mut self, mode: Mode) -> AppResult<ModeOutcome> {
        let Some(code) = self.mode_set.native_code(mode) else {
            return Err(AppError::Other(format!(
                "{} is not available in the {:?} layout",
                mode, self.mode_set
            )));
        };

        let sink = self.sink();
        match self.session.discover_and_open(self.native.as_mut(), &sink) {
            Ok(OpenOutcome::Opened(_)) => {}
            Ok(OpenOutcome::AwaitingPermission(pending)) => {
                info!(%mode, request = %pending.id, "Mode selection waits for USB permission");
                self.deferred_mode = Some(mode);
                return Ok(ModeOutcome::AwaitingPermission(pending));
            }
            Ok(OpenOutcome::StillPending(id)) => {
                self.deferred_mode = Some(mode);
                return Ok(ModeOutcome::StillPending(id));
            }
            Err(e) => {
                if e == SessionError::NoCameraFound {
                    self.notifier.send(Notice::NoCameraFound);
                }
                warn!(%mode, error = %e, "Mode change blocked: camera not open");
                return Err(e.into());
            }
        }

        if let Err(e) = self.session.start_capture(self.native.as_mut()) {
            warn!(%mode, error = %e, "Mode change blocked: capture not running");
            return Err(e.into());
        }

        self.apply_mode(mode, code);
        Ok(ModeOutcome::Applied(mode))
    }

    fn apply_mode(&mut self, mode: Mode, code: i32) {
        self.native.change_mode(code);

        let previous = self.mode;
        if mode.role() == ModeRole::Interactive && previous != mode {
            self.workflow.reset();
        }
        self.mode = mode;
        self.mode_cell.store(mode);
        self.controls = ControlVisibility::for_mode(mode);
        self.deferred_mode = None;

        if previous != mode {
            info!(from = %previous, to = %mode, code, "Mode changed");
            self.notifier.send(Notice::ModeChanged(mode));
        } else {
            debug!(%mode, code, "Mode reselected");
        }
    }

    /// Host event: the user answered a permission dialog
    ///
    /// When access is granted the open sequence completes and a mode selected
    /// while waiting is applied. Returns the outcome of that selection.
    pub fn on_permission_result(
        &mut self,
        request: RequestId,
        granted: bool,
    ) -> AppResult<Option<ModeOutcome>> {
        let sink = self.sink();
        let resolution =
            self.session
                .complete_permission(request, granted, self.native.as_mut(), &sink)?;

        match resolution {
            PermissionResolution::Ignored => Ok(None),
            PermissionResolution::Denied(device) => {
                self.deferred_mode = None;
                Err(SessionError::PermissionDenied {
                    vendor_id: device.vendor_id,
                    product_id: device.product_id,
                }
                .into())
            }
            PermissionResolution::Opened(resolution) => {
                debug!(%resolution, deferred = ?self.deferred_mode, "Permission completed open");
                match self.deferred_mode.take() {
                    Some(mode) => self.select_mode(mode).map(Some),
                    None => Ok(None),
                }
            }
        }
    }

    /// Host event: app came to the foreground
    pub fn on_resume(&mut self) -> AppResult<()> {
        self.session.set_listening(true);
        if self.session.is_open() {
            self.session.start_capture(self.native.as_mut())?;
        }
        Ok(())
    }

    /// Host event: app went to the background
    pub fn on_pause(&mut self) -> AppResult<()> {
        self.session.set_listening(false);
        self.session.stop_capture(self.native.as_mut())?;
        Ok(())
    }

    /// Host event: app is terminating
    ///
    /// Stops capture and releases the transport. Safe to call more than once.
    pub fn on_destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Err(e) = self.session.stop_capture(self.native.as_mut()) {
            warn!(error = %e, "Capture did not stop cleanly on shutdown");
        }
        self.session.cancel_permissions();
        self.session.close();
        info!("Controller destroyed");
    }

    /// Host event: a USB device was removed
    pub fn on_device_detached(&mut self, device: &UsbDeviceInfo) {
        if self.session.on_device_detached(device, self.native.as_mut()) {
            self.deferred_mode = None;
        }
    }

    /// Flip the camera image orientation
    pub fn toggle_flip(&mut self) -> bool {
        self.native.toggle_flip();
        self.flipped = !self.flipped;
        info!(flipped = self.flipped, "Orientation toggled");
        self.flipped
    }

    fn require_interactive(&self) -> Result<(), CalibrationError> {
        if self.mode.role() == ModeRole::Interactive {
            Ok(())
        } else {
            Err(CalibrationError::NotInCalibrationMode)
        }
    }

    /// Record a calibration point; returns the number collected so far
    pub fn add_point(&mut self) -> AppResult<usize> {
        self.require_interactive()?;
        match self.workflow.add_point(self.native.as_mut()) {
            Ok(point) => {
                let count = point.sequence;
                self.notifier.send(Notice::PointAdded { count });
                Ok(count)
            }
            Err(e) => {
                self.notifier.send(Notice::PointRejected);
                Err(e.into())
            }
        }
    }

    /// Solve for the coefficients and save them; returns the written file
    pub fn compute_and_save(&mut self) -> AppResult<PathBuf> {
        self.require_interactive()?;
        let result = self
            .workflow
            .compute(self.native.as_mut())
            .map_err(AppError::from)
            .and_then(|coefficients| self.workflow.save(&coefficients, self.flipped));

        match result {
            Ok(path) => {
                self.notifier.send(Notice::CalibrationSaved(path.clone()));
                Ok(path)
            }
            Err(e) => {
                warn!(error = %e, "Calibration not saved");
                self.notifier.send(Notice::CalibrationNotSaved);
                Err(e)
            }
        }
    }

    /// Install coefficients from a saved calibration file
    pub fn load_calibration(&mut self, path: &Path) -> AppResult<LoadedCalibration> {
        match self.workflow.load(path, self.native.as_mut()) {
            Ok(loaded) => {
                self.notifier
                    .send(Notice::CalibrationLoaded(loaded.path.clone()));
                if !loaded.is_complete() {
                    self.notifier.send(Notice::CalibrationIncomplete {
                        values_read: loaded.values_read,
                    });
                }
                Ok(loaded)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Calibration not loaded");
                self.notifier.send(Notice::CalibrationNotLoaded);
                Err(e)
            }
        }
    }

    /// Presenter fed by this controller's router
    pub fn presenter(&self) -> Presenter {
        Presenter::new(
            self.router.subscribe(),
            self.mode_cell.clone(),
            self.projector_size,
        )
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn mode_set(&self) -> ModeSet {
        self.mode_set
    }

    pub fn controls(&self) -> ControlVisibility {
        self.controls
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    /// Mode waiting for a permission grant
    pub fn deferred_mode(&self) -> Option<Mode> {
        self.deferred_mode
    }

    pub fn points(&self) -> usize {
        self.workflow.points().len()
    }

    pub fn calibration_store(&self) -> &CalibrationStore {
        self.workflow.store()
    }

    pub fn device(&self) -> Option<&UsbDeviceInfo> {
        self.session.device()
    }

    pub fn frame_stats(&self) -> RouterCounts {
        self.router.stats()
    }

    /// Attached devices with their support status
    pub fn list_devices(&self) -> Vec<(UsbDeviceInfo, bool)> {
        self.session.list_devices()
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.on_destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryUsbHost, SimulatedCamera};

    fn controller(host: &MemoryUsbHost) -> (CameraController, NoticeReceiver) {
        let config = Config {
            storage_root: Some(std::env::temp_dir().join("tof-calibrator-unit")),
            ..Config::default()
        };
        CameraController::new(
            &config,
            Box::new(host.clone()),
            Box::new(SimulatedCamera::default()),
        )
    }

    #[test]
    fn test_initial_state() {
        let (controller, _notices) = controller(&MemoryUsbHost::new());
        assert_eq!(controller.mode(), Mode::AmplitudeView);
        assert_eq!(controller.state(), SessionState::Closed);
        assert!(controller.flipped());
        assert!(!controller.controls().add_point);
    }

    #[test]
    fn test_mode_outside_layout_is_rejected() {
        let (mut controller, _notices) = controller(&MemoryUsbHost::new());
        assert!(matches!(
            controller.select_mode(Mode::Project),
            Err(AppError::Other(_))
        ));
    }

    #[test]
    fn test_add_point_outside_calibration() {
        let host = MemoryUsbHost::new();
        host.attach(UsbDeviceInfo::new(0x1C28, 0xC012, "pico flexx"), true);
        let (mut controller, _notices) = controller(&host);
        controller.select_mode(Mode::DepthView).unwrap();

        assert_eq!(
            controller.add_point(),
            Err(AppError::Calibration(CalibrationError::NotInCalibrationMode))
        );
    }

    #[test]
    fn test_destroy_releases_transport_once() {
        let host = MemoryUsbHost::new();
        host.attach(UsbDeviceInfo::new(0x1C28, 0xC012, "pico flexx"), true);
        let (mut controller, _notices) = controller(&host);
        controller.select_mode(Mode::AmplitudeView).unwrap();

        controller.on_destroy();
        controller.on_destroy();
        drop(controller);
        assert_eq!(host.closed_transports(), 1);
    }
}
