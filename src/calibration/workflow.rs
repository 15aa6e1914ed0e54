// SPDX-License-Identifier: GPL-3.0-only

//! Point collection and solver round trips

use super::storage::{CalibrationStore, LoadedCalibration};
use super::Coefficients;
use crate::backends::NativeCamera;
use crate::errors::{AppResult, CalibrationError};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// One observation accepted by the solver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationPoint {
    /// 1-based position in the current collection
    pub sequence: usize,
    pub added_at: SystemTime,
}

/// Calibration state kept between user actions
#[derive(Debug)]
pub struct CalibrationWorkflow {
    points: Vec<CalibrationPoint>,
    store: CalibrationStore,
}

impl CalibrationWorkflow {
    pub fn new(store: CalibrationStore) -> Self {
        Self {
            points: Vec::new(),
            store,
        }
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Forget collected points (entering calibration from another mode)
    pub fn reset(&mut self) {
        if !self.points.is_empty() {
            debug!(discarded = self.points.len(), "Clearing calibration points");
        }
        self.points.clear();
    }

    /// Ask the solver to record the current observation
    pub fn add_point(
        &mut self,
        native: &mut dyn NativeCamera,
    ) -> Result<&CalibrationPoint, CalibrationError> {
        if !native.add_point() {
            warn!(collected = self.points.len(), "Calibration point rejected");
            return Err(CalibrationError::PointRejected);
        }
        let sequence = self.points.len() + 1;
        info!(sequence, "Calibration point added");
        self.points.push(CalibrationPoint {
            sequence,
            added_at: SystemTime::now(),
        });
        Ok(&self.points[sequence - 1])
    }

    /// Solve for the coefficients
    ///
    /// The solver keeps its own observations across mode changes, so it is
    /// asked even when this collection is empty. An empty fit comes back
    /// non-finite.
    pub fn compute(&self, native: &mut dyn NativeCamera) -> Result<Coefficients, CalibrationError> {
        let coefficients = Coefficients(native.compute_calibration());
        if !coefficients.is_finite() {
            warn!(%coefficients, "Solver returned non-finite coefficients");
            return Err(CalibrationError::InvalidResult(coefficients.values()));
        }
        info!(points = self.points.len(), %coefficients, "Calibration computed");
        Ok(coefficients)
    }

    /// Persist coefficients under the current local time
    pub fn save(&self, coefficients: &Coefficients, flipped: bool) -> AppResult<PathBuf> {
        self.save_at(coefficients, flipped, Local::now().naive_local())
    }

    pub fn save_at(
        &self,
        coefficients: &Coefficients,
        flipped: bool,
        at: NaiveDateTime,
    ) -> AppResult<PathBuf> {
        self.store.save(coefficients, flipped, at)
    }

    /// Read a calibration file and hand its coefficients to the solver
    ///
    /// Incomplete files are still installed (missing values are zero); the
    /// caller can tell from `values_read`.
    pub fn load(&self, path: &Path, native: &mut dyn NativeCamera) -> AppResult<LoadedCalibration> {
        let loaded = CalibrationStore::read(path)?;
        native.load_calibration(loaded.coefficients.values());
        info!(
            path = %path.display(),
            values_read = loaded.values_read,
            coefficients = %loaded.coefficients,
            "Calibration loaded"
        );
        Ok(loaded)
    }
}
