// SPDX-License-Identifier: GPL-3.0-only

//! Projector-camera calibration
//!
//! The native solver owns the math. This module collects calibration points,
//! asks the solver for the four coefficients and moves them to and from
//! plain-text files, one decimal value per line.

pub mod storage;
pub mod workflow;

pub use storage::{CalibrationStore, LoadedCalibration, parse_coefficients};
pub use workflow::{CalibrationPoint, CalibrationWorkflow};

use crate::constants::calibration::COEFFICIENT_COUNT;

/// The four solver coefficients, in solver order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coefficients(pub [f64; COEFFICIENT_COUNT]);

impl Coefficients {
    pub fn values(&self) -> [f64; COEFFICIENT_COUNT] {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<[f64; COEFFICIENT_COUNT]> for Coefficients {
    fn from(values: [f64; COEFFICIENT_COUNT]) -> Self {
        Self(values)
    }
}

impl std::fmt::Display for Coefficients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "[{}, {}, {}, {}]", a, b, c, d)
    }
}
