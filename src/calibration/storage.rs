// SPDX-License-Identifier: GPL-3.0-only

//! Calibration files
//!
//! A calibration file is UTF-8 text with one coefficient per line, in solver
//! order. Files are named after the minute they were saved in, with a suffix
//! when the camera image was flipped:
//!
//! ```text
//! <calibration dir>/2024_03_09_14_05.txt
//! <calibration dir>/2024_03_09_14_07_flipped.txt
//! ```
//!
//! Saving twice within the same minute replaces the earlier file.

use super::Coefficients;
use crate::constants::calibration::{
    COEFFICIENT_COUNT, FILE_EXTENSION, FILE_TIMESTAMP_FORMAT, FLIPPED_SUFFIX,
};
use crate::errors::{AppError, AppResult, CalibrationError};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Coefficients read back from a file
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCalibration {
    pub path: PathBuf,
    /// Missing trailing values are zero
    pub coefficients: Coefficients,
    /// How many values the file actually provided
    pub values_read: usize,
}

impl LoadedCalibration {
    pub fn is_complete(&self) -> bool {
        self.values_read == COEFFICIENT_COUNT
    }
}

/// Directory holding calibration files
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    dir: PathBuf,
}

impl CalibrationStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a calibration saved at `at`
    pub fn file_name(at: &NaiveDateTime, flipped: bool) -> String {
        format!(
            "{}{}.{}",
            at.format(FILE_TIMESTAMP_FORMAT),
            if flipped { FLIPPED_SUFFIX } else { "" },
            FILE_EXTENSION
        )
    }

    /// Write `coefficients` to a new timestamped file
    ///
    /// Creates the directory if needed. Returns the written path.
    pub fn save(
        &self,
        coefficients: &Coefficients,
        flipped: bool,
        at: NaiveDateTime,
    ) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Storage(format!(
                "Failed to create {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.dir.join(Self::file_name(&at, flipped));
        if path.exists() {
            debug!(path = %path.display(), "Replacing calibration saved in the same minute");
        }

        let file = File::create(&path)
            .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        for value in coefficients.values() {
            writeln!(writer, "{}", value)?;
        }
        writer.flush()?;

        info!(path = %path.display(), %coefficients, "Calibration saved");
        Ok(path)
    }

    /// Calibration files in the directory, newest first
    pub fn list(&self) -> AppResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<_> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION))
            })
            .collect();

        // Timestamped names sort chronologically
        files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(files)
    }

    /// Most recently saved calibration file
    pub fn latest(&self) -> AppResult<Option<PathBuf>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Read coefficients back from `path`
    pub fn read(path: &Path) -> AppResult<LoadedCalibration> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(parse_coefficients(&text, path)?)
    }
}

/// Parse calibration file contents
///
/// Blank lines are skipped. Reading stops after four values; fewer values
/// leave the remaining coefficients at zero. A line that is not a finite
/// number fails the whole load.
pub fn parse_coefficients(text: &str, path: &Path) -> Result<LoadedCalibration, CalibrationError> {
    let mut values = [0.0; COEFFICIENT_COUNT];
    let mut values_read = 0;

    for (index, line) in text.lines().enumerate() {
        if values_read == COEFFICIENT_COUNT {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CalibrationError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                content: trimmed.to_string(),
            })?;
        values[values_read] = value;
        values_read += 1;
    }

    if values_read < COEFFICIENT_COUNT {
        warn!(
            path = %path.display(),
            values_read,
            "Calibration file is incomplete; missing values are zero"
        );
    }

    Ok(LoadedCalibration {
        path: path.to_path_buf(),
        coefficients: Coefficients(values),
        values_read,
    })
}
