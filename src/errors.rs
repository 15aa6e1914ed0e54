// SPDX-License-Identifier: MPL-2.0

//! Error types for the calibrator core

use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Device session errors (discovery, permission, open)
    Session(SessionError),
    /// Capture lifecycle errors
    Capture(CaptureError),
    /// Calibration workflow errors
    Calibration(CalibrationError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Device session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No attached device matches the vendor allow-list
    NoCameraFound,
    /// Permission for the device was refused by the user
    PermissionDenied { vendor_id: u16, product_id: u16 },
    /// The host could not open the USB transport
    TransportFailed(String),
    /// The native layer reported a non-positive resolution
    OpenFailed { width: i32, height: i32 },
}

/// Capture lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Native start-capture returned false
    StartFailed,
    /// Native stop-capture returned false
    StopFailed,
    /// Capture requested while the session is closed
    SessionClosed,
}

/// Calibration workflow errors
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Add-point or compute requested outside the calibration mode
    NotInCalibrationMode,
    /// The native layer rejected the point
    PointRejected,
    /// The solver produced non-finite coefficients
    InvalidResult([f64; 4]),
    /// A line of a calibration file is not a number
    Parse { path: PathBuf, line: usize, content: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Calibration(e) => write!(f, "Calibration error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoCameraFound => write!(f, "No camera found"),
            SessionError::PermissionDenied {
                vendor_id,
                product_id,
            } => write!(
                f,
                "Permission denied for device {:04x}:{:04x}",
                vendor_id, product_id
            ),
            SessionError::TransportFailed(msg) => write!(f, "Cannot open USB transport: {}", msg),
            SessionError::OpenFailed { width, height } => write!(
                f,
                "Camera refused to open (reported resolution {}x{})",
                width, height
            ),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::StartFailed => write!(f, "Failed to start capture"),
            CaptureError::StopFailed => write!(f, "Failed to stop capture"),
            CaptureError::SessionClosed => write!(f, "Cannot capture without an open camera"),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::NotInCalibrationMode => {
                write!(f, "Only available in calibration mode")
            }
            CalibrationError::PointRejected => write!(f, "Point cannot be added"),
            CalibrationError::InvalidResult(values) => {
                write!(f, "Solver returned invalid coefficients {:?}", values)
            }
            CalibrationError::Parse {
                path,
                line,
                content,
            } => write!(
                f,
                "{}:{}: '{}' is not a finite number",
                path.display(),
                line,
                content
            ),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for CalibrationError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        AppError::Calibration(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_messages_are_user_readable() {
        assert_eq!(SessionError::NoCameraFound.to_string(), "No camera found");
        let denied = SessionError::PermissionDenied {
            vendor_id: 0x1C28,
            product_id: 0xC012,
        };
        assert_eq!(
            denied.to_string(),
            "Permission denied for device 1c28:c012"
        );
    }

    #[test]
    fn test_conversions_wrap_sub_errors() {
        let err: AppError = CaptureError::StartFailed.into();
        assert_eq!(err, AppError::Capture(CaptureError::StartFailed));
        assert_eq!(err.to_string(), "Capture error: Failed to start capture");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(AppError::from(io), AppError::Storage(_)));
    }
}
