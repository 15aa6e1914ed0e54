// SPDX-License-Identifier: GPL-3.0-only

//! Short user-visible notices
//!
//! The controller reports outcomes of user actions here; the embedding layer
//! drains the receiver and shows them (toasts on a device, log lines in the
//! CLI).

use crate::mode::Mode;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How prominently a notice should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NoCameraFound,
    ModeChanged(Mode),
    PointAdded { count: usize },
    PointRejected,
    CalibrationSaved(PathBuf),
    CalibrationNotSaved,
    CalibrationLoaded(PathBuf),
    /// The loaded file had fewer than four values
    CalibrationIncomplete { values_read: usize },
    CalibrationNotLoaded,
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::NoCameraFound
            | Notice::PointRejected
            | Notice::CalibrationNotSaved
            | Notice::CalibrationIncomplete { .. }
            | Notice::CalibrationNotLoaded => NoticeLevel::Warning,
            _ => NoticeLevel::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::NoCameraFound => "No camera found".to_string(),
            Notice::ModeChanged(mode) => format!("Mode: {}", mode.display_name()),
            Notice::PointAdded { .. } => "Point is added".to_string(),
            Notice::PointRejected => "Point cannot be added".to_string(),
            Notice::CalibrationSaved(_) => "Calibration is saved".to_string(),
            Notice::CalibrationNotSaved => "Calibration cannot be saved".to_string(),
            Notice::CalibrationLoaded(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("Calibration file loaded: {}", name)
            }
            Notice::CalibrationIncomplete { values_read } => format!(
                "Calibration file is incomplete ({} of 4 values)",
                values_read
            ),
            Notice::CalibrationNotLoaded => "Calibration cannot be loaded".to_string(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Sending half used by the controller
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Self, NoticeReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn send(&self, notice: Notice) {
        match notice.level() {
            NoticeLevel::Info => info!(notice = %notice, "Notice"),
            NoticeLevel::Warning => warn!(notice = %notice, "Notice"),
        }
        if self.sender.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }
}

/// Everything currently queued, oldest first
pub fn drain(receiver: &mut NoticeReceiver) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = receiver.try_recv() {
        notices.push(notice);
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Notice::NoCameraFound.to_string(), "No camera found");
        assert_eq!(Notice::PointAdded { count: 1 }.to_string(), "Point is added");
        assert_eq!(
            Notice::CalibrationLoaded(PathBuf::from("/x/2024_03_09_14_05.txt")).to_string(),
            "Calibration file loaded: 2024_03_09_14_05.txt"
        );
        assert_eq!(Notice::ModeChanged(Mode::Test).to_string(), "Mode: TEST");
    }

    #[test]
    fn test_send_after_receiver_dropped_is_harmless() {
        let (notifier, mut receiver) = Notifier::channel();
        notifier.send(Notice::PointRejected);
        assert_eq!(drain(&mut receiver), vec![Notice::PointRejected]);
        drop(receiver);
        notifier.send(Notice::PointRejected);
    }
}
