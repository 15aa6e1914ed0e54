// SPDX-License-Identifier: GPL-3.0-only

//! Pending USB permission requests
//!
//! A permission request is an asynchronous round trip through the OS. Each
//! request gets a [`RequestId`]; the embedding layer reports the user's
//! decision back with that id, which resolves the pending entry. Callers that
//! prefer to await the decision hold the [`PendingPermission`] future instead.
//!
//! Decisions are only accepted while the broker is listening (between resume
//! and pause). A decision that arrives while paused is dropped and the request
//! stays pending, so it can still be answered after the next resume.

use crate::backends::UsbDeviceInfo;
use futures::channel::oneshot;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies one permission round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// User's answer to a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

impl PermissionDecision {
    pub fn from_granted(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }
}

/// Awaitable handle for one outstanding request
#[derive(Debug)]
pub struct PendingPermission {
    pub id: RequestId,
    pub device: UsbDeviceInfo,
    decision: oneshot::Receiver<PermissionDecision>,
}

impl PendingPermission {
    /// Wait for the decision
    ///
    /// Resolves to `None` when the request was cancelled (device detached or
    /// controller destroyed) before an answer arrived.
    pub async fn decision(self) -> Option<PermissionDecision> {
        self.decision.await.ok()
    }

    /// Non-blocking check for a decision that already arrived
    pub fn try_decision(&mut self) -> Option<PermissionDecision> {
        self.decision.try_recv().ok().flatten()
    }
}

struct Entry {
    device: UsbDeviceInfo,
    reply: oneshot::Sender<PermissionDecision>,
}

/// Table of outstanding permission requests
pub struct PermissionBroker {
    pending: HashMap<RequestId, Entry>,
    listening: bool,
}

impl Default for PermissionBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionBroker {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            listening: true,
        }
    }

    /// Register a new request for `device`
    pub fn begin(&mut self, device: &UsbDeviceInfo) -> PendingPermission {
        let id = RequestId::new();
        let (reply, decision) = oneshot::channel();
        self.pending.insert(
            id,
            Entry {
                device: device.clone(),
                reply,
            },
        );
        debug!(%id, %device, "Permission request pending");
        PendingPermission {
            id,
            device: device.clone(),
            decision,
        }
    }

    /// Id of the request already outstanding for `device`, if any
    pub fn pending_for(&self, device: &UsbDeviceInfo) -> Option<RequestId> {
        self.pending
            .iter()
            .find(|(_, entry)| entry.device.same_device(device))
            .map(|(id, _)| *id)
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    /// Resolve a request with the user's decision
    ///
    /// Returns the device the request was for, or `None` when the id is
    /// unknown or the broker is not listening.
    pub fn resolve(
        &mut self,
        id: RequestId,
        decision: PermissionDecision,
    ) -> Option<UsbDeviceInfo> {
        if !self.listening {
            warn!(%id, ?decision, "Permission result arrived while paused; ignoring");
            return None;
        }
        let Some(entry) = self.pending.remove(&id) else {
            warn!(%id, "Permission result for unknown request");
            return None;
        };
        // The receiver may have been dropped; the decision still counts
        let _ = entry.reply.send(decision);
        Some(entry.device)
    }

    /// Drop a request without answering it
    pub fn cancel(&mut self, id: RequestId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Drop every request for `device`
    pub fn cancel_device(&mut self, device: &UsbDeviceInfo) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, entry| !entry.device.same_device(device));
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }
}
