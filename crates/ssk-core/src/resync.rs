//! Resync notification: asking a peer to redistribute its sender key.
//!
//! The controller fires a request when neither ratchet generation can
//! satisfy an operation and then returns its error immediately; it never
//! waits for the peer. Requests are not de-duplicated here, so a
//! notifier that talks to the network should rate-limit on its side.

#![allow(clippy::disallowed_types, reason = "Recording notifier for tests")]

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::ids::{GroupId, SenderId};

/// A request for `sender` to redistribute its sender key in `group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResyncRequest {
    /// Group whose ratchet is missing or stale
    pub group: GroupId,
    /// Sender whose key must be redistributed
    pub sender: SenderId,
}

/// Receiver of resync requests.
///
/// Implementations must not block: the controller calls this inline on the
/// failure path.
pub trait ResyncNotifier: Send + Sync {
    /// Ask `sender` to redistribute its sender key for `group`.
    fn request_sender_key(&self, group: &GroupId, sender: &SenderId);
}

/// Forwards requests onto an unbounded tokio channel.
///
/// Sending never blocks. If the receiving task has gone away the request is
/// dropped with a warning.
#[derive(Debug, Clone)]
pub struct ChannelResyncNotifier {
    tx: mpsc::UnboundedSender<ResyncRequest>,
}

impl ChannelResyncNotifier {
    /// Create a notifier and the receiver the host drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResyncRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResyncNotifier for ChannelResyncNotifier {
    fn request_sender_key(&self, group: &GroupId, sender: &SenderId) {
        let request = ResyncRequest { group: group.clone(), sender: sender.clone() };
        if self.tx.send(request).is_err() {
            tracing::warn!(%group, %sender, "resync receiver closed, dropping sender key request");
        }
    }
}

/// Records every request in order.
#[derive(Debug, Default)]
pub struct RecordingResyncNotifier {
    requests: Mutex<Vec<ResyncRequest>>,
}

impl RecordingResyncNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ResyncRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

impl ResyncNotifier for RecordingResyncNotifier {
    fn request_sender_key(&self, group: &GroupId, sender: &SenderId) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(ResyncRequest { group: group.clone(), sender: sender.clone() });
        }
    }
}
