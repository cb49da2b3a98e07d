// SPDX-License-Identifier: MIT

//! Outbound email recording.
//!
//! Real delivery is out of scope; messages are logged and kept in an
//! in-memory outbox so flows (and tests) can observe what would have been
//! sent. OTP codes and verification tokens only ever travel through here,
//! never through an API response.

use std::sync::{Arc, Mutex};

/// A message queued for delivery.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// In-memory outbox standing in for an email delivery service.
#[derive(Clone, Default)]
pub struct Outbox {
    messages: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, to: &str, subject: &str, body: String) {
        tracing::info!(to = %to, subject = %subject, "Queueing outbound email");
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(OutboundEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body,
            });
    }

    /// All messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The most recent message to an address, if any.
    pub fn last_to(&self, to: &str) -> Option<OutboundEmail> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}
