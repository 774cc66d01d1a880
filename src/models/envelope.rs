//! Wire shapes exchanged over a relay connection. Field names are fixed.

use crate::models::types::Username;
use serde::{Deserialize, Serialize};

/// What a sender transmits: `{"to": "...", "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToMessage {
    pub to: Username,
    pub text: String,
}

/// What a recipient receives: `{"from": "...", "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FromMessage {
    pub from: Username,
    pub text: String,
}

impl ToMessage {
    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    /// Re-addresses the message as coming from `sender`. The sender is never read from the payload.
    pub fn into_delivery(self, sender: &Username) -> FromMessage {
        FromMessage {
            from: sender.clone(),
            text: self.text,
        }
    }
}

impl FromMessage {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
