//! Placeholder expansion under the `rtpqueue` identifier.
//!
//! Hosts with a placeholder system (scoreboards, chat formats, menus) can
//! resolve `%rtpqueue_<name>%` tokens against the running queue:
//!
//! | token | value |
//! |---|---|
//! | `%rtpqueue_status_player%` | `Queued for <world>` or `Not in Queue` |
//! | `%rtpqueue_count_<world>%` | number of participants queued for `<world>` |
//!
//! Any other name is left unresolved.

use rtpqueue_protocol::ParticipantId;
use rtpqueue_queue::QueueHandle;
use tracing::debug;

/// Identifier under which the expansion registers.
pub const IDENTIFIER: &str = "rtpqueue";

/// Host-side placeholder system.
///
/// Supplied to the builder when the host has one; registration happens
/// once, while the queue starts.
pub trait PlaceholderRegistry: Send + Sync + 'static {
    /// Make the expansion available. Returns `false` if the host refused it.
    fn register(&self, expansion: QueuePlaceholders) -> bool;
}

/// Resolves `rtpqueue` placeholders by asking the queue actor.
#[derive(Debug, Clone)]
pub struct QueuePlaceholders {
    handle: QueueHandle,
}

impl QueuePlaceholders {
    pub fn new(handle: QueueHandle) -> Self {
        Self { handle }
    }

    pub fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    /// Value of one placeholder name (the part after `rtpqueue_`).
    ///
    /// Without a participant every name resolves to the empty string.
    /// Unknown names, and any name while the queue is down, give `None`.
    pub async fn request(&self, participant: Option<ParticipantId>, name: &str) -> Option<String> {
        let Some(participant) = participant else {
            return Some(String::new());
        };

        let name = name.to_ascii_lowercase();
        let value = if name == "status_player" {
            self.handle.status_of(participant).await.map(|s| s.to_string())
        } else if let Some(world) = name.strip_prefix("count_") {
            self.handle.count_of(world).await.map(|n| n.to_string())
        } else {
            return None;
        };

        value
            .inspect_err(|e| debug!(placeholder = %name, error = %e, "placeholder unresolved"))
            .ok()
    }

    /// Replaces every `%rtpqueue_<name>%` token in `text`.
    ///
    /// Tokens that do not resolve are kept verbatim.
    pub async fn expand(&self, participant: Option<ParticipantId>, text: &str) -> String {
        let open = format!("%{IDENTIFIER}_");
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(&open) {
            out.push_str(&rest[..start]);
            let after = &rest[start + open.len()..];
            let Some(end) = after.find('%') else {
                out.push_str(&rest[start..]);
                return out;
            };
            match self.request(participant, &after[..end]).await {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[start..start + open.len() + end + 1]),
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }
}
