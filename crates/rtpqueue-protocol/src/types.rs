//! Core value types shared by the queue core and its host.
//!
//! Everything in this module is plain data: cheap to clone, comparable,
//! and serializable so hosts can log or forward it as they see fit.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable, opaque identifier for a participant.
///
/// Newtype over `u64` so a participant id can never be mixed up with any
/// other number flowing through the system. The host decides how ids map
/// to its own player objects; the queue only compares and hashes them.
///
/// `#[serde(transparent)]` keeps the wire form a plain number, so
/// `ParticipantId(42)` serializes as `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = ProtocolError;

    /// Parses either `42` or `P-42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("P-")
            .or_else(|| trimmed.strip_prefix("p-"))
            .unwrap_or(trimmed);
        digits
            .parse()
            .map(ParticipantId)
            .map_err(|_| ProtocolError::InvalidParticipant(s.to_string()))
    }
}

/// The case-insensitive key of a destination queue.
///
/// Destinations are identified by name, and `"Spawn"`, `"SPAWN"` and
/// `"spawn"` all refer to the same queue. The key stores the lowercased,
/// trimmed form so equality and hashing follow that rule automatically.
///
/// Deserialization goes through [`From<String>`], so keys read from
/// settings files are normalized the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DestinationKey(String);

impl DestinationKey {
    /// Normalizes `name` into a key, rejecting blank names.
    pub fn parse(name: &str) -> Result<Self, ProtocolError> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(ProtocolError::EmptyDestination);
        }
        Ok(Self(key))
    }

    /// The normalized (lowercase) name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DestinationKey {
    fn from(name: String) -> Self {
        Self(name.trim().to_lowercase())
    }
}

impl From<&str> for DestinationKey {
    fn from(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }
}

impl From<DestinationKey> for String {
    fn from(key: DestinationKey) -> Self {
        key.0
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A block position inside a destination.
///
/// `y` is the vertical axis; `x` and `z` span the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// A sound cue the host plays for one participant.
///
/// The core only names the *moment*; mapping a cue to an actual sound is
/// the host's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// The participant's batch was accepted and the countdown begins.
    Accepted,
    /// One countdown step elapsed.
    Tick,
    /// The participant was just relocated.
    Teleported,
}

/// A timed on-screen title shown to one participant.
///
/// Fade and hold durations are in host ticks (20 per second on the
/// reference host), passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub title: String,
    pub subtitle: String,
    pub fade_in: u32,
    pub hold: u32,
    pub fade_out: u32,
}

/// Who should receive a text notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every participant the host knows about.
    All,

    /// One specific participant.
    Participant(ParticipantId),
}

/// A single presentation request emitted by the queue core.
///
/// Hosts that prefer message passing over direct calls can receive these
/// on a channel instead of implementing a notifier themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Chat-style text.
    Text { recipient: Recipient, text: String },

    /// A timed title for one participant.
    Banner { to: ParticipantId, banner: Banner },

    /// A sound cue for one participant.
    Cue { to: ParticipantId, cue: Cue },
}

// =========================================================================
// Tests
// =========================================================================
