//! Error types for the queue layer.

use rtpqueue_protocol::{DestinationKey, ParticipantId};

use crate::SessionId;

/// Errors that can occur during queue operations.
///
/// The user-facing variants (`UnknownDestination`, `OnCooldown`,
/// `AlreadyQueued`) are always paired with a message to the requester before
/// they are returned; callers never need to notify anyone themselves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The host does not know a destination by this name.
    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    /// The participant finished a teleport recently and must wait.
    #[error("on cooldown for another {remaining_secs}s")]
    OnCooldown { remaining_secs: u64 },

    /// The participant is already waiting in a queue (possibly another one).
    #[error("participant {0} already queued for {1}")]
    AlreadyQueued(ParticipantId, DestinationKey),

    /// The participant is not in any queue.
    #[error("participant {0} is not queued")]
    NotQueued(ParticipantId),

    /// A batch was requested from a queue that is too short.
    ///
    /// The controller checks the size before extracting, so seeing this
    /// means an internal invariant was broken.
    #[error("queue {destination} holds {available}, batch of {needed} requested")]
    InsufficientBatch {
        destination: DestinationKey,
        needed: usize,
        available: usize,
    },

    /// The host currently considers the participant offline.
    ///
    /// Absorbed at each countdown step; never returned from `join`.
    #[error("participant {0} is not reachable")]
    UnreachableParticipant(ParticipantId),

    /// A scheduled step referenced a session that no longer exists.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// A session step arrived out of order.
    #[error("invalid session state for this operation: {0}")]
    InvalidState(String),

    /// The queue actor's command channel is full or closed.
    #[error("queue service is unavailable")]
    Unavailable,
}
