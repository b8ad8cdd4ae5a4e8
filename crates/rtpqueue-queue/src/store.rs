//! Membership store: who is queued where, and who is cooling down.
//!
//! Pure data plus invariant enforcement. No timing logic lives here; callers
//! pass `now` in. The store is owned by the [`QueueController`] and never
//! shared, so "check size, then extract" is a single `&mut self` call.
//!
//! [`QueueController`]: crate::QueueController

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use rtpqueue_protocol::{DestinationKey, ParticipantId};
use tokio::time::Instant;

use crate::QueueError;

/// Per-destination FIFO queues plus per-participant cooldowns.
#[derive(Debug, Default)]
pub struct MembershipStore {
    /// Arrival-ordered participants, keyed by destination.
    /// Empty queues are removed eagerly.
    queues: HashMap<DestinationKey, VecDeque<ParticipantId>>,

    /// Maps each queued participant to their destination.
    /// A participant is in at most ONE queue at a time (key invariant).
    membership: HashMap<ParticipantId, DestinationKey>,

    /// Cooldown expiry instants. An expired entry means "not on cooldown".
    cooldowns: HashMap<ParticipantId, Instant>,
}

impl MembershipStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a participant to a destination's queue. Returns the new size.
    ///
    /// Enforces the "one queue at a time" invariant.
    pub fn enqueue(
        &mut self,
        destination: &DestinationKey,
        participant: ParticipantId,
    ) -> Result<usize, QueueError> {
        if let Some(current) = self.membership.get(&participant) {
            return Err(QueueError::AlreadyQueued(participant, current.clone()));
        }
        let queue = self.queues.entry(destination.clone()).or_default();
        queue.push_back(participant);
        self.membership.insert(participant, destination.clone());
        Ok(queue.len())
    }

    /// Removes and returns the first `count` participants in arrival order.
    ///
    /// Fails without touching the queue if fewer than `count` are waiting.
    pub fn dequeue_batch(
        &mut self,
        destination: &DestinationKey,
        count: usize,
    ) -> Result<Vec<ParticipantId>, QueueError> {
        let available = self.size(destination);
        if available < count {
            return Err(QueueError::InsufficientBatch {
                destination: destination.clone(),
                needed: count,
                available,
            });
        }
        let Some(queue) = self.queues.get_mut(destination) else {
            return Ok(Vec::new());
        };

        let batch: Vec<ParticipantId> = queue.drain(..count).collect();
        if queue.is_empty() {
            self.queues.remove(destination);
        }
        for participant in &batch {
            self.membership.remove(participant);
        }
        Ok(batch)
    }

    /// Removes a participant from whichever queue holds them.
    ///
    /// Returns the destination they were removed from, or `None` if they
    /// were not queued.
    pub fn remove(&mut self, participant: ParticipantId) -> Option<DestinationKey> {
        let destination = self.membership.remove(&participant)?;
        if let Some(queue) = self.queues.get_mut(&destination) {
            queue.retain(|p| *p != participant);
            if queue.is_empty() {
                self.queues.remove(&destination);
            }
        }
        Some(destination)
    }

    /// Current queue length for a destination (0 if none).
    pub fn size(&self, destination: &DestinationKey) -> usize {
        self.queues.get(destination).map_or(0, VecDeque::len)
    }

    /// The most recently queued participant for a destination.
    pub fn newest(&self, destination: &DestinationKey) -> Option<ParticipantId> {
        self.queues.get(destination)?.back().copied()
    }

    /// Snapshot of a destination's queue in arrival order.
    pub fn members(&self, destination: &DestinationKey) -> Vec<ParticipantId> {
        self.queues
            .get(destination)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `true` if the participant is in any queue.
    pub fn is_queued(&self, participant: ParticipantId) -> bool {
        self.membership.contains_key(&participant)
    }

    /// The destination the participant is queued for, if any.
    pub fn queued_destination(&self, participant: ParticipantId) -> Option<&DestinationKey> {
        self.membership.get(&participant)
    }

    /// Total participants across all queues.
    pub fn total_queued(&self) -> usize {
        self.membership.len()
    }

    /// Destinations with at least one participant waiting.
    pub fn destinations(&self) -> impl Iterator<Item = &DestinationKey> {
        self.queues.keys()
    }

    /// Records a cooldown that ends at `expires_at`, replacing any older one.
    pub fn set_cooldown(&mut self, participant: ParticipantId, expires_at: Instant) {
        self.cooldowns.insert(participant, expires_at);
    }

    /// Time left on the participant's cooldown, or `None` if not cooling down.
    pub fn cooldown_remaining(&self, participant: ParticipantId, now: Instant) -> Option<Duration> {
        let expires_at = self.cooldowns.get(&participant)?;
        let remaining = expires_at.saturating_duration_since(now);
        (!remaining.is_zero()).then_some(remaining)
    }

    /// Drops expired cooldown records. Returns how many were removed.
    pub fn prune_cooldowns(&mut self, now: Instant) -> usize {
        let before = self.cooldowns.len();
        self.cooldowns.retain(|_, expires_at| *expires_at > now);
        before - self.cooldowns.len()
    }

    /// Number of cooldown records held (expired ones included until pruned).
    pub fn cooldown_count(&self) -> usize {
        self.cooldowns.len()
    }
}
