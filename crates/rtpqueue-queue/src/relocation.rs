//! Random relocation inside a destination.
//!
//! A target column is drawn uniformly from the square
//! `[-spread, spread) × [-spread, spread)`; the height is the host's surface
//! height at that column plus a fixed clearance.
//!
//! Known limitation: nothing checks what the participant lands on or next
//! to. Water, lava or a cliff edge are all possible targets.

use rand::Rng;
use rtpqueue_protocol::{DestinationKey, ParticipantId, Position};
use tracing::debug;

use crate::{Presence, QueueConfig};

/// Picks relocation targets and performs the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocator {
    spread: i32,
    clearance: i32,
}

impl Relocator {
    pub fn new(spread: i32, clearance: i32) -> Self {
        Self {
            spread: spread.max(1),
            clearance,
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.spread, config.clearance)
    }

    pub fn spread(&self) -> i32 {
        self.spread
    }

    /// Chooses a target position, or `None` if the host cannot resolve the
    /// destination's surface any more.
    pub fn pick_target<P, R>(
        &self,
        presence: &P,
        destination: &DestinationKey,
        rng: &mut R,
    ) -> Option<Position>
    where
        P: Presence + ?Sized,
        R: Rng,
    {
        let x = rng.random_range(-self.spread..self.spread);
        let z = rng.random_range(-self.spread..self.spread);
        let surface = presence.surface_height_at(destination, x, z)?;
        Some(Position::new(x, surface.saturating_add(self.clearance), z))
    }

    /// Picks a target and moves the participant there.
    ///
    /// Returns the position only if the host actually performed the move.
    pub fn relocate<P, R>(
        &self,
        presence: &P,
        participant: ParticipantId,
        destination: &DestinationKey,
        rng: &mut R,
    ) -> Option<Position>
    where
        P: Presence + ?Sized,
        R: Rng,
    {
        let target = self.pick_target(presence, destination, rng)?;
        let from = presence.current_position(participant);
        if !presence.move_to(participant, destination, target) {
            debug!(%participant, %destination, "host refused move");
            return None;
        }
        debug!(%participant, %destination, ?from, to = %target, "participant relocated");
        Some(target)
    }
}

impl Default for Relocator {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}
