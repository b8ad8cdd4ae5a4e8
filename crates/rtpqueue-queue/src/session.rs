//! Teleport sessions: the countdown state machine for one extracted batch.
//!
//! A session is created the moment a batch leaves its queue. It owns the
//! batch (never modified afterwards) and walks through:
//!
//! ```text
//! Announced → Counting(n) → Counting(n-1) → … → Counting(1) → Executing → Completed
//! ```
//!
//! Every step re-checks which batch members the host can currently reach.
//! Members who are offline for one step simply miss that step; members who
//! are offline at execution are dropped for good.
//!
//! Sessions never touch queue membership. The controller schedules the
//! steps from [`TeleportSession::plan`], feeds them back in order, and
//! records the cooldowns that [`TeleportSession::execute`] returns.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use rtpqueue_protocol::{Cue, DestinationKey, ParticipantId};
use tokio::time::Instant;
use tracing::debug;

use crate::{Host, Presence, QueueConfig, QueueError, Relocator, render};

// ---------------------------------------------------------------------------
// Identity and steps
// ---------------------------------------------------------------------------

/// Identifier of a teleport session, unique per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// What a scheduled step does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Announce that `remaining` units are left.
    Countdown { remaining: u32 },
    /// Relocate the batch.
    Execute,
}

/// A timeline entry: which session, and which step of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStep {
    pub session: SessionId,
    pub kind: StepKind,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a teleport session.
///
/// - **Announced**: batch extracted, members told the countdown begins.
/// - **Counting**: `remaining` units left before execution.
/// - **Executing**: reachable members are being relocated.
/// - **Completed**: cooldowns recorded; the session is about to be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Announced,
    Counting { remaining: u32 },
    Executing,
    Completed,
}

impl SessionState {
    /// Returns `true` once the session has nothing left to do.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Announced => write!(f, "Announced"),
            Self::Counting { remaining } => write!(f, "Counting({remaining})"),
            Self::Executing => write!(f, "Executing"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// TeleportSession
// ---------------------------------------------------------------------------

/// Countdown-then-relocate sequence for one batch.
#[derive(Debug, Clone)]
pub struct TeleportSession {
    id: SessionId,
    destination: DestinationKey,
    batch: Vec<ParticipantId>,
    countdown: u32,
    cooldown: Duration,
    started_at: Instant,
    state: SessionState,
}

impl TeleportSession {
    /// Creates a session in the `Announced` state.
    pub fn new(
        id: SessionId,
        destination: DestinationKey,
        batch: Vec<ParticipantId>,
        countdown: u32,
        cooldown: Duration,
        started_at: Instant,
    ) -> Self {
        Self {
            id,
            destination,
            batch,
            countdown,
            cooldown,
            started_at,
            state: SessionState::Announced,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn destination(&self) -> &DestinationKey {
        &self.destination
    }

    /// The batch in extraction (arrival) order.
    pub fn batch(&self) -> &[ParticipantId] {
        &self.batch
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// All steps of this session as `(units after start, step)` pairs, in
    /// firing order.
    ///
    /// Countdown step `n` fires `countdown - n` units after the start, so the
    /// first one fires immediately. Execution fires at `countdown` units.
    pub fn plan(&self) -> Vec<(u32, SessionStep)> {
        let mut steps: Vec<(u32, SessionStep)> = (1..=self.countdown)
            .rev()
            .map(|remaining| {
                (
                    self.countdown - remaining,
                    SessionStep {
                        session: self.id,
                        kind: StepKind::Countdown { remaining },
                    },
                )
            })
            .collect();
        steps.push((
            self.countdown,
            SessionStep {
                session: self.id,
                kind: StepKind::Execute,
            },
        ));
        steps
    }

    /// The only state this session may move to next.
    pub fn next_state(&self) -> Option<SessionState> {
        match self.state {
            SessionState::Announced if self.countdown == 0 => Some(SessionState::Executing),
            SessionState::Announced => Some(SessionState::Counting {
                remaining: self.countdown,
            }),
            SessionState::Counting { remaining: 1 } => Some(SessionState::Executing),
            SessionState::Counting { remaining } => Some(SessionState::Counting {
                remaining: remaining - 1,
            }),
            SessionState::Executing => Some(SessionState::Completed),
            SessionState::Completed => None,
        }
    }

    fn transition(&mut self, target: SessionState) -> Result<(), QueueError> {
        if self.next_state() != Some(target) {
            return Err(QueueError::InvalidState(format!(
                "session {} cannot move from {} to {}",
                self.id, self.state, target
            )));
        }
        self.state = target;
        Ok(())
    }

    /// Batch members the host can reach right now, in batch order.
    pub fn reachable<P: Presence + ?Sized>(&self, presence: &P) -> Vec<ParticipantId> {
        self.batch
            .iter()
            .filter_map(|&p| match check_reachable(presence, p) {
                Ok(p) => Some(p),
                Err(e) => {
                    debug!(session = %self.id, error = %e, "skipping member for this step");
                    None
                }
            })
            .collect()
    }

    /// Entry action of `Announced`: countdown message, accepted banner and
    /// acknowledgement cue for every reachable member.
    pub fn announce<H: Host + ?Sized>(&self, host: &H, config: &QueueConfig) {
        let text = render(
            &config.messages.queue_teleport,
            &[("world", self.destination.as_str())],
        );
        let banner = config.titles.accepted_banner();
        for participant in self.reachable(host) {
            if let Some(text) = &text {
                host.send_to_one(participant, text);
            }
            host.show_banner(participant, &banner);
            host.play_cue(participant, Cue::Accepted);
        }
        debug!(
            session = %self.id,
            destination = %self.destination,
            batch = self.batch.len(),
            "session announced"
        );
    }

    /// One countdown step: "`remaining` left" plus a tick cue for every
    /// reachable member.
    pub fn count_down<H: Host + ?Sized>(
        &mut self,
        remaining: u32,
        host: &H,
        config: &QueueConfig,
    ) -> Result<(), QueueError> {
        self.transition(SessionState::Counting { remaining })?;

        let time = remaining.to_string();
        let text = render(&config.messages.teleport, &[("time", &time)]);
        for participant in self.reachable(host) {
            if let Some(text) = &text {
                host.send_to_one(participant, text);
            }
            host.play_cue(participant, Cue::Tick);
        }
        debug!(session = %self.id, remaining, "countdown step");
        Ok(())
    }

    /// Relocates every reachable member.
    ///
    /// Returns the members that must be put on cooldown: everyone reachable
    /// at this instant, whether or not the host could resolve a target.
    /// Unreachable members get nothing and are not returned.
    pub fn execute<H: Host + ?Sized, R: Rng>(
        &mut self,
        host: &H,
        config: &QueueConfig,
        relocator: &Relocator,
        rng: &mut R,
    ) -> Result<Vec<ParticipantId>, QueueError> {
        self.transition(SessionState::Executing)?;

        let reachable = self.reachable(host);
        let text = render(
            &config.messages.teleported,
            &[("world", self.destination.as_str())],
        );
        for &participant in &reachable {
            if relocator
                .relocate(host, participant, &self.destination, rng)
                .is_some()
            {
                if let Some(text) = &text {
                    host.send_to_one(participant, text);
                }
                host.play_cue(participant, Cue::Teleported);
            }
        }

        debug!(
            session = %self.id,
            relocated = reachable.len(),
            dropped = self.batch.len() - reachable.len(),
            "session executed"
        );
        Ok(reachable)
    }

    /// Marks the session finished.
    pub fn complete(&mut self) -> Result<(), QueueError> {
        self.transition(SessionState::Completed)
    }
}

fn check_reachable<P: Presence + ?Sized>(
    presence: &P,
    participant: ParticipantId,
) -> Result<ParticipantId, QueueError> {
    if presence.is_reachable(participant) {
        Ok(participant)
    } else {
        Err(QueueError::UnreachableParticipant(participant))
    }
}
