//! The host boundary: what the embedding environment provides.
//!
//! rtpqueue does not own players or worlds. The host (a game server, a
//! simulation, a test double) implements three small traits and the queue
//! core calls them at the right time:
//!
//! - [`DestinationResolver`] — does a destination with this name exist?
//! - [`Presence`] — is a participant online, where are they, move them.
//! - [`Notifier`] — show text, banners and cues.
//!
//! Any type implementing all three is a [`Host`] automatically.
//!
//! All methods take `&self` and must not block: they run on the queue
//! actor's task between two queue operations. Hosts with mutable state use
//! interior mutability.

use rtpqueue_protocol::{
    Banner, Cue, DestinationKey, Notice, ParticipantId, Position, Recipient,
};
use tokio::sync::mpsc;

/// Validates destination names for `join`.
pub trait DestinationResolver: Send + Sync + 'static {
    /// Returns `true` if the host has a destination with this key.
    fn resolve(&self, destination: &DestinationKey) -> bool;
}

/// Participant liveness, identity and placement.
pub trait Presence: Send + Sync + 'static {
    /// `true` while the participant is connected and can be acted on.
    fn is_reachable(&self, participant: ParticipantId) -> bool;

    /// Human-readable name, used in broadcasts. `None` when unreachable.
    fn display_name(&self, participant: ParticipantId) -> Option<String>;

    /// Where the participant currently stands, if known.
    fn current_position(&self, participant: ParticipantId) -> Option<Position>;

    /// Height of the first standable block at column (`x`, `z`) of the
    /// destination. `None` if the destination can no longer be resolved.
    fn surface_height_at(&self, destination: &DestinationKey, x: i32, z: i32) -> Option<i32>;

    /// Move the participant. Returns `true` if the host performed the move.
    fn move_to(
        &self,
        participant: ParticipantId,
        destination: &DestinationKey,
        position: Position,
    ) -> bool;
}

/// Presentation output.
pub trait Notifier: Send + Sync + 'static {
    /// Send chat text to one participant.
    fn send_to_one(&self, participant: ParticipantId, text: &str);

    /// Send chat text to everyone.
    fn broadcast_all(&self, text: &str);

    /// Show a timed title to one participant.
    fn show_banner(&self, participant: ParticipantId, banner: &Banner);

    /// Play a sound cue for one participant.
    fn play_cue(&self, participant: ParticipantId, cue: Cue);
}

/// Everything the queue core needs from its environment.
pub trait Host: DestinationResolver + Presence + Notifier {}

impl<T: DestinationResolver + Presence + Notifier> Host for T {}

// ---------------------------------------------------------------------------
// ChannelNotifier
// ---------------------------------------------------------------------------

/// A [`Notifier`] that forwards every request as a [`Notice`] on a channel.
///
/// Useful for hosts that render output on another task, and for tests.
/// If the receiver is gone, notices are silently dropped.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn push(&self, notice: Notice) {
        let _ = self.sender.send(notice);
    }
}

impl Notifier for ChannelNotifier {
    fn send_to_one(&self, participant: ParticipantId, text: &str) {
        self.push(Notice::Text {
            recipient: Recipient::Participant(participant),
            text: text.to_string(),
        });
    }

    fn broadcast_all(&self, text: &str) {
        self.push(Notice::Text {
            recipient: Recipient::All,
            text: text.to_string(),
        });
    }

    fn show_banner(&self, participant: ParticipantId, banner: &Banner) {
        self.push(Notice::Banner {
            to: participant,
            banner: banner.clone(),
        });
    }

    fn play_cue(&self, participant: ParticipantId, cue: Cue) {
        self.push(Notice::Cue {
            to: participant,
            cue,
        });
    }
}
