//! # rtpqueue
//!
//! Matchmaking queue for random teleports.
//!
//! Participants queue for a named destination. Once enough of them are
//! waiting, a batch is pulled off the front of the queue, counted down,
//! dropped at random spots in the destination, and put on cooldown.
//!
//! The host (a game server, a simulation) implements [`Host`](queue::Host) and
//! [`Permissions`]; rtpqueue provides the queue actor, the `rtpqueue`
//! command, the destination menu and placeholders.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rtpqueue::prelude::*;
//!
//! let queue = RtpQueue::builder()
//!     .settings(Settings::load("rtpqueue.toml")?)
//!     .build(Arc::new(MyHost::new()));
//!
//! queue.execute(CommandSender::Participant(ParticipantId(1)), &["spawn"]).await?;
//! queue.shutdown().await?;
//! ```

mod error;
mod handler;
mod menu;
mod placeholder;
mod server;
mod settings;
mod text;

pub use error::{RtpqueueError, SettingsError};
pub use handler::{
    Command, CommandHandler, CommandOutcome, CommandSender, Permissions, USE_PERMISSION,
};
pub use menu::{Menu, MenuAction, MenuConfig, MenuItem, MenuView, MenuViewItem};
pub use placeholder::{IDENTIFIER, PlaceholderRegistry, QueuePlaceholders};
pub use server::{DEFAULT_CHANNEL_SIZE, RtpQueue, RtpQueueBuilder};
pub use settings::Settings;
pub use text::{same_label, strip_color};

pub use rtpqueue_protocol as protocol;
pub use rtpqueue_queue as queue;
pub use rtpqueue_timer as timer;

/// Everything a host usually needs.
pub mod prelude {
    pub use crate::{
        Command, CommandOutcome, CommandSender, MenuConfig, MenuItem, MenuView, Permissions,
        PlaceholderRegistry, QueuePlaceholders, RtpQueue, RtpQueueBuilder, RtpqueueError,
        Settings, SettingsError, strip_color,
    };
    pub use rtpqueue_protocol::{
        Banner, Cue, DestinationKey, Notice, ParticipantId, Position, Recipient,
    };
    pub use rtpqueue_queue::{
        ChannelNotifier, DestinationResolver, Host, Messages, Notifier, Presence, QueueConfig,
        QueueError, QueueHandle, QueueInfo, QueueStatus, Readiness, Titles,
    };
    pub use rtpqueue_timer::TimelineMetrics;
}
