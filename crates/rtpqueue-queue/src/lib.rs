//! Destination queues and teleport countdowns for rtpqueue.
//!
//! Participants queue for a named destination. Once a queue holds enough
//! participants, a fixed-size batch is pulled off the front, counted down,
//! relocated, and put on cooldown. Everything runs on a single logical
//! timeline owned by one Tokio task (actor model).
//!
//! # Key types
//!
//! - [`MembershipStore`] — queue membership and cooldown records
//! - [`QueueController`] — join/leave, readiness, batch extraction
//! - [`TeleportSession`] — the countdown state machine for one batch
//! - [`QueueHandle`] — send commands to a running queue actor
//! - [`Host`] — what the embedding environment must provide
//! - [`QueueConfig`] — threshold, countdown, cooldown, message templates

mod actor;
mod config;
mod controller;
mod error;
mod host;
mod messages;
mod relocation;
mod session;
mod store;

pub use actor::{QueueHandle, QueueInfo, spawn_queue};
pub use config::{QueueConfig, Titles};
pub use controller::{QueueController, QueueStatus, Readiness};
pub use error::QueueError;
pub use host::{ChannelNotifier, DestinationResolver, Host, Notifier, Presence};
pub use messages::{Messages, render};
pub use relocation::Relocator;
pub use session::{SessionId, SessionState, SessionStep, StepKind, TeleportSession};
pub use store::MembershipStore;
