//! Shared vocabulary for rtpqueue.
//!
//! This crate defines the values that cross the boundary between the queue
//! core and the host environment that embeds it:
//!
//! - **Identity** ([`ParticipantId`], [`DestinationKey`]) — who is queued
//!   and where they want to go.
//! - **Geometry** ([`Position`]) — where a participant ends up.
//! - **Presentation** ([`Notice`], [`Recipient`], [`Banner`], [`Cue`]) —
//!   what the core asks the host to show or play.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while parsing any
//!   of the above from user input.
//!
//! # Architecture
//!
//! ```text
//! Host (players, worlds) ⇄ Protocol (ids, notices) ⇄ Queue core (state)
//! ```
//!
//! Nothing here knows about queues or timing; the types are plain data.

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{
    Banner, Cue, DestinationKey, Notice, ParticipantId, Position, Recipient,
};
