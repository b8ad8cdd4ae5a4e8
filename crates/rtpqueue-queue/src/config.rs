//! Queue configuration.

use std::time::Duration;

use rtpqueue_protocol::Banner;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Messages;

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Configuration for the queue core.
///
/// Loaded once at startup and treated as read-only afterwards. Field names
/// in settings files are kebab-case (`teleport-delay`,
/// `max-players-per-queue`, ...); every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueueConfig {
    /// Countdown length in time units before the batch is relocated.
    pub teleport_delay: u32,

    /// Seconds a participant must wait after a teleport before queueing again.
    #[serde(rename = "cooldown")]
    pub cooldown_secs: u64,

    /// Batch size. A queue is "ready" once it holds this many participants.
    pub max_players_per_queue: usize,

    /// Half-width of the square region relocation targets are drawn from.
    pub spread: i32,

    /// Blocks added above the surface height at the chosen column.
    pub clearance: i32,

    /// Length of one countdown step in milliseconds.
    pub time_unit_ms: u64,

    /// Chat templates.
    pub messages: Messages,

    /// Banner shown when a batch is accepted.
    pub titles: Titles,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            teleport_delay: 5,
            cooldown_secs: 30,
            max_players_per_queue: 2,
            spread: 10_000,
            clearance: 2,
            time_unit_ms: 1_000,
            messages: Messages::default(),
            titles: Titles::default(),
        }
    }
}

impl QueueConfig {
    /// Longest accepted cooldown: one year.
    pub const MAX_COOLDOWN_SECS: u64 = 365 * 24 * 60 * 60;
    /// Longest accepted countdown step: one hour.
    pub const MAX_TIME_UNIT_MS: u64 = 60 * 60 * 1_000;
    /// Most countdown steps a session may have.
    pub const MAX_TELEPORT_DELAY: u32 = 3_600;

    /// Fix any out-of-range values so the config is safe to use.
    ///
    /// Rules:
    /// - `max_players_per_queue` raised to at least 1.
    /// - `spread` raised to at least 1.
    /// - `time_unit_ms` kept within `1..=MAX_TIME_UNIT_MS`.
    /// - `teleport_delay` lowered to at most [`Self::MAX_TELEPORT_DELAY`].
    /// - `cooldown_secs` lowered to at most [`Self::MAX_COOLDOWN_SECS`].
    pub fn validated(mut self) -> Self {
        if self.max_players_per_queue == 0 {
            warn!("max-players-per-queue is 0, using 1");
            self.max_players_per_queue = 1;
        }
        if self.spread < 1 {
            warn!(spread = self.spread, "spread must be positive, using 1");
            self.spread = 1;
        }
        if self.time_unit_ms == 0 {
            warn!("time-unit-ms is 0, using 1");
            self.time_unit_ms = 1;
        }
        if self.time_unit_ms > Self::MAX_TIME_UNIT_MS {
            warn!(
                time_unit_ms = self.time_unit_ms,
                max = Self::MAX_TIME_UNIT_MS,
                "time-unit-ms too large, clamping"
            );
            self.time_unit_ms = Self::MAX_TIME_UNIT_MS;
        }
        if self.teleport_delay > Self::MAX_TELEPORT_DELAY {
            warn!(
                teleport_delay = self.teleport_delay,
                max = Self::MAX_TELEPORT_DELAY,
                "teleport-delay too large, clamping"
            );
            self.teleport_delay = Self::MAX_TELEPORT_DELAY;
        }
        if self.cooldown_secs > Self::MAX_COOLDOWN_SECS {
            warn!(
                cooldown = self.cooldown_secs,
                max = Self::MAX_COOLDOWN_SECS,
                "cooldown too large, clamping"
            );
            self.cooldown_secs = Self::MAX_COOLDOWN_SECS;
        }
        self
    }

    /// Batch threshold.
    pub fn threshold(&self) -> usize {
        self.max_players_per_queue
    }

    /// Post-teleport cooldown.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Length of one countdown step.
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }
}

// ---------------------------------------------------------------------------
// Titles
// ---------------------------------------------------------------------------

/// Text and timing of the "accepted" banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Titles {
    pub teleport: String,
    pub teleport_subtitle: String,
    /// Host ticks.
    pub fade_in: u32,
    pub hold: u32,
    pub fade_out: u32,
}

impl Default for Titles {
    fn default() -> Self {
        Self {
            teleport: "&a&lACCEPTED".to_string(),
            teleport_subtitle: "&aTeleporting...".to_string(),
            fade_in: 10,
            hold: 40,
            fade_out: 10,
        }
    }
}

impl Titles {
    /// The banner shown when a batch is accepted.
    pub fn accepted_banner(&self) -> Banner {
        Banner {
            title: self.teleport.clone(),
            subtitle: self.teleport_subtitle.clone(),
            fade_in: self.fade_in,
            hold: self.hold,
            fade_out: self.fade_out,
        }
    }
}
