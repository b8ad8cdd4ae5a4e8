//! Deadline-ordered timeline for rtpqueue.
//!
//! A [`Timeline`] holds future events, each tagged with the instant it is
//! due. Events come back out strictly in deadline order; events that share a
//! deadline come back in the order they were scheduled. Time is counted in
//! configurable *units* (one second by default) so countdown code can say
//! "three units from now" without caring about wall-clock durations.
//!
//! # Empty timeline
//!
//! When nothing is scheduled, [`Timeline::next_due`] pends forever. That is
//! the correct behavior inside a `tokio::select!` loop: the command branch
//! keeps running and the timer branch simply never wins.
//!
//! # Integration
//!
//! The timeline is designed to sit inside the queue actor's `tokio::select!`
//! loop, next to its command channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = cmd_rx.recv() => { /* handle commands, maybe schedule */ }
//!         fired = timeline.next_due() => {
//!             on_step(fired.event);
//!         }
//!     }
//! }
//! ```
//!
//! `next_due` is cancel-safe: if another branch wins, no event is lost.
//! Nothing is removed from the timeline until the deadline has passed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`Timeline`].
#[derive(Debug, Clone)]
pub struct TimelineConfig {
    /// Length of one time unit. Countdown steps are this far apart.
    pub time_unit: Duration,
    /// Fraction of a unit (0.0–1.0) an event may fire late before it is
    /// counted as an overrun and a warning is logged. Default: 0.10.
    pub late_warn_fraction: f64,
    /// Enable metrics collection.
    pub metrics_enabled: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            time_unit: Duration::from_secs(1),
            late_warn_fraction: 0.10,
            metrics_enabled: true,
        }
    }
}

impl TimelineConfig {
    /// Shortest accepted time unit.
    pub const MIN_TIME_UNIT: Duration = Duration::from_millis(1);

    /// Create a config with a specific unit and default settings.
    pub fn with_unit(time_unit: Duration) -> Self {
        Self {
            time_unit,
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Timeline::new`]. Rules:
    /// - `time_unit` raised to at least [`Self::MIN_TIME_UNIT`].
    /// - `late_warn_fraction` clamped to `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        if self.time_unit < Self::MIN_TIME_UNIT {
            warn!(
                unit_us = self.time_unit.as_micros() as u64,
                min_us = Self::MIN_TIME_UNIT.as_micros() as u64,
                "time_unit below minimum, clamping"
            );
            self.time_unit = Self::MIN_TIME_UNIT;
        }
        self.late_warn_fraction = self.late_warn_fraction.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Fired event (returned to caller)
// ---------------------------------------------------------------------------

/// An event whose deadline has passed, returned by
/// [`Timeline::pop_due`] and [`Timeline::next_due`].
#[derive(Debug, Clone)]
pub struct Fired<E> {
    /// The scheduled payload.
    pub event: E,
    /// When the event was due.
    pub deadline: Instant,
    /// How far past the deadline it was actually taken off the timeline.
    pub late_by: Duration,
    /// `true` if `late_by` exceeded the configured warning fraction of a unit.
    pub overrun: bool,
    /// Scheduling sequence number (monotonic per timeline).
    pub sequence: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime counters for a [`Timeline`].
#[derive(Debug, Clone, Default)]
pub struct TimelineMetrics {
    /// Events ever scheduled.
    pub total_scheduled: u64,
    /// Events handed back to the caller.
    pub total_fired: u64,
    /// Events that fired later than the warning threshold.
    pub total_overruns: u64,
    /// Events discarded by [`Timeline::clear`] without firing.
    pub total_dropped: u64,
    /// Largest lateness observed.
    pub max_late: Duration,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

struct Entry<E> {
    deadline: Instant,
    sequence: u64,
    event: E,
}

// `BinaryHeap` is a max-heap; invert the comparison so the earliest
// deadline (then the lowest sequence) sits on top.
impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl<E> Eq for Entry<E> {}

/// Deadline-ordered event queue.
///
/// Owned by exactly one task; it is not shared and needs no locking.
pub struct Timeline<E> {
    config: TimelineConfig,
    heap: BinaryHeap<Entry<E>>,
    next_sequence: u64,
    metrics: TimelineMetrics,
}

impl<E> Timeline<E> {
    /// Create an empty timeline from config.
    pub fn new(config: TimelineConfig) -> Self {
        let config = config.validated();
        debug!(
            unit_ms = config.time_unit.as_secs_f64() * 1000.0,
            "timeline created"
        );
        Self {
            config,
            heap: BinaryHeap::new(),
            next_sequence: 0,
            metrics: TimelineMetrics::default(),
        }
    }

    /// Create a timeline with a specific unit and default settings.
    pub fn with_unit(time_unit: Duration) -> Self {
        Self::new(TimelineConfig::with_unit(time_unit))
    }

    /// Length of one time unit.
    pub fn time_unit(&self) -> Duration {
        self.config.time_unit
    }

    /// Duration of `count` units.
    pub fn units(&self, count: u32) -> Duration {
        self.config.time_unit * count
    }

    /// Schedule `event` to fire at `deadline`. Returns its sequence number.
    pub fn schedule_at(&mut self, deadline: Instant, event: E) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Entry {
            deadline,
            sequence,
            event,
        });
        self.metrics.total_scheduled += 1;
        trace!(sequence, pending = self.heap.len(), "event scheduled");
        sequence
    }

    /// Schedule `event` to fire `units` time units after `from`.
    /// Returns the computed deadline.
    pub fn schedule_in(&mut self, from: Instant, units: u32, event: E) -> Instant {
        let deadline = from + self.units(units);
        self.schedule_at(deadline, event);
        deadline
    }

    /// Deadline of the earliest pending event, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Take the earliest event off the timeline if it is due at `now`.
    ///
    /// Returns `None` when the timeline is empty or the earliest deadline is
    /// still in the future. Call repeatedly to drain everything due.
    pub fn pop_due(&mut self, now: Instant) -> Option<Fired<E>> {
        if self.heap.peek()?.deadline > now {
            return None;
        }
        let entry = self.heap.pop()?;

        let late_by = now.saturating_duration_since(entry.deadline);
        let overrun =
            late_by.as_secs_f64() > self.config.time_unit.as_secs_f64() * self.config.late_warn_fraction;

        if overrun {
            warn!(
                sequence = entry.sequence,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "timeline event fired late"
            );
        }

        self.metrics.total_fired += 1;
        if self.config.metrics_enabled {
            if overrun {
                self.metrics.total_overruns += 1;
            }
            if late_by > self.metrics.max_late {
                self.metrics.max_late = late_by;
            }
        }

        trace!(sequence = entry.sequence, overrun, "event fired");

        Some(Fired {
            event: entry.event,
            deadline: entry.deadline,
            late_by,
            overrun,
            sequence: entry.sequence,
        })
    }

    /// Wait until the earliest event is due and return it.
    ///
    /// Pends forever while the timeline is empty. Events scheduled while this
    /// future is pending are only seen once the caller polls a fresh future,
    /// which a `select!` loop does on every iteration.
    pub async fn next_due(&mut self) -> Fired<E> {
        loop {
            let Some(deadline) = self.next_deadline() else {
                return std::future::pending().await;
            };

            time::sleep_until(deadline).await;

            if let Some(fired) = self.pop_due(Instant::now()) {
                return fired;
            }
        }
    }

    /// Drop every pending event without firing it. Returns how many were
    /// discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        self.metrics.total_dropped += dropped as u64;
        if dropped > 0 {
            debug!(dropped, "timeline cleared");
        }
        dropped
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TimelineMetrics {
        &self.metrics
    }
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}
