//! The queue controller: join/leave, readiness, batch extraction, and
//! driving teleport sessions off the timeline.
//!
//! The controller is plain synchronous state. Every entry point takes `now`
//! explicitly, so it can be driven by the queue actor in production and by
//! hand-rolled instants in tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rtpqueue_protocol::{DestinationKey, ParticipantId};
use rtpqueue_timer::{Fired, Timeline, TimelineMetrics};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    Host, MembershipStore, QueueConfig, QueueError, Relocator, SessionId, SessionStep, StepKind,
    TeleportSession, render,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a readiness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Nobody is queued for the destination.
    Idle,
    /// Some participants are queued, but fewer than the threshold.
    Waiting { size: usize, threshold: usize },
    /// A batch was extracted and a session started.
    Launched(SessionId),
}

/// Where a participant currently stands, as shown to players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    Queued(DestinationKey),
    NotQueued,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued(destination) => write!(f, "Queued for {destination}"),
            Self::NotQueued => write!(f, "Not in Queue"),
        }
    }
}

// ---------------------------------------------------------------------------
// QueueController
// ---------------------------------------------------------------------------

/// Owns the membership store, the running sessions and their timeline.
///
/// Only the controller mutates the store. Rejected joins leave every piece
/// of state untouched and send exactly one message to the requester.
pub struct QueueController<H: Host> {
    config: QueueConfig,
    host: Arc<H>,
    store: MembershipStore,
    sessions: HashMap<SessionId, TeleportSession>,
    timeline: Timeline<SessionStep>,
    relocator: Relocator,
    rng: StdRng,
    next_session: u64,
}

impl<H: Host> QueueController<H> {
    /// Creates a controller with an OS-seeded random source.
    pub fn new(config: QueueConfig, host: Arc<H>) -> Self {
        Self::with_rng(config, host, StdRng::from_os_rng())
    }

    /// Creates a controller whose relocation targets are reproducible.
    pub fn with_seed(config: QueueConfig, host: Arc<H>, seed: u64) -> Self {
        Self::with_rng(config, host, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: QueueConfig, host: Arc<H>, rng: StdRng) -> Self {
        let config = config.validated();
        Self {
            timeline: Timeline::with_unit(config.time_unit()),
            relocator: Relocator::from_config(&config),
            config,
            host,
            store: MembershipStore::new(),
            sessions: HashMap::new(),
            rng,
            next_session: 1,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn store(&self) -> &MembershipStore {
        &self.store
    }

    /// Number of sessions counting down or about to execute.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, id: SessionId) -> Option<&TeleportSession> {
        self.sessions.get(&id)
    }

    /// Steps waiting on the timeline, across all sessions.
    pub fn pending_steps(&self) -> usize {
        self.timeline.len()
    }

    pub fn timeline_metrics(&self) -> &TimelineMetrics {
        self.timeline.metrics()
    }

    // -- commands -----------------------------------------------------------

    /// Queues a participant for a destination.
    ///
    /// Checks run in a fixed order: destination exists, no active cooldown,
    /// not already queued. The first failing check sends its message and is
    /// returned; nothing is mutated. On success the participant is told they
    /// joined and readiness is evaluated before returning.
    pub fn join(
        &mut self,
        participant: ParticipantId,
        destination_name: &str,
        now: Instant,
    ) -> Result<Readiness, QueueError> {
        let destination = match DestinationKey::parse(destination_name) {
            Ok(key) if self.host.resolve(&key) => key,
            _ => {
                self.tell(
                    participant,
                    &self.config.messages.invalid_world,
                    &[("world", destination_name)],
                );
                debug!(%participant, destination = destination_name, "join rejected: unknown destination");
                return Err(QueueError::UnknownDestination(destination_name.to_string()));
            }
        };

        if let Some(remaining) = self.store.cooldown_remaining(participant, now) {
            let remaining_secs = remaining.as_secs();
            let secs = remaining_secs.to_string();
            self.tell(
                participant,
                &self.config.messages.cooldown_active,
                &[("cooldown", &secs)],
            );
            debug!(%participant, remaining_secs, "join rejected: on cooldown");
            return Err(QueueError::OnCooldown { remaining_secs });
        }

        if let Some(current) = self.store.queued_destination(participant) {
            self.tell(
                participant,
                &self.config.messages.already_in_queue,
                &[("world", current.as_str())],
            );
            debug!(%participant, %current, "join rejected: already queued");
            return Err(QueueError::AlreadyQueued(participant, current.clone()));
        }

        let size = self.store.enqueue(&destination, participant)?;
        self.tell(
            participant,
            &self.config.messages.queue_joined,
            &[("world", destination.as_str())],
        );
        info!(%participant, %destination, size, "participant queued");

        self.evaluate_readiness(&destination, now)
    }

    /// Removes a participant from whichever queue holds them.
    ///
    /// Readiness is not re-evaluated: a shorter queue cannot become ready.
    pub fn leave(&mut self, participant: ParticipantId) -> Result<DestinationKey, QueueError> {
        let destination = self
            .store
            .remove(participant)
            .ok_or(QueueError::NotQueued(participant))?;
        self.tell(participant, &self.config.messages.queue_leaved, &[]);
        info!(%participant, %destination, "participant left queue");
        Ok(destination)
    }

    /// Extracts a batch if the destination's queue has reached the
    /// threshold; otherwise tells the newest participant how many are
    /// waiting.
    ///
    /// At most one batch is extracted per call.
    pub fn evaluate_readiness(
        &mut self,
        destination: &DestinationKey,
        now: Instant,
    ) -> Result<Readiness, QueueError> {
        let size = self.store.size(destination);
        let threshold = self.config.threshold();

        if size == 0 {
            return Ok(Readiness::Idle);
        }

        if size < threshold {
            if let Some(newest) = self.store.newest(destination) {
                if self.host.is_reachable(newest) {
                    let (count, max) = (size.to_string(), threshold.to_string());
                    self.tell(
                        newest,
                        &self.config.messages.not_enough_players,
                        &[
                            ("world", destination.as_str()),
                            ("count", &count),
                            ("max", &max),
                        ],
                    );
                }
            }
            return Ok(Readiness::Waiting { size, threshold });
        }

        let batch = self.store.dequeue_batch(destination, threshold)?;
        let id = self.start_session(destination.clone(), batch, now);
        Ok(Readiness::Launched(id))
    }

    fn start_session(
        &mut self,
        destination: DestinationKey,
        batch: Vec<ParticipantId>,
        now: Instant,
    ) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;

        let session = TeleportSession::new(
            id,
            destination,
            batch,
            self.config.teleport_delay,
            self.config.cooldown(),
            now,
        );
        session.announce(self.host.as_ref(), &self.config);

        // The broadcast names the participant who waited longest.
        if let Some(&first) = session.batch().first() {
            if self.host.is_reachable(first) {
                let player = self
                    .host
                    .display_name(first)
                    .unwrap_or_else(|| first.to_string());
                if let Some(text) = render(
                    &self.config.messages.queue_joined_broadcast,
                    &[("player", &player), ("world", session.destination().as_str())],
                ) {
                    self.host.broadcast_all(&text);
                }
            }
        }

        for (offset, step) in session.plan() {
            self.timeline.schedule_in(now, offset, step);
        }

        info!(
            session = %id,
            destination = %session.destination(),
            batch = ?session.batch(),
            countdown = session.countdown(),
            "session started"
        );
        self.sessions.insert(id, session);
        id
    }

    // -- timeline -----------------------------------------------------------

    /// Applies one scheduled step.
    ///
    /// On execution, reachable members get a cooldown ending `cooldown` after
    /// `now`, the session is discarded and readiness is re-evaluated for its
    /// destination.
    pub fn on_step(&mut self, step: SessionStep, now: Instant) -> Result<(), QueueError> {
        let session = self
            .sessions
            .get_mut(&step.session)
            .ok_or(QueueError::SessionNotFound(step.session))?;

        match step.kind {
            StepKind::Countdown { remaining } => {
                session.count_down(remaining, self.host.as_ref(), &self.config)
            }
            StepKind::Execute => {
                let relocated = session.execute(
                    self.host.as_ref(),
                    &self.config,
                    &self.relocator,
                    &mut self.rng,
                )?;
                let expires_at = now + session.cooldown();
                for &participant in &relocated {
                    self.store.set_cooldown(participant, expires_at);
                }
                session.complete()?;

                let destination = session.destination().clone();
                self.sessions.remove(&step.session);
                info!(
                    session = %step.session,
                    %destination,
                    relocated = relocated.len(),
                    "session completed"
                );

                self.evaluate_readiness(&destination, now).map(|_| ())
            }
        }
    }

    /// Applies every step due at `now`, in deadline order. Returns how many
    /// steps ran.
    ///
    /// Steps that fail are logged and skipped.
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while let Some(fired) = self.timeline.pop_due(now) {
            self.apply(fired, now);
            ran += 1;
        }
        ran
    }

    /// Waits for the next scheduled step. Pends forever when none exist.
    ///
    /// Cancel-safe: dropping the future leaves the step on the timeline.
    pub async fn next_step(&mut self) -> Fired<SessionStep> {
        self.timeline.next_due().await
    }

    /// Applies a step returned by [`next_step`](Self::next_step), logging
    /// instead of returning failures.
    pub fn apply(&mut self, fired: Fired<SessionStep>, now: Instant) {
        let step = fired.event;
        if let Err(e) = self.on_step(step, now) {
            warn!(session = %step.session, error = %e, "session step failed");
        }
    }

    // -- queries ------------------------------------------------------------

    pub fn status_of(&self, participant: ParticipantId) -> QueueStatus {
        match self.store.queued_destination(participant) {
            Some(destination) => QueueStatus::Queued(destination.clone()),
            None => QueueStatus::NotQueued,
        }
    }

    /// Queue size for a destination name (case-insensitive).
    pub fn count_of(&self, destination_name: &str) -> usize {
        self.store.size(&DestinationKey::from(destination_name))
    }

    // -- maintenance --------------------------------------------------------

    /// Drops expired cooldown records.
    pub fn prune_cooldowns(&mut self, now: Instant) -> usize {
        let pruned = self.store.prune_cooldowns(now);
        if pruned > 0 {
            debug!(pruned, "expired cooldowns pruned");
        }
        pruned
    }

    /// Drops every pending step and running session without completing
    /// them. Queued participants stay queued. Returns the number of steps
    /// dropped.
    pub fn shutdown(&mut self) -> usize {
        let dropped = self.timeline.clear();
        let sessions = self.sessions.len();
        self.sessions.clear();
        info!(dropped_steps = dropped, sessions, "queue controller shut down");
        dropped
    }

    fn tell(&self, participant: ParticipantId, template: &[String], vars: &[(&str, &str)]) {
        if let Some(text) = render(template, vars) {
            self.host.send_to_one(participant, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use rtpqueue_protocol::{Banner, Cue, Position};

    use super::*;
    use crate::{DestinationResolver, Notifier, Presence};

    // =====================================================================
    // Test host
    // =====================================================================

    #[derive(Default)]
    struct TestHost {
        offline: Mutex<HashSet<ParticipantId>>,
        texts: Mutex<Vec<(ParticipantId, String)>>,
        broadcasts: Mutex<Vec<String>>,
        cues: Mutex<Vec<(ParticipantId, Cue)>>,
        moves: Mutex<Vec<(ParticipantId, Position)>>,
    }

    impl TestHost {
        fn set_offline(&self, p: ParticipantId, offline: bool) {
            let mut set = self.offline.lock().unwrap();
            if offline {
                set.insert(p);
            } else {
                set.remove(&p);
            }
        }

        fn texts_for(&self, p: ParticipantId) -> Vec<String> {
            self.texts
                .lock()
                .unwrap()
                .iter()
                .filter(|(to, _)| *to == p)
                .map(|(_, text)| text.clone())
                .collect()
        }

        fn cues_for(&self, p: ParticipantId) -> Vec<Cue> {
            self.cues
                .lock()
                .unwrap()
                .iter()
                .filter(|(to, _)| *to == p)
                .map(|(_, cue)| *cue)
                .collect()
        }

        fn moved(&self) -> Vec<ParticipantId> {
            self.moves.lock().unwrap().iter().map(|(p, _)| *p).collect()
        }
    }

    impl DestinationResolver for TestHost {
        fn resolve(&self, destination: &DestinationKey) -> bool {
            matches!(destination.as_str(), "spawn" | "nether")
        }
    }

    impl Presence for TestHost {
        fn is_reachable(&self, p: ParticipantId) -> bool {
            !self.offline.lock().unwrap().contains(&p)
        }
        fn display_name(&self, p: ParticipantId) -> Option<String> {
            Some(format!("player{}", p.0))
        }
        fn current_position(&self, _: ParticipantId) -> Option<Position> {
            None
        }
        fn surface_height_at(&self, _: &DestinationKey, _: i32, _: i32) -> Option<i32> {
            Some(64)
        }
        fn move_to(&self, p: ParticipantId, _: &DestinationKey, pos: Position) -> bool {
            self.moves.lock().unwrap().push((p, pos));
            true
        }
    }

    impl Notifier for TestHost {
        fn send_to_one(&self, p: ParticipantId, text: &str) {
            self.texts.lock().unwrap().push((p, text.to_string()));
        }
        fn broadcast_all(&self, text: &str) {
            self.broadcasts.lock().unwrap().push(text.to_string());
        }
        fn show_banner(&self, _: ParticipantId, _: &Banner) {}
        fn play_cue(&self, p: ParticipantId, cue: Cue) {
            self.cues.lock().unwrap().push((p, cue));
        }
    }

    const A: ParticipantId = ParticipantId(1);
    const B: ParticipantId = ParticipantId(2);
    const C: ParticipantId = ParticipantId(3);

    fn plain_config() -> QueueConfig {
        let mut config = QueueConfig::default();
        config.messages.queue_joined = vec!["joined {world}".into()];
        config.messages.not_enough_players = vec!["waiting {count}/{max} for {world}".into()];
        config.messages.queue_joined_broadcast = vec!["{player} -> {world}".into()];
        config.messages.cooldown_active = vec!["cooldown {cooldown}".into()];
        config.messages.already_in_queue = vec!["already {world}".into()];
        config.messages.invalid_world = vec!["no world {world}".into()];
        config.messages.teleport = vec!["in {time}".into()];
        config
    }

    fn controller() -> (QueueController<TestHost>, Arc<TestHost>) {
        let host = Arc::new(TestHost::default());
        let controller = QueueController::with_seed(plain_config(), Arc::clone(&host), 42);
        (controller, host)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    // =====================================================================
    // join
    // =====================================================================

    #[test]
    fn test_join_below_threshold_reports_waiting() {
        let (mut ctl, host) = controller();
        let now = Instant::now();

        let result = ctl.join(A, "Spawn", now);

        assert_eq!(result, Ok(Readiness::Waiting { size: 1, threshold: 2 }));
        assert_eq!(
            host.texts_for(A),
            vec!["joined spawn".to_string(), "waiting 1/2 for spawn".to_string()]
        );
        assert_eq!(ctl.status_of(A), QueueStatus::Queued(DestinationKey::from("spawn")));
    }

    #[test]
    fn test_join_unknown_destination_rejected() {
        let (mut ctl, host) = controller();

        let result = ctl.join(A, "moon", Instant::now());

        assert_eq!(result, Err(QueueError::UnknownDestination("moon".into())));
        assert_eq!(host.texts_for(A), vec!["no world moon".to_string()]);
        assert!(!ctl.store().is_queued(A));
    }

    #[test]
    fn test_join_blank_destination_rejected() {
        let (mut ctl, _host) = controller();
        let result = ctl.join(A, "   ", Instant::now());
        assert!(matches!(result, Err(QueueError::UnknownDestination(_))));
    }

    #[test]
    fn test_join_twice_is_already_queued() {
        let (mut ctl, host) = controller();
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();

        let result = ctl.join(A, "nether", now);

        assert_eq!(
            result,
            Err(QueueError::AlreadyQueued(A, DestinationKey::from("spawn")))
        );
        assert_eq!(ctl.count_of("spawn"), 1);
        assert_eq!(ctl.count_of("nether"), 0);
        assert_eq!(host.texts_for(A).last().unwrap(), "already spawn");
    }

    #[test]
    fn test_join_reaching_threshold_extracts_fifo_batch() {
        let (mut ctl, host) = controller();
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();

        let result = ctl.join(B, "spawn", now).unwrap();

        let Readiness::Launched(id) = result else {
            panic!("expected a session, got {result:?}");
        };
        assert_eq!(ctl.count_of("spawn"), 0);
        assert_eq!(ctl.session(id).unwrap().batch(), &[A, B]);
        assert_eq!(
            host.broadcasts.lock().unwrap().as_slice(),
            &["player1 -> spawn".to_string()]
        );
        assert_eq!(host.cues_for(A), vec![Cue::Accepted]);
        assert_eq!(host.cues_for(B), vec![Cue::Accepted]);
    }

    #[test]
    fn test_join_while_session_runs_starts_new_queue() {
        let (mut ctl, _host) = controller();
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();
        ctl.join(B, "spawn", now).unwrap();

        let result = ctl.join(C, "spawn", now);

        assert_eq!(result, Ok(Readiness::Waiting { size: 1, threshold: 2 }));
        assert_eq!(ctl.active_sessions(), 1);
    }

    // =====================================================================
    // leave / queries
    // =====================================================================

    #[test]
    fn test_leave_removes_participant() {
        let (mut ctl, _host) = controller();
        ctl.join(A, "spawn", Instant::now()).unwrap();

        assert_eq!(ctl.leave(A), Ok(DestinationKey::from("spawn")));
        assert_eq!(ctl.status_of(A), QueueStatus::NotQueued);
        assert_eq!(ctl.count_of("SPAWN"), 0);
    }

    #[test]
    fn test_leave_when_not_queued_fails() {
        let (mut ctl, host) = controller();
        assert_eq!(ctl.leave(A), Err(QueueError::NotQueued(A)));
        assert!(host.texts_for(A).is_empty());
    }

    #[test]
    fn test_queue_status_display() {
        assert_eq!(
            QueueStatus::Queued(DestinationKey::from("spawn")).to_string(),
            "Queued for spawn"
        );
        assert_eq!(QueueStatus::NotQueued.to_string(), "Not in Queue");
    }

    // =====================================================================
    // readiness
    // =====================================================================

    #[test]
    fn test_evaluate_readiness_empty_is_idle() {
        let (mut ctl, host) = controller();
        let result = ctl.evaluate_readiness(&DestinationKey::from("spawn"), Instant::now());
        assert_eq!(result, Ok(Readiness::Idle));
        assert!(host.texts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_evaluate_readiness_low_size_is_idempotent() {
        let (mut ctl, host) = controller();
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();
        let key = DestinationKey::from("spawn");

        for _ in 0..3 {
            assert_eq!(
                ctl.evaluate_readiness(&key, now),
                Ok(Readiness::Waiting { size: 1, threshold: 2 })
            );
        }
        assert_eq!(ctl.store().members(&key), vec![A]);
        assert_eq!(ctl.active_sessions(), 0);
        // joined + one status per evaluation
        assert_eq!(host.texts_for(A).len(), 5);
    }

    #[test]
    fn test_not_enough_players_goes_to_newest_only() {
        let host = Arc::new(TestHost::default());
        let config = QueueConfig {
            max_players_per_queue: 3,
            ..plain_config()
        };
        let mut ctl = QueueController::with_seed(config, Arc::clone(&host), 1);
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();
        ctl.join(B, "spawn", now).unwrap();

        assert_eq!(host.texts_for(B).last().unwrap(), "waiting 2/3 for spawn");
        assert_eq!(
            host.texts_for(A),
            vec!["joined spawn".to_string(), "waiting 1/3 for spawn".to_string()]
        );
    }

    #[test]
    fn test_broadcast_skipped_when_first_member_unreachable() {
        let (mut ctl, host) = controller();
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();
        host.set_offline(A, true);

        ctl.join(B, "spawn", now).unwrap();

        assert!(host.broadcasts.lock().unwrap().is_empty());
        assert_eq!(ctl.active_sessions(), 1);
    }

    // =====================================================================
    // sessions
    // =====================================================================

    #[test]
    fn test_full_session_relocates_and_sets_cooldown() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();

        assert_eq!(ctl.pending_steps(), 6);
        assert_eq!(ctl.run_due(t0), 1);
        assert_eq!(ctl.run_due(t0 + secs(4)), 4);
        assert!(host.moved().is_empty());

        assert_eq!(ctl.run_due(t0 + secs(5)), 1);

        assert_eq!(host.moved(), vec![A, B]);
        assert_eq!(ctl.active_sessions(), 0);
        let expected_countdown: Vec<String> =
            (1..=5).rev().map(|n| format!("in {n}")).collect();
        let texts_a: Vec<String> = host
            .texts_for(A)
            .into_iter()
            .filter(|t| t.starts_with("in "))
            .collect();
        assert_eq!(texts_a, expected_countdown);
        assert_eq!(
            ctl.store().cooldown_remaining(A, t0 + secs(5)),
            Some(secs(30))
        );
        assert_eq!(host.cues_for(B).last(), Some(&Cue::Teleported));
    }

    #[test]
    fn test_rejoin_during_cooldown_rejected_then_accepted() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.run_due(t0 + secs(5));

        let result = ctl.join(A, "spawn", t0 + secs(6));
        assert_eq!(result, Err(QueueError::OnCooldown { remaining_secs: 29 }));
        assert_eq!(host.texts_for(A).last().unwrap(), "cooldown 29");
        assert!(!ctl.store().is_queued(A));

        let result = ctl.join(A, "spawn", t0 + secs(35));
        assert!(result.is_ok());
    }

    #[test]
    fn test_cooldown_remaining_truncates_to_whole_seconds() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.run_due(t0 + secs(5));

        let result = ctl.join(A, "spawn", t0 + Duration::from_millis(5_500));
        assert_eq!(result, Err(QueueError::OnCooldown { remaining_secs: 29 }));
        assert_eq!(host.texts_for(A).last().unwrap(), "cooldown 29");
    }

    #[test]
    fn test_huge_cooldown_is_clamped_and_execution_survives() {
        let host = Arc::new(TestHost::default());
        let config = QueueConfig {
            cooldown_secs: i64::MAX as u64,
            ..plain_config()
        };
        let mut ctl = QueueController::with_seed(config, Arc::clone(&host), 42);
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();

        assert_eq!(ctl.run_due(t0 + secs(5)), 6);

        assert_eq!(host.moved(), vec![A, B]);
        assert_eq!(
            ctl.store().cooldown_remaining(A, t0 + secs(5)),
            Some(secs(QueueConfig::MAX_COOLDOWN_SECS))
        );
        assert!(matches!(
            ctl.join(A, "spawn", t0 + secs(6)),
            Err(QueueError::OnCooldown { .. })
        ));
    }

    #[test]
    fn test_unreachable_member_skips_single_step() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.run_due(t0 + secs(1));

        host.set_offline(A, true);
        ctl.run_due(t0 + secs(2));
        host.set_offline(A, false);
        ctl.run_due(t0 + secs(5));

        let ticks_a = host.cues_for(A).iter().filter(|c| **c == Cue::Tick).count();
        let ticks_b = host.cues_for(B).iter().filter(|c| **c == Cue::Tick).count();
        assert_eq!((ticks_a, ticks_b), (4, 5));
        assert_eq!(host.moved(), vec![A, B]);
    }

    #[test]
    fn test_unreachable_at_execution_is_dropped() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.run_due(t0 + secs(4));

        host.set_offline(B, true);
        ctl.run_due(t0 + secs(5));

        assert_eq!(host.moved(), vec![A]);
        assert!(ctl.store().cooldown_remaining(B, t0 + secs(5)).is_none());
        assert!(!ctl.store().is_queued(B));
    }

    #[test]
    fn test_completion_reevaluates_destination() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.join(C, "spawn", t0).unwrap();
        let before = host.texts_for(C).len();

        ctl.run_due(t0 + secs(5));

        let texts = host.texts_for(C);
        assert_eq!(texts.len(), before + 1);
        assert_eq!(texts.last().unwrap(), "waiting 1/2 for spawn");
    }

    #[test]
    fn test_zero_delay_executes_on_first_run() {
        let host = Arc::new(TestHost::default());
        let config = QueueConfig {
            teleport_delay: 0,
            ..plain_config()
        };
        let mut ctl = QueueController::with_seed(config, Arc::clone(&host), 3);
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();

        assert_eq!(ctl.run_due(t0), 1);
        assert_eq!(host.moved(), vec![A, B]);
    }

    #[test]
    fn test_on_step_unknown_session_fails() {
        let (mut ctl, _host) = controller();
        let step = SessionStep {
            session: SessionId(99),
            kind: StepKind::Execute,
        };
        assert_eq!(
            ctl.on_step(step, Instant::now()),
            Err(QueueError::SessionNotFound(SessionId(99)))
        );
    }

    #[test]
    fn test_shutdown_drops_pending_steps() {
        let (mut ctl, host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.join(C, "spawn", t0).unwrap();

        assert_eq!(ctl.shutdown(), 6);
        assert_eq!(ctl.run_due(t0 + secs(10)), 0);
        assert!(host.moved().is_empty());
        assert_eq!(ctl.active_sessions(), 0);
        assert!(ctl.store().is_queued(C));
    }

    #[test]
    fn test_prune_cooldowns_after_expiry() {
        let (mut ctl, _host) = controller();
        let t0 = Instant::now();
        ctl.join(A, "spawn", t0).unwrap();
        ctl.join(B, "spawn", t0).unwrap();
        ctl.run_due(t0 + secs(5));

        assert_eq!(ctl.prune_cooldowns(t0 + secs(10)), 0);
        assert_eq!(ctl.prune_cooldowns(t0 + secs(40)), 2);
    }

    // =====================================================================
    // ordering and uniqueness
    // =====================================================================

    #[test]
    fn test_batch_skips_participants_who_left() {
        const D: ParticipantId = ParticipantId(4);
        let host = Arc::new(TestHost::default());
        let config = QueueConfig {
            max_players_per_queue: 3,
            ..plain_config()
        };
        let mut ctl = QueueController::with_seed(config, Arc::clone(&host), 42);
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();
        ctl.join(B, "spawn", now).unwrap();
        ctl.leave(B).unwrap();
        ctl.join(C, "spawn", now).unwrap();

        let Readiness::Launched(id) = ctl.join(D, "spawn", now).unwrap() else {
            panic!("expected a session");
        };

        assert_eq!(ctl.session(id).unwrap().batch(), &[A, C, D]);
        assert_eq!(ctl.count_of("spawn"), 0);
    }

    #[test]
    fn test_batch_is_earliest_still_present_arrivals() {
        const D: ParticipantId = ParticipantId(4);
        let (mut ctl, _host) = controller();
        let now = Instant::now();
        ctl.join(A, "spawn", now).unwrap();
        ctl.leave(A).unwrap();
        ctl.join(B, "nether", now).unwrap();
        ctl.join(C, "spawn", now).unwrap();
        ctl.leave(B).unwrap();

        let Readiness::Launched(id) = ctl.join(A, "spawn", now).unwrap() else {
            panic!("expected a session");
        };
        assert_eq!(ctl.session(id).unwrap().batch(), &[C, A]);

        ctl.join(D, "spawn", now).unwrap();
        assert_eq!(ctl.status_of(D), QueueStatus::Queued(DestinationKey::from("spawn")));
        assert_eq!(ctl.store().members(&DestinationKey::from("spawn")), vec![D]);
    }

    #[test]
    fn test_membership_index_matches_queues_after_every_step() {
        const D: ParticipantId = ParticipantId(4);
        let (mut ctl, _host) = controller();
        let now = Instant::now();
        let everyone = [A, B, C, D];

        let check = |ctl: &QueueController<TestHost>| {
            let spawn = ctl.store().members(&DestinationKey::from("spawn"));
            let nether = ctl.store().members(&DestinationKey::from("nether"));
            for p in everyone {
                let listed = [&spawn, &nether]
                    .iter()
                    .filter(|members| members.contains(&p))
                    .count();
                assert!(listed <= 1, "{p} listed {listed} times");
                let expected = if spawn.contains(&p) {
                    Some(DestinationKey::from("spawn"))
                } else if nether.contains(&p) {
                    Some(DestinationKey::from("nether"))
                } else {
                    None
                };
                assert_eq!(ctl.store().queued_destination(p).cloned(), expected);
            }
            assert_eq!(ctl.store().total_queued(), spawn.len() + nether.len());
        };

        let steps = [
            (A, Some("spawn")),
            (B, Some("nether")),
            (A, Some("nether")),
            (A, None),
            (A, Some("nether")),
            (C, Some("spawn")),
            (C, None),
            (D, Some("spawn")),
            (C, Some("spawn")),
            (B, None),
        ];
        for (participant, destination) in steps {
            let _ = match destination {
                Some(name) => ctl.join(participant, name, now).map(|_| ()),
                None => ctl.leave(participant).map(|_| ()),
            };
            check(&ctl);
        }
    }
}
