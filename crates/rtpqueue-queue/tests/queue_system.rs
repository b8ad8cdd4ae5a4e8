//! Integration tests for the queue actor using an in-memory host.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtpqueue_protocol::{
    Banner, Cue, DestinationKey, Notice, ParticipantId, Position, Recipient,
};
use rtpqueue_queue::{
    ChannelNotifier, DestinationResolver, Notifier, Presence, QueueConfig, QueueController,
    QueueError, QueueHandle, QueueStatus, Readiness, spawn_queue,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// =========================================================================
// Mock host: two flat worlds, notices forwarded to a channel.
// =========================================================================

struct MockHost {
    notifier: ChannelNotifier,
    offline: Mutex<HashSet<ParticipantId>>,
    moves: Mutex<Vec<(ParticipantId, DestinationKey, Position)>>,
}

impl MockHost {
    fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notifier, notices) = ChannelNotifier::new();
        let host = Self {
            notifier,
            offline: Mutex::new(HashSet::new()),
            moves: Mutex::new(Vec::new()),
        };
        (host, notices)
    }

    fn go_offline(&self, p: ParticipantId) {
        self.offline.lock().unwrap().insert(p);
    }

    fn moved(&self) -> Vec<ParticipantId> {
        self.moves.lock().unwrap().iter().map(|(p, _, _)| *p).collect()
    }
}

impl DestinationResolver for MockHost {
    fn resolve(&self, destination: &DestinationKey) -> bool {
        matches!(destination.as_str(), "spawn" | "nether")
    }
}

impl Presence for MockHost {
    fn is_reachable(&self, p: ParticipantId) -> bool {
        !self.offline.lock().unwrap().contains(&p)
    }

    fn display_name(&self, p: ParticipantId) -> Option<String> {
        self.is_reachable(p).then(|| format!("Steve{}", p.0))
    }

    fn current_position(&self, _: ParticipantId) -> Option<Position> {
        Some(Position::new(0, 70, 0))
    }

    fn surface_height_at(&self, _: &DestinationKey, _: i32, _: i32) -> Option<i32> {
        Some(63)
    }

    fn move_to(&self, p: ParticipantId, d: &DestinationKey, pos: Position) -> bool {
        self.moves.lock().unwrap().push((p, d.clone(), pos));
        true
    }
}

impl Notifier for MockHost {
    fn send_to_one(&self, p: ParticipantId, text: &str) {
        self.notifier.send_to_one(p, text);
    }

    fn broadcast_all(&self, text: &str) {
        self.notifier.broadcast_all(text);
    }

    fn show_banner(&self, p: ParticipantId, banner: &Banner) {
        self.notifier.show_banner(p, banner);
    }

    fn play_cue(&self, p: ParticipantId, cue: Cue) {
        self.notifier.play_cue(p, cue);
    }
}

// =========================================================================
// Helpers
// =========================================================================

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);
const C: ParticipantId = ParticipantId(3);

struct Harness {
    handle: QueueHandle,
    task: JoinHandle<()>,
    host: Arc<MockHost>,
    notices: mpsc::UnboundedReceiver<Notice>,
}

fn start(config: QueueConfig) -> Harness {
    let (host, notices) = MockHost::new();
    let host = Arc::new(host);
    let controller = QueueController::with_seed(config, Arc::clone(&host), 7);
    let (handle, task) = spawn_queue(controller, 32);
    Harness {
        handle,
        task,
        host,
        notices,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

fn cues_for(notices: &[Notice], who: ParticipantId, wanted: Cue) -> usize {
    notices
        .iter()
        .filter(|n| matches!(n, Notice::Cue { to, cue } if *to == who && *cue == wanted))
        .count()
}

fn texts_for(notices: &[Notice], who: ParticipantId) -> Vec<String> {
    notices
        .iter()
        .filter_map(|n| match n {
            Notice::Text {
                recipient: Recipient::Participant(p),
                text,
            } if *p == who => Some(text.clone()),
            _ => None,
        })
        .collect()
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// =========================================================================
// End-to-end scenarios
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_two_players_are_batched_and_teleported() {
    let mut h = start(QueueConfig::default());

    let first = h.handle.join(A, "spawn").await.unwrap();
    assert_eq!(first, Readiness::Waiting { size: 1, threshold: 2 });

    let second = h.handle.join(B, "Spawn").await.unwrap();
    assert!(matches!(second, Readiness::Launched(_)));
    assert_eq!(h.handle.count_of("spawn").await.unwrap(), 0);

    let mut notices = drain(&mut h.notices);
    let broadcasts: Vec<&Notice> = notices
        .iter()
        .filter(|n| matches!(n, Notice::Text { recipient: Recipient::All, .. }))
        .collect();
    assert_eq!(broadcasts.len(), 1);
    let Notice::Text { text, .. } = broadcasts[0] else {
        unreachable!()
    };
    assert!(text.contains("Steve1"), "broadcast should name A: {text}");
    assert!(text.contains("spawn"));

    advance(6_000).await;

    assert_eq!(h.host.moved(), vec![A, B]);
    let info = h.handle.info().await.unwrap();
    assert_eq!(info.active_sessions, 0);
    assert_eq!(info.pending_steps, 0);
    assert_eq!(info.cooldowns, 2);

    notices.extend(drain(&mut h.notices));
    assert_eq!(cues_for(&notices, A, Cue::Tick), 5);
    assert_eq!(cues_for(&notices, B, Cue::Teleported), 1);
}

#[tokio::test(start_paused = true)]
async fn test_batch_is_announced_before_broadcast() {
    let mut h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();
    h.handle.join(B, "spawn").await.unwrap();

    let notices = drain(&mut h.notices);
    let position = |pred: &dyn Fn(&Notice) -> bool| notices.iter().position(|n| pred(n));
    let accepted_b = position(&|n| {
        matches!(n, Notice::Cue { to, cue: Cue::Accepted } if *to == B)
    })
    .expect("B was not announced");
    let broadcast = position(&|n| {
        matches!(n, Notice::Text { recipient: Recipient::All, .. })
    })
    .expect("no broadcast");

    assert!(accepted_b < broadcast, "broadcast went out before the announcement");
}

#[tokio::test(start_paused = true)]
async fn test_countdown_steps_fire_one_unit_apart() {
    let mut h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();
    h.handle.join(B, "spawn").await.unwrap();

    advance(2_500).await;
    let notices = drain(&mut h.notices);
    assert_eq!(cues_for(&notices, A, Cue::Accepted), 1);
    assert_eq!(cues_for(&notices, A, Cue::Tick), 3);
    assert!(h.host.moved().is_empty());

    advance(3_000).await;
    let notices = drain(&mut h.notices);
    assert_eq!(cues_for(&notices, A, Cue::Tick), 2);
    assert_eq!(h.host.moved(), vec![A, B]);
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_after_teleport_hits_cooldown() {
    let h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();
    h.handle.join(B, "spawn").await.unwrap();
    advance(6_000).await;

    let result = h.handle.join(A, "spawn").await;
    match result {
        Err(QueueError::OnCooldown { remaining_secs }) => {
            assert!((28..=30).contains(&remaining_secs), "got {remaining_secs}");
        }
        other => panic!("expected cooldown, got {other:?}"),
    }
    assert_eq!(h.handle.status_of(A).await.unwrap(), QueueStatus::NotQueued);

    advance(30_000).await;
    assert!(h.handle.join(A, "spawn").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_join_keeps_single_entry() {
    let mut h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();

    let result = h.handle.join(A, "spawn").await;

    assert_eq!(
        result,
        Err(QueueError::AlreadyQueued(A, DestinationKey::from("spawn")))
    );
    assert_eq!(h.handle.count_of("spawn").await.unwrap(), 1);
    // joined + waiting + already-in-queue
    assert_eq!(texts_for(&drain(&mut h.notices), A).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_world_is_rejected() {
    let h = start(QueueConfig::default());
    let result = h.handle.join(A, "the_end").await;
    assert_eq!(result, Err(QueueError::UnknownDestination("the_end".into())));
    assert_eq!(h.handle.info().await.unwrap().queued, 0);
}

#[tokio::test(start_paused = true)]
async fn test_offline_at_execution_gets_no_cooldown() {
    let h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();
    h.handle.join(B, "spawn").await.unwrap();
    advance(4_500).await;

    h.host.go_offline(B);
    advance(1_000).await;

    assert_eq!(h.host.moved(), vec![A]);
    assert_eq!(h.handle.info().await.unwrap().cooldowns, 1);
    assert_eq!(h.handle.status_of(B).await.unwrap(), QueueStatus::NotQueued);
}

#[tokio::test(start_paused = true)]
async fn test_third_player_waits_for_next_batch() {
    let config = QueueConfig {
        teleport_delay: 2,
        ..QueueConfig::default()
    };
    let h = start(config);
    h.handle.join(A, "nether").await.unwrap();
    h.handle.join(B, "nether").await.unwrap();
    h.handle.join(C, "nether").await.unwrap();

    assert_eq!(
        h.handle.status_of(C).await.unwrap(),
        QueueStatus::Queued(DestinationKey::from("nether"))
    );
    advance(3_000).await;

    assert_eq!(h.host.moved(), vec![A, B]);
    assert_eq!(h.handle.count_of("NETHER").await.unwrap(), 1);
}

// =========================================================================
// Handle lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_leave_removes_from_queue() {
    let h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();

    assert_eq!(h.handle.leave(A).await, Ok(DestinationKey::from("spawn")));
    assert_eq!(h.handle.leave(A).await, Err(QueueError::NotQueued(A)));
    assert_eq!(h.handle.count_of("spawn").await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_pending_countdown() {
    let h = start(QueueConfig::default());
    h.handle.join(A, "spawn").await.unwrap();
    h.handle.join(B, "spawn").await.unwrap();
    advance(1_500).await;

    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();
    advance(10_000).await;

    assert!(h.host.moved().is_empty());
    assert_eq!(h.handle.join(C, "spawn").await, Err(QueueError::Unavailable));
    assert!(h.handle.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_actor_stops_when_handles_dropped() {
    let h = start(QueueConfig::default());
    let clone = h.handle.clone();
    drop(h.handle);
    assert_eq!(clone.count_of("spawn").await.unwrap(), 0);
    drop(clone);

    tokio::time::timeout(Duration::from_secs(1), h.task)
        .await
        .expect("actor should stop")
        .unwrap();
}
