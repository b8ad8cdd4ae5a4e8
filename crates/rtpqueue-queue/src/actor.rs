//! Queue actor: the single Tokio task that owns the controller.
//!
//! All queue-mutating work happens here, one item at a time: commands from
//! the mpsc channel and steps coming due on the controller's timeline. No
//! lock guards the store; the task boundary does.

use std::time::Duration;

use rtpqueue_protocol::{DestinationKey, ParticipantId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{Host, QueueController, QueueError, QueueStatus, Readiness};

/// How often expired cooldown records are swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Commands sent to the queue actor.
///
/// Variants with a `reply` carry a oneshot "reply channel": the caller
/// sends the command and waits for the answer on it.
enum QueueCommand {
    Join {
        participant: ParticipantId,
        destination: String,
        reply: oneshot::Sender<Result<Readiness, QueueError>>,
    },
    Leave {
        participant: ParticipantId,
        reply: oneshot::Sender<Result<DestinationKey, QueueError>>,
    },
    Status {
        participant: ParticipantId,
        reply: oneshot::Sender<QueueStatus>,
    },
    Count {
        destination: String,
        reply: oneshot::Sender<usize>,
    },
    Info {
        reply: oneshot::Sender<QueueInfo>,
    },
    Shutdown,
}

impl std::fmt::Debug for QueueCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Join { participant, destination, .. } => {
                write!(f, "Join({participant}, {destination})")
            }
            Self::Leave { participant, .. } => write!(f, "Leave({participant})"),
            Self::Status { participant, .. } => write!(f, "Status({participant})"),
            Self::Count { destination, .. } => write!(f, "Count({destination})"),
            Self::Info { .. } => write!(f, "Info"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// A snapshot of queue-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    /// Participants waiting across all destinations.
    pub queued: usize,
    /// Sessions counting down.
    pub active_sessions: usize,
    /// Steps waiting on the timeline.
    pub pending_steps: usize,
    /// Cooldown records held, expired ones included until the next sweep.
    pub cooldowns: usize,
}

/// Handle to a running queue actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender`. Every method fails with
/// [`QueueError::Unavailable`] once the actor has stopped.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    sender: mpsc::Sender<QueueCommand>,
}

impl QueueHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> QueueCommand,
    ) -> Result<T, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| QueueError::Unavailable)?;
        reply_rx.await.map_err(|_| QueueError::Unavailable)
    }

    /// Queues a participant. See [`QueueController::join`].
    pub async fn join(
        &self,
        participant: ParticipantId,
        destination: impl Into<String>,
    ) -> Result<Readiness, QueueError> {
        let destination = destination.into();
        self.request(|reply| QueueCommand::Join {
            participant,
            destination,
            reply,
        })
        .await?
    }

    /// Removes a participant from their queue.
    pub async fn leave(&self, participant: ParticipantId) -> Result<DestinationKey, QueueError> {
        self.request(|reply| QueueCommand::Leave { participant, reply })
            .await?
    }

    pub async fn status_of(&self, participant: ParticipantId) -> Result<QueueStatus, QueueError> {
        self.request(|reply| QueueCommand::Status { participant, reply })
            .await
    }

    pub async fn count_of(&self, destination: impl Into<String>) -> Result<usize, QueueError> {
        let destination = destination.into();
        self.request(|reply| QueueCommand::Count { destination, reply })
            .await
    }

    pub async fn info(&self) -> Result<QueueInfo, QueueError> {
        self.request(|reply| QueueCommand::Info { reply }).await
    }

    /// Tells the actor to stop. Pending steps are dropped, not run.
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        self.sender
            .send(QueueCommand::Shutdown)
            .await
            .map_err(|_| QueueError::Unavailable)
    }

    /// `true` once the actor has stopped receiving commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The actor state. Runs inside a Tokio task.
struct QueueActor<H: Host> {
    controller: QueueController<H>,
    receiver: mpsc::Receiver<QueueCommand>,
}

impl<H: Host> QueueActor<H> {
    /// Processes commands and due steps until shutdown or until every
    /// handle is dropped.
    async fn run(self) {
        let Self {
            mut controller,
            mut receiver,
        } = self;

        let mut prune = time::interval(PRUNE_INTERVAL);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            threshold = controller.config().threshold(),
            countdown = controller.config().teleport_delay,
            "queue actor started"
        );

        loop {
            tokio::select! {
                cmd = receiver.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::debug!("all queue handles dropped");
                        break;
                    };
                    tracing::trace!(?cmd, "queue command");
                    if !handle_command(&mut controller, cmd) {
                        break;
                    }
                }
                fired = controller.next_step() => {
                    controller.apply(fired, Instant::now());
                }
                _ = prune.tick() => {
                    controller.prune_cooldowns(Instant::now());
                }
            }
        }

        controller.shutdown();
        tracing::info!("queue actor stopped");
    }
}

/// Applies one command. Returns `false` when the actor should stop.
fn handle_command<H: Host>(controller: &mut QueueController<H>, cmd: QueueCommand) -> bool {
    match cmd {
        QueueCommand::Join {
            participant,
            destination,
            reply,
        } => {
            let result = controller.join(participant, &destination, Instant::now());
            let _ = reply.send(result);
        }
        QueueCommand::Leave { participant, reply } => {
            let _ = reply.send(controller.leave(participant));
        }
        QueueCommand::Status { participant, reply } => {
            let _ = reply.send(controller.status_of(participant));
        }
        QueueCommand::Count { destination, reply } => {
            let _ = reply.send(controller.count_of(&destination));
        }
        QueueCommand::Info { reply } => {
            let _ = reply.send(QueueInfo {
                queued: controller.store().total_queued(),
                active_sessions: controller.active_sessions(),
                pending_steps: controller.pending_steps(),
                cooldowns: controller.store().cooldown_count(),
            });
        }
        QueueCommand::Shutdown => {
            tracing::info!("queue shutting down");
            return false;
        }
    }
    true
}

/// Spawns the queue actor and returns a handle plus its join handle.
///
/// `channel_size` bounds the command channel; when it fills up, senders
/// wait.
pub fn spawn_queue<H: Host>(
    controller: QueueController<H>,
    channel_size: usize,
) -> (QueueHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let actor = QueueActor {
        controller,
        receiver: rx,
    };
    let task = tokio::spawn(actor.run());

    (QueueHandle { sender: tx }, task)
}
