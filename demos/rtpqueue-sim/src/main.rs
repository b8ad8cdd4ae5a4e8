//! Scripted rtpqueue session against an in-memory world.
//!
//! Run with `cargo run -p rtpqueue-sim [settings.toml]`. Without an argument
//! the bundled `rtpqueue.toml` is used. `RUST_LOG=debug` shows every
//! countdown step.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use rtpqueue::prelude::*;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SETTINGS: &str = include_str!("../rtpqueue.toml");

// ---------------------------------------------------------------------------
// In-memory world
// ---------------------------------------------------------------------------

struct SimWorld {
    worlds: HashSet<&'static str>,
    names: HashMap<ParticipantId, &'static str>,
    banned: HashSet<ParticipantId>,
    positions: Mutex<HashMap<ParticipantId, Position>>,
    notifier: ChannelNotifier,
}

impl SimWorld {
    fn new(notifier: ChannelNotifier) -> Self {
        Self {
            worlds: HashSet::from(["world", "nether"]),
            names: HashMap::from([
                (ParticipantId(1), "Alex"),
                (ParticipantId(2), "Blair"),
                (ParticipantId(3), "Casey"),
                (ParticipantId(4), "Dana"),
            ]),
            banned: HashSet::from([ParticipantId(4)]),
            positions: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    fn name(&self, p: ParticipantId) -> String {
        self.names
            .get(&p)
            .map_or_else(|| p.to_string(), |n| n.to_string())
    }
}

impl DestinationResolver for SimWorld {
    fn resolve(&self, destination: &DestinationKey) -> bool {
        self.worlds.contains(destination.as_str())
    }
}

impl Presence for SimWorld {
    fn is_reachable(&self, p: ParticipantId) -> bool {
        self.names.contains_key(&p)
    }

    fn display_name(&self, p: ParticipantId) -> Option<String> {
        self.is_reachable(p).then(|| self.name(p))
    }

    fn current_position(&self, p: ParticipantId) -> Option<Position> {
        self.positions.lock().ok()?.get(&p).copied()
    }

    fn surface_height_at(&self, destination: &DestinationKey, x: i32, z: i32) -> Option<i32> {
        // Gently rolling overworld; the nether is flat.
        match destination.as_str() {
            "world" => Some(64 + ((x / 16 + z / 16).rem_euclid(8))),
            "nether" => Some(32),
            _ => None,
        }
    }

    fn move_to(&self, p: ParticipantId, destination: &DestinationKey, position: Position) -> bool {
        let Ok(mut positions) = self.positions.lock() else {
            return false;
        };
        positions.insert(p, position);
        info!(player = %self.name(p), %destination, %position, "moved");
        true
    }
}

impl Notifier for SimWorld {
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

impl Permissions for SimWorld {
    fn has_permission(&self, p: ParticipantId, _node: &str) -> bool {
        !self.banned.contains(&p)
    }
}

/// Prints what each player would see.
async fn print_notices(mut rx: mpsc::UnboundedReceiver<Notice>, names: HashMap<ParticipantId, &'static str>) {
    let name = |p: &ParticipantId| names.get(p).copied().unwrap_or("?");
    while let Some(notice) = rx.recv().await {
        match notice {
            Notice::Text {
                recipient: Recipient::All,
                text,
            } => println!("[everyone] {}", strip_color(&text)),
            Notice::Text {
                recipient: Recipient::Participant(p),
                text,
            } => {
                for line in text.lines() {
                    println!("[{}] {}", name(&p), strip_color(line));
                }
            }
            Notice::Banner { to, banner } => println!(
                "[{}] ** {} / {} **",
                name(&to),
                strip_color(&banner.title),
                strip_color(&banner.subtitle)
            ),
            Notice::Cue { to, cue } => println!("[{}] <{cue:?}>", name(&to)),
        }
    }
}

fn print_menu(view: &MenuView) {
    println!("+-- {} ({} slots)", strip_color(&view.title), view.size);
    for item in &view.items {
        println!("|  [{:>2}] {} ({})", item.slot, strip_color(&item.display_name), item.material);
        for line in &item.lore {
            println!("|        {}", strip_color(line));
        }
    }
    println!("+--");
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), RtpqueueError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::from_toml_str(DEFAULT_SETTINGS)?,
    };
    let unit = settings.queue.time_unit();
    let countdown = settings.queue.teleport_delay;

    let (notifier, notices) = ChannelNotifier::new();
    let world = Arc::new(SimWorld::new(notifier));
    let printer = tokio::spawn(print_notices(notices, world.names.clone()));

    let queue = RtpQueue::builder().settings(settings).build(Arc::clone(&world));

    let [alex, blair, casey, dana] = [1, 2, 3, 4].map(ParticipantId);
    let player = CommandSender::Participant;

    info!("-- Alex opens the menu");
    if let CommandOutcome::OpenMenu(view) = queue.execute::<&str>(player(alex), &[]).await? {
        print_menu(&view);
    }

    info!("-- the console and Dana are turned away");
    if let CommandOutcome::ConsoleReply(text) = queue.execute(CommandSender::Console, &["world"]).await? {
        println!("[console] {}", strip_color(&text));
    }
    queue.execute(player(dana), &["world"]).await?;

    info!("-- Alex clicks Overworld, Blair types the command, Casey joins late");
    queue.click(alex, "&b&lRTP Queue Menu", "Overworld").await?;
    queue.execute(player(blair), &["WORLD"]).await?;
    queue.execute(player(casey), &["world"]).await?;

    tokio::time::sleep(unit * (countdown + 1)).await;

    info!("-- Alex tries again straight away");
    queue.execute(player(alex), &["world"]).await?;

    info!("-- Casey gives up");
    queue.execute(player(casey), &["leave"]).await?;

    print_menu(&queue.open_menu(blair).await);

    let stats = queue.handle().info().await?;
    info!(
        queued = stats.queued,
        sessions = stats.active_sessions,
        cooldowns = stats.cooldowns,
        "final state"
    );

    queue.shutdown().await?;
    // Last reference to the notifier; the printer drains and stops.
    drop(world);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "notice printer failed");
    }
    Ok(())
}
