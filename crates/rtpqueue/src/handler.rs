//! The `rtpqueue` command: parsing, permission check, and dispatch.
//!
//! The flow for every invocation is:
//!   1. Console senders are turned away.
//!   2. Participants without `rtpqueue.use` get the `no-permission` message.
//!   3. The arguments are parsed into a [`Command`] and run against the
//!      queue actor.
//!
//! Every user-facing message is sent by the queue core or by this module;
//! the returned [`CommandOutcome`] tells the host what happened and whether
//! it still has something to do (show a menu, reply on the console).

use std::sync::Arc;

use rtpqueue_protocol::{DestinationKey, ParticipantId};
use rtpqueue_queue::{Host, Messages, QueueError, QueueHandle, Readiness, render};
use tracing::debug;

use crate::menu::{Menu, MenuAction, MenuView, MenuViewItem};
use crate::{QueuePlaceholders, RtpqueueError};

/// Permission node required for every `rtpqueue` subcommand.
pub const USE_PERMISSION: &str = "rtpqueue.use";

const CONSOLE_REJECTION: &str = "&cOnly players can use this command.";

const USAGE: [&str; 4] = [
    "&a&lRTPQueue &fUsage:",
    "&b/rtpqueue &f- Open the queue menu.",
    "&b/rtpqueue <world> &f- Join the queue for a world.",
    "&b/rtpqueue leave &f- Leave your current queue.",
];

/// Permission lookups, provided by the host.
pub trait Permissions: Send + Sync + 'static {
    fn has_permission(&self, participant: ParticipantId, node: &str) -> bool;
}

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSender {
    Console,
    Participant(ParticipantId),
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A parsed `rtpqueue` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `rtpqueue`
    OpenMenu,
    /// `rtpqueue <world>`; the name is lowercased.
    Join(String),
    /// `rtpqueue leave`
    Leave,
    /// Anything else.
    Usage,
}

impl Command {
    /// The command label.
    pub const LABEL: &'static str = "rtpqueue";

    /// Parses the arguments after the label.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        match args {
            [] => Self::OpenMenu,
            [arg] if arg.as_ref().eq_ignore_ascii_case("leave") => Self::Leave,
            [world] => Self::Join(world.as_ref().to_lowercase()),
            _ => Self::Usage,
        }
    }

    /// Parses a full command line such as `/rtpqueue spawn`.
    ///
    /// Returns `None` if the line is not an `rtpqueue` command.
    pub fn from_line(line: &str) -> Option<Self> {
        let mut words = line.trim().trim_start_matches('/').split_whitespace();
        let label = words.next()?;
        if !label.eq_ignore_ascii_case(Self::LABEL) {
            return None;
        }
        let args: Vec<&str> = words.collect();
        Some(Self::parse(&args))
    }
}

/// What a command invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Text for a sender the notifier cannot reach. The host prints it.
    ConsoleReply(String),
    /// Permission denied; `no-permission` was sent.
    Denied,
    /// The host should show this menu to the sender.
    OpenMenu(MenuView),
    /// The sender is queued.
    Joined(Readiness),
    /// The sender left a queue.
    Left(DestinationKey),
    /// The queue refused; the sender was already told why where applicable.
    Refused(QueueError),
    /// Usage lines were sent.
    Usage,
    /// A menu action that is not an `rtpqueue` command.
    UnknownAction(String),
}

// ---------------------------------------------------------------------------
// CommandHandler
// ---------------------------------------------------------------------------

/// Runs commands and menu clicks against a queue actor.
pub struct CommandHandler<H> {
    handle: QueueHandle,
    host: Arc<H>,
    menu: Arc<Menu>,
    placeholders: QueuePlaceholders,
    messages: Arc<Messages>,
}

impl<H> Clone for CommandHandler<H> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            host: Arc::clone(&self.host),
            menu: Arc::clone(&self.menu),
            placeholders: self.placeholders.clone(),
            messages: Arc::clone(&self.messages),
        }
    }
}

impl<H: Host + Permissions> CommandHandler<H> {
    pub(crate) fn new(
        handle: QueueHandle,
        host: Arc<H>,
        menu: Arc<Menu>,
        messages: Arc<Messages>,
    ) -> Self {
        Self {
            placeholders: QueuePlaceholders::new(handle.clone()),
            handle,
            host,
            menu,
            messages,
        }
    }

    /// Handles `rtpqueue <args...>` from any sender.
    pub async fn execute<S: AsRef<str>>(
        &self,
        sender: CommandSender,
        args: &[S],
    ) -> Result<CommandOutcome, RtpqueueError> {
        let participant = match sender {
            CommandSender::Console => {
                debug!("console tried to use rtpqueue");
                return Ok(CommandOutcome::ConsoleReply(CONSOLE_REJECTION.to_string()));
            }
            CommandSender::Participant(p) => p,
        };
        self.dispatch(participant, Command::parse(args)).await
    }

    /// Runs an already parsed command for a participant, permission first.
    pub async fn dispatch(
        &self,
        participant: ParticipantId,
        command: Command,
    ) -> Result<CommandOutcome, RtpqueueError> {
        if !self.host.has_permission(participant, USE_PERMISSION) {
            if let Some(text) = render(&self.messages.no_permission, &[]) {
                self.host.send_to_one(participant, &text);
            }
            debug!(%participant, "rtpqueue denied");
            return Ok(CommandOutcome::Denied);
        }

        debug!(%participant, ?command, "rtpqueue command");
        match command {
            Command::OpenMenu => Ok(CommandOutcome::OpenMenu(self.render_menu(participant).await)),
            Command::Join(world) => {
                settle(self.handle.join(participant, world).await, CommandOutcome::Joined)
            }
            Command::Leave => settle(self.handle.leave(participant).await, CommandOutcome::Left),
            Command::Usage => {
                for line in USAGE {
                    self.host.send_to_one(participant, line);
                }
                Ok(CommandOutcome::Usage)
            }
        }
    }

    /// Handles a click in a menu the host is showing.
    ///
    /// Clicks in other views, or on slots without a configured item, do
    /// nothing. Otherwise every action of the item runs in order.
    pub async fn click(
        &self,
        participant: ParticipantId,
        view_title: &str,
        clicked_name: &str,
    ) -> Result<Vec<CommandOutcome>, RtpqueueError> {
        if !self.menu.is_this_menu(view_title) {
            return Ok(Vec::new());
        }
        let Some(item) = self.menu.find_by_name(clicked_name) else {
            return Ok(Vec::new());
        };

        let mut outcomes = Vec::with_capacity(item.actions.len());
        for action in &item.actions {
            let outcome = match MenuAction::parse(action) {
                MenuAction::Run(command) => self.dispatch(participant, command).await?,
                MenuAction::Unknown(action) => {
                    self.host
                        .send_to_one(participant, &format!("&cUnknown menu action: {action}"));
                    CommandOutcome::UnknownAction(action)
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// The menu with `%rtpqueue_…%` tokens filled in for one participant.
    pub async fn render_menu(&self, participant: ParticipantId) -> MenuView {
        let who = Some(participant);
        let mut items = Vec::with_capacity(self.menu.items().len());
        for (slot, item) in self.menu.items() {
            let mut lore = Vec::with_capacity(item.lore.len());
            for line in &item.lore {
                lore.push(self.placeholders.expand(who, line).await);
            }
            items.push(MenuViewItem {
                slot: *slot,
                material: item.material.clone(),
                display_name: self.placeholders.expand(who, &item.display_name).await,
                lore,
            });
        }
        MenuView {
            title: self.menu.title().to_string(),
            size: self.menu.size(),
            items,
        }
    }
}

/// Turns a queue reply into an outcome. Only a stopped actor is an error;
/// refusals are normal results that the participant has already been
/// told about.
fn settle<T>(
    result: Result<T, QueueError>,
    ok: impl FnOnce(T) -> CommandOutcome,
) -> Result<CommandOutcome, RtpqueueError> {
    match result {
        Ok(value) => Ok(ok(value)),
        Err(QueueError::Unavailable) => Err(QueueError::Unavailable.into()),
        Err(e) => Ok(CommandOutcome::Refused(e)),
    }
}
