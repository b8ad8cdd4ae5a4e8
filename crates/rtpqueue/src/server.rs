//! `RtpQueue` builder and runtime.
//!
//! This is the entry point for embedding rtpqueue in a host. It ties the
//! layers together: settings → queue controller → queue actor → command
//! handler, menu and placeholders.

use std::sync::Arc;

use rtpqueue_protocol::ParticipantId;
use rtpqueue_queue::{Host, QueueConfig, QueueController, QueueHandle, spawn_queue};
use tokio::task::JoinHandle;

use crate::handler::CommandHandler;
use crate::menu::{Menu, MenuView};
use crate::{
    CommandOutcome, CommandSender, MenuConfig, Permissions, PlaceholderRegistry,
    QueuePlaceholders, RtpqueueError, Settings,
};

/// Default bound of the queue actor's command channel.
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Builder for configuring and starting rtpqueue.
///
/// # Example
///
/// ```rust,ignore
/// use rtpqueue::prelude::*;
///
/// let queue = RtpQueue::builder()
///     .settings(Settings::load("rtpqueue.toml")?)
///     .build(Arc::new(my_host));
/// queue.execute(CommandSender::Participant(id), &["spawn"]).await?;
/// ```
pub struct RtpQueueBuilder {
    settings: Settings,
    seed: Option<u64>,
    channel_size: usize,
    placeholders: Option<Box<dyn PlaceholderRegistry>>,
}

impl RtpQueueBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            seed: None,
            channel_size: DEFAULT_CHANNEL_SIZE,
            placeholders: None,
        }
    }

    /// Replaces all settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the queue section of the settings.
    pub fn queue_config(mut self, config: QueueConfig) -> Self {
        self.settings.queue = config;
        self
    }

    /// Replaces the menu section of the settings.
    pub fn menu(mut self, menu: MenuConfig) -> Self {
        self.settings.menu = menu;
        self
    }

    /// Makes relocation targets reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the bound of the actor's command channel.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    /// Registers the `rtpqueue` placeholders with the host's placeholder
    /// system when the queue starts.
    pub fn placeholder_registry(mut self, registry: impl PlaceholderRegistry) -> Self {
        self.placeholders = Some(Box::new(registry));
        self
    }

    /// Starts the queue actor. Must be called inside a Tokio runtime.
    pub fn build<H: Host + Permissions>(self, host: Arc<H>) -> RtpQueue<H> {
        let settings = self.settings.validated();

        let controller = match self.seed {
            Some(seed) => QueueController::with_seed(settings.queue.clone(), Arc::clone(&host), seed),
            None => QueueController::new(settings.queue.clone(), Arc::clone(&host)),
        };
        let (handle, task) = spawn_queue(controller, self.channel_size);

        let menu = Arc::new(Menu::from_config(&settings.menu));
        let commands = CommandHandler::new(
            handle.clone(),
            host,
            Arc::clone(&menu),
            Arc::new(settings.queue.messages.clone()),
        );
        let placeholders = QueuePlaceholders::new(handle.clone());

        match &self.placeholders {
            Some(registry) if registry.register(placeholders.clone()) => {
                tracing::info!(identifier = placeholders.identifier(), "placeholder hook registered");
            }
            Some(_) => tracing::warn!("placeholder registry refused the rtpqueue expansion"),
            None => tracing::warn!("no placeholder registry; placeholders will not work"),
        }

        tracing::info!(
            threshold = settings.queue.threshold(),
            countdown = settings.queue.teleport_delay,
            cooldown_secs = settings.queue.cooldown_secs,
            menu_items = menu.items().len(),
            "rtpqueue started"
        );

        RtpQueue {
            settings,
            handle,
            task,
            menu,
            commands,
            placeholders,
        }
    }
}

impl Default for RtpQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running queue with its command surface.
///
/// Call [`shutdown()`](Self::shutdown) to stop it; pending countdowns are
/// dropped.
pub struct RtpQueue<H> {
    settings: Settings,
    handle: QueueHandle,
    task: JoinHandle<()>,
    menu: Arc<Menu>,
    commands: CommandHandler<H>,
    placeholders: QueuePlaceholders,
}

impl RtpQueue<()> {
    /// Creates a new builder.
    pub fn builder() -> RtpQueueBuilder {
        RtpQueueBuilder::new()
    }
}

impl<H: Host + Permissions> RtpQueue<H> {
    /// The settings in effect, after validation.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A handle for talking to the queue actor directly.
    pub fn handle(&self) -> &QueueHandle {
        &self.handle
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn placeholders(&self) -> &QueuePlaceholders {
        &self.placeholders
    }

    /// A cloneable command handler, e.g. for per-connection tasks.
    pub fn commands(&self) -> CommandHandler<H> {
        self.commands.clone()
    }

    /// Handles `rtpqueue <args...>`.
    pub async fn execute<S: AsRef<str>>(
        &self,
        sender: CommandSender,
        args: &[S],
    ) -> Result<CommandOutcome, RtpqueueError> {
        self.commands.execute(sender, args).await
    }

    /// Handles a click in a menu view. See [`CommandHandler::click`].
    pub async fn click(
        &self,
        participant: ParticipantId,
        view_title: &str,
        clicked_name: &str,
    ) -> Result<Vec<CommandOutcome>, RtpqueueError> {
        self.commands.click(participant, view_title, clicked_name).await
    }

    /// The menu rendered for one participant.
    pub async fn open_menu(&self, participant: ParticipantId) -> MenuView {
        self.commands.render_menu(participant).await
    }

    /// Stops the queue actor and waits for it to finish.
    pub async fn shutdown(self) -> Result<(), RtpqueueError> {
        self.handle.shutdown().await?;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "queue actor ended abnormally");
        }
        tracing::info!("rtpqueue stopped");
        Ok(())
    }
}
