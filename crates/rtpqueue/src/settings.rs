//! Settings files.
//!
//! One TOML document holds the queue keys at the top level plus `[menu]`,
//! `[messages]` and `[titles]` tables. Every key is optional.
//!
//! ```toml
//! teleport-delay = 5
//! cooldown = 30
//! max-players-per-queue = 2
//!
//! [messages]
//! queue-joined = ["&aYou joined the queue for &b{world}&a."]
//!
//! [menu]
//! title = "&b&lRTP Queue Menu"
//! size = 36
//! ```

use std::fs;
use std::path::Path;

use rtpqueue_queue::QueueConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{MenuConfig, SettingsError};

/// Everything loaded from a settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub queue: QueueConfig,
    pub menu: MenuConfig,
}

impl Settings {
    /// Reads and validates a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        Ok(settings.validated())
    }

    /// Clamps out-of-range values in every section.
    pub fn validated(self) -> Self {
        Self {
            queue: self.queue.validated(),
            menu: self.menu.validated(),
        }
    }
}
