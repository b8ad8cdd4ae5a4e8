//! The destination menu: a grid of items, each carrying command actions.
//!
//! The menu is described in settings:
//!
//! ```toml
//! [menu]
//! title = "&b&lRTP Queue Menu"
//! size = 36
//!
//! [menu.items.overworld]
//! material = "GRASS_BLOCK"
//! slot = 11
//! display-name = "&aOverworld"
//! lore = ["&7Queued: &f%rtpqueue_count_world%"]
//! actions = ["rtpqueue world"]
//! ```
//!
//! Clicks are resolved by the item's colour-stripped, case-insensitive
//! display name, because that is all most hosts report back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Command;
use crate::text::same_label;

/// Rows hold nine slots; a menu has between one and six rows.
pub const ROW_WIDTH: usize = 9;
pub const MAX_SIZE: usize = 6 * ROW_WIDTH;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Menu settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MenuConfig {
    pub title: String,
    /// Slot count. Rounded up to whole rows by [`validated`](Self::validated).
    pub size: usize,
    /// Items keyed by an id used only for logging.
    pub items: BTreeMap<String, MenuItem>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            title: "&b&lRTP Queue Menu".to_string(),
            size: 36,
            items: BTreeMap::new(),
        }
    }
}

impl MenuConfig {
    /// Rounds `size` up to a whole number of rows, between one and six.
    pub fn validated(mut self) -> Self {
        let rows = self.size.div_ceil(ROW_WIDTH).clamp(1, MAX_SIZE / ROW_WIDTH);
        let size = rows * ROW_WIDTH;
        if size != self.size {
            warn!(configured = self.size, using = size, "menu size is not a whole number of rows");
            self.size = size;
        }
        self
    }
}

/// One clickable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MenuItem {
    pub material: String,
    pub slot: usize,
    pub display_name: String,
    #[serde(default)]
    pub lore: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// What clicking a menu item does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Run an `rtpqueue` command as the clicking participant.
    Run(Command),
    /// Anything that is not an `rtpqueue` command.
    Unknown(String),
}

impl MenuAction {
    pub fn parse(action: &str) -> Self {
        match Command::from_line(action) {
            Some(command) => Self::Run(command),
            None => Self::Unknown(action.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

/// A validated menu layout.
#[derive(Debug, Clone)]
pub struct Menu {
    title: String,
    size: usize,
    /// `(slot, item)` in slot order, one item per slot.
    items: Vec<(usize, MenuItem)>,
}

impl Menu {
    /// Lays out the configured items.
    ///
    /// Items whose slot is outside the menu are skipped with a warning. When
    /// two items claim one slot, the one whose id sorts last wins.
    pub fn from_config(config: &MenuConfig) -> Self {
        let config = config.clone().validated();
        let mut slots: BTreeMap<usize, MenuItem> = BTreeMap::new();
        for (id, item) in &config.items {
            if item.slot >= config.size {
                warn!(item = %id, slot = item.slot, size = config.size, "menu item slot out of range, skipping");
                continue;
            }
            if slots.insert(item.slot, item.clone()).is_some() {
                warn!(item = %id, slot = item.slot, "menu slot used twice");
            }
        }
        Self {
            title: config.title,
            size: config.size,
            items: slots.into_iter().collect(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn items(&self) -> &[(usize, MenuItem)] {
        &self.items
    }

    pub fn item_at(&self, slot: usize) -> Option<&MenuItem> {
        self.items
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, item)| item)
    }

    /// Finds the item a host reported as clicked, by display name.
    pub fn find_by_name(&self, clicked: &str) -> Option<&MenuItem> {
        self.items
            .iter()
            .map(|(_, item)| item)
            .find(|item| same_label(&item.display_name, clicked))
    }

    /// `true` if a host-reported view title is this menu.
    pub fn is_this_menu(&self, view_title: &str) -> bool {
        same_label(&self.title, view_title)
    }
}

/// A menu with placeholders filled in for one participant, ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    pub title: String,
    pub size: usize,
    pub items: Vec<MenuViewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuViewItem {
    pub slot: usize,
    pub material: String,
    pub display_name: String,
    pub lore: Vec<String>,
}
