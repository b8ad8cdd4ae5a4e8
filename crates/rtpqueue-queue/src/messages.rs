//! Message templates sent to participants.
//!
//! Each template is a list of lines. Lines may contain `&`-style colour codes
//! (left for the host to render) and `{name}` placeholders filled in by
//! [`render`]. An empty template means "say nothing".

use serde::{Deserialize, Serialize};

/// All templates the queue core can send.
///
/// Keys follow the kebab-case names used in settings files, for example
/// `queue-joined` or `not-enough-players`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Messages {
    /// `{world}`
    pub invalid_world: Vec<String>,
    /// `{cooldown}`
    pub cooldown_active: Vec<String>,
    /// `{world}`
    pub already_in_queue: Vec<String>,
    /// `{world}`
    pub queue_joined: Vec<String>,
    /// `{player}`, `{world}`
    pub queue_joined_broadcast: Vec<String>,
    /// `{world}`, `{count}`, `{max}`
    pub not_enough_players: Vec<String>,
    /// `{world}`
    pub queue_teleport: Vec<String>,
    /// `{time}`
    pub teleport: Vec<String>,
    /// `{world}`
    pub teleported: Vec<String>,
    pub queue_leaved: Vec<String>,
    pub no_permission: Vec<String>,
}

impl Default for Messages {
    fn default() -> Self {
        fn line(s: &str) -> Vec<String> {
            vec![s.to_string()]
        }
        Self {
            invalid_world: line("&cThe world &b{world} &cdoes not exist."),
            cooldown_active: line("&cYou must wait &e{cooldown}s &cbefore queueing again."),
            already_in_queue: line("&cYou are already in a queue."),
            queue_joined: line("&aYou joined the queue for &b{world}&a."),
            queue_joined_broadcast: line("&b{player}&a's group is teleporting to &b{world}&a!"),
            not_enough_players: line("&eWaiting for players in &b{world}&e: &f{count}&7/&f{max}"),
            queue_teleport: line("&aMatch found! Teleporting to &b{world}&a..."),
            teleport: line("&eTeleporting in &c{time}&e..."),
            teleported: line("&aYou have been successfully teleported to &b{world}&a!"),
            queue_leaved: line("&cYou left the queue."),
            no_permission: line("&cYou do not have permission to use this."),
        }
    }
}

/// Fills `{name}` placeholders in every line and joins the lines with `\n`.
///
/// Returns `None` for an empty template so callers can skip sending.
/// Placeholders without a matching variable are left as-is.
pub fn render(lines: &[String], vars: &[(&str, &str)]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let rendered: Vec<String> = lines
        .iter()
        .map(|line| {
            vars.iter().fold(line.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        })
        .collect();
    Some(rendered.join("\n"))
}
