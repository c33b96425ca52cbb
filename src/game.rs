//! Source game identification.

use crate::container::Container;

/// Source game families the tool can port from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
    DarkSouls3,
    Bloodborne,
    Sekiro,
    EldenRing,
}

impl Game {
    /// Name used to scope rule-table documents.
    pub fn rule_scope(self) -> &'static str {
        match self {
            Game::DarkSouls3 => "DS3",
            Game::Bloodborne => "Bloodborne",
            Game::Sekiro => "Sekiro",
            Game::EldenRing => "EldenRing",
        }
    }

    /// Guesses the source game from container content markers: entry path
    /// roots and the presence of generation-specific companions.
    pub fn detect(container: &Container) -> Option<Game> {
        let names = || container.entries.iter().map(|e| e.name.as_str());
        if names().any(|n| n.contains("INTERROOT_win64")) {
            return Some(Game::DarkSouls3);
        }
        if names().any(|n| n.contains("SPRJ")) {
            return Some(Game::Bloodborne);
        }
        if names().any(|n| n.contains("NTC")) {
            return Some(Game::Sekiro);
        }
        if names().any(|n| n.contains("GR") || n.ends_with(".compendium")) {
            return Some(Game::EldenRing);
        }
        None
    }
}
