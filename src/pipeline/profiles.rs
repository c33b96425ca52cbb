//! Per-source-game conversion profiles.
//!
//! One strategy value per source game replaces per-game subclassing: the
//! orchestrator in [`super`] is generic and everything game-specific lives
//! in the profile it is handed.

use crate::event::{tables, EditTable};
use crate::game::Game;
use crate::options::AssetKind;

/// Container kinds the pipeline knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Character animation binder.
    Anibnd,
    /// Character model/physics binder.
    Chrbnd,
    /// Object binder holding geometry, physics and a nested anibnd.
    Objbnd,
    /// Elden Ring object geometry binder (nested anibnd, meshes).
    Geombnd,
    /// Elden Ring object physics binder.
    GeomHkxbnd,
}

/// Everything that differs between source games, bundled as one value.
pub struct Profile {
    pub game: Game,
    /// Section name the rule documents scope by.
    pub rule_scope: &'static str,
    /// Event rewrite table for this game and asset kind.
    pub edit_table: EditTable,
    /// Clips cannot be decoded without a type compendium; its absence is
    /// fatal for the container rather than a per-entry skip.
    pub requires_compendium: bool,
    /// Animation and geometry fragments accumulate across source files and
    /// emit combined containers on the last fragment.
    pub combines_fragments: bool,
    /// Clip entries need the external downgrade chain at all.
    pub needs_downgrade: bool,
}

impl Profile {
    pub fn new(game: Game, kind: AssetKind) -> Self {
        let edit_table = match game {
            Game::DarkSouls3 => tables::dark_souls3(),
            Game::Bloodborne => tables::bloodborne(),
            Game::Sekiro => tables::sekiro(kind),
            Game::EldenRing => tables::elden_ring(),
        };
        Self {
            game,
            rule_scope: game.rule_scope(),
            edit_table,
            requires_compendium: matches!(game, Game::Sekiro),
            combines_fragments: matches!(game, Game::EldenRing),
            needs_downgrade: !matches!(game, Game::DarkSouls3),
        }
    }

    /// Classifies a source file by name; `None` for files this profile
    /// does not accept.
    pub fn classify(&self, file_name: &str) -> Option<ContainerKind> {
        if file_name.contains(".anibnd") {
            return Some(ContainerKind::Anibnd);
        }
        if file_name.contains(".chrbnd") {
            return Some(ContainerKind::Chrbnd);
        }
        if self.combines_fragments {
            if file_name.contains(".geomhkxbnd") {
                return Some(ContainerKind::GeomHkxbnd);
            }
            if file_name.contains(".geombnd") {
                return Some(ContainerKind::Geombnd);
            }
        } else if file_name.contains(".objbnd") {
            return Some(ContainerKind::Objbnd);
        }
        None
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("game", &self.game)
            .field("rule_scope", &self.rule_scope)
            .finish_non_exhaustive()
    }
}
