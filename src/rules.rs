//! Data-driven conversion rule tables.
//!
//! Exclusion lists and remap dictionaries are TOML documents keyed by the
//! source game's name. Both support a compact range notation that expands a
//! single entry into `repeat` entries stepped by an increment, so runs of
//! ids (e.g. one per weapon category) do not have to be written out.
//!
//! Tables are immutable once loaded and shared read-only for the run.

use hashbrown::{HashMap, HashSet};
use serde::Deserialize;
use std::path::Path;

use crate::error::PortError;

#[derive(Deserialize)]
struct ListDoc {
    #[serde(default, rename = "list")]
    lists: Vec<ListSection>,
}

#[derive(Deserialize)]
struct ListSection {
    game: String,
    #[serde(default)]
    items: Vec<i64>,
    #[serde(default)]
    ranges: Vec<ListRange>,
}

#[derive(Deserialize)]
struct ListRange {
    id: i64,
    repeat: i64,
    increment: i64,
}

#[derive(Deserialize)]
struct MapDoc {
    #[serde(default, rename = "map")]
    maps: Vec<MapSection>,
}

#[derive(Deserialize)]
struct MapSection {
    game: String,
    #[serde(default)]
    entries: Vec<MapEntry>,
    #[serde(default)]
    ranges: Vec<MapRange>,
}

#[derive(Deserialize)]
struct MapEntry {
    key: i64,
    value: i64,
}

#[derive(Deserialize)]
struct MapRange {
    key: i64,
    value: i64,
    repeat: i64,
    key_increment: i64,
    value_increment: i64,
}

fn parse_error(path: &str, err: impl std::fmt::Display) -> PortError {
    PortError::MalformedRules {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

/// Parses an id list document, keeping only the sections scoped to `game`.
/// A game with no sections yields an empty set: absence of rules is valid
/// and means "exclude nothing".
pub fn load_list(text: &str, game: &str, origin: &str) -> Result<HashSet<i64>, PortError> {
    let doc: ListDoc = toml::from_str(text).map_err(|e| parse_error(origin, e))?;
    let mut set = HashSet::new();
    for section in doc.lists.iter().filter(|s| s.game == game) {
        set.extend(section.items.iter().copied());
        for range in &section.ranges {
            for step in 0..range.repeat {
                set.insert(range.id + step * range.increment);
            }
        }
    }
    Ok(set)
}

/// Parses a key/value remap document scoped to `game`. Collisions between
/// explicit entries and expanded ranges resolve last-write-wins in document
/// order.
pub fn load_map(text: &str, game: &str, origin: &str) -> Result<HashMap<i64, i64>, PortError> {
    let doc: MapDoc = toml::from_str(text).map_err(|e| parse_error(origin, e))?;
    let mut map = HashMap::new();
    for section in doc.maps.iter().filter(|s| s.game == game) {
        for entry in &section.entries {
            map.insert(entry.key, entry.value);
        }
        for range in &section.ranges {
            for step in 0..range.repeat {
                map.insert(
                    range.key + step * range.key_increment,
                    range.value + step * range.value_increment,
                );
            }
        }
    }
    Ok(map)
}

/// The full rule bundle one conversion run reads from.
///
/// Loaded once per run from the resource directory; every field is scoped
/// to the source game already.
#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    /// Animation ids dropped outright.
    pub excluded_animations: HashSet<i64>,
    /// Event type tags dropped from every animation.
    pub excluded_events: HashSet<i64>,
    /// Jump-table ids whose type-0 events are dropped.
    pub excluded_jump_tables: HashSet<i64>,
    /// Rumble-cam ids whose camera-shake events are dropped.
    pub excluded_rumble_cams: HashSet<i64>,
    /// Sp-effect ids that override an excluded-events rule per id.
    pub allowed_sp_effects: HashSet<i64>,
    /// Base animation id replacements.
    pub anim_remapping: HashMap<i64, i64>,
    /// Sp-effect id replacements spliced into event parameter blocks.
    pub sp_effect_remapping: HashMap<i64, i64>,
}

impl RuleSet {
    /// Loads the fixed document set from `res_dir` for one game.
    pub fn load(res_dir: &Path, game: &str) -> Result<Self, PortError> {
        let list = |file: &str| -> Result<HashSet<i64>, PortError> {
            load_list(&read(res_dir, file)?, game, file)
        };
        let map = |file: &str| -> Result<HashMap<i64, i64>, PortError> {
            load_map(&read(res_dir, file)?, game, file)
        };
        Ok(Self {
            excluded_animations: list("excluded_animations.toml")?,
            excluded_events: list("excluded_events.toml")?,
            excluded_jump_tables: list("excluded_jumptables.toml")?,
            excluded_rumble_cams: list("excluded_rumblecams.toml")?,
            allowed_sp_effects: list("allowed_speffects.toml")?,
            anim_remapping: map("anim_remapping.toml")?,
            sp_effect_remapping: map("speffect_remapping.toml")?,
        })
    }
}

fn read(dir: &Path, file: &str) -> Result<String, PortError> {
    std::fs::read_to_string(dir.join(file)).map_err(|e| parse_error(file, e))
}
