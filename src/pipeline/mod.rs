//! Conversion pipeline orchestration.
//!
//! One [`Pipeline`] instance owns one run: it classifies each source
//! container, dispatches the per-kind conversion, and tracks the combined
//! containers games with fragmented sources accumulate into. Emission is
//! deferred for those until the last fragment, by position in the
//! caller-supplied source list.

pub mod profiles;

pub use profiles::{ContainerKind, Profile};

use anyhow::{Context, Result};
use hashbrown::HashSet;
use tracing::{info, warn};

use crate::anim_id;
use crate::catalog::MaterialCatalog;
use crate::container::{AssetCodec, BinaryEntry, Container};
use crate::error::PortError;
use crate::game::Game;
use crate::havok::HavokDowngrader;
use crate::options::Options;
use crate::rules::RuleSet;
use crate::tae::{self, TaeContext};
use crate::flver::{self, material::TextureMode};

/// One output file produced by a conversion step.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Skeleton entries always sit at this id in the target animation binder.
const SKELETON_ENTRY_ID: i32 = 1_000_000;
/// Entry id of the event table inside an animation binder.
const TAE_ENTRY_ID: i32 = 3_000_000;
/// Entry id of the nested animation binder inside an object binder.
const INNER_ANIBND_ENTRY_ID: i32 = 400;

/// Clip entries re-home in the target id block: 100_000_000 plus the clip's
/// base id, whatever block the source generation used.
fn clip_entry_id(id: i32) -> i32 {
    100_000_000 + id.rem_euclid(1_000_000)
}

/// Normalizes a clip file name to the single-digit-layer form the target
/// expects: `a{3-digit prefix}_{base}.hkx` becomes `a00{layer}_{base}.hkx`.
/// Names that do not follow the clip pattern pass through unchanged.
fn normalize_clip_name(name: &str) -> String {
    let is_clip = name.len() == 15
        && name.starts_with('a')
        && name.as_bytes()[4] == b'_'
        && name.ends_with(".hkx")
        && name[1..4].bytes().all(|b| b.is_ascii_digit())
        && name[5..11].bytes().all(|b| b.is_ascii_digit());
    if !is_clip {
        return name.to_string();
    }
    let digits = format!("{}{}", &name[1..4], &name[5..11]);
    let id: u64 = digits.parse().unwrap_or(0);
    format!("a00{}_{}.hkx", anim_id::layer_offset(id), &name[5..11])
}

pub struct Pipeline<'a> {
    codec: &'a dyn AssetCodec,
    downgrader: &'a dyn HavokDowngrader,
    profile: Profile,
    rules: RuleSet,
    catalog: MaterialCatalog,
    options: Options,
    combined_anibnd: Container,
    combined_objbnd: Container,
}

impl<'a> Pipeline<'a> {
    /// Builds a pipeline, loading the rule tables and material catalog for
    /// the profile's game from the resource directory.
    pub fn new(
        codec: &'a dyn AssetCodec,
        downgrader: &'a dyn HavokDowngrader,
        profile: Profile,
        options: Options,
    ) -> Result<Self> {
        let rules = RuleSet::load(&options.res_dir, profile.rule_scope)
            .context("loading rule tables")?;
        let catalog = MaterialCatalog::load(&options.res_dir)?;
        Ok(Self::with_tables(
            codec, downgrader, profile, options, rules, catalog,
        ))
    }

    /// Seam for callers that already hold the tables (tests, embedding).
    pub fn with_tables(
        codec: &'a dyn AssetCodec,
        downgrader: &'a dyn HavokDowngrader,
        profile: Profile,
        options: Options,
        rules: RuleSet,
        catalog: MaterialCatalog,
    ) -> Self {
        Self {
            codec,
            downgrader,
            profile,
            rules,
            catalog,
            options,
            combined_anibnd: Container::default(),
            combined_objbnd: Container::default(),
        }
    }

    /// Converts one source container. Returns zero or more output files;
    /// fragment-combining profiles return nothing until the last fragment.
    pub fn convert_source(&mut self, file_name: &str, bytes: &[u8]) -> Result<Vec<Emitted>> {
        let container = self
            .codec
            .read_container(bytes)
            .with_context(|| format!("reading container {file_name}"))?;
        let Some(kind) = self.profile.classify(file_name) else {
            warn!(file = file_name, "unrecognized container kind, skipping");
            return Ok(Vec::new());
        };
        info!(
            file = file_name,
            ?kind,
            game = self.profile.rule_scope,
            "converting container"
        );
        match kind {
            ContainerKind::Anibnd => self.convert_anibnd(file_name, &container),
            ContainerKind::Chrbnd => self.convert_chrbnd(&container),
            ContainerKind::Objbnd => self.convert_objbnd(&container),
            ContainerKind::Geombnd => self.convert_geombnd(file_name, &container),
            ContainerKind::GeomHkxbnd => self.convert_geomhkxbnd(file_name, &container),
        }
    }

    fn chr_path(&self) -> String {
        format!(
            "N:\\FDP\\data\\INTERROOT_win64\\chr\\c{}\\",
            self.options.ported_id
        )
    }

    fn obj_path(&self) -> String {
        let ported = &self.options.ported_id;
        let prefix = ported.get(..2).unwrap_or(ported);
        format!("N:\\FDP\\data\\INTERROOT_win64\\obj\\o{prefix}\\o{ported}\\")
    }

    fn convert_anibnd(&mut self, file_name: &str, source: &Container) -> Result<Vec<Emitted>> {
        let mut out = Container::default();
        if !self.options.tae_only {
            out = self.convert_character_hkx(source, true)?;
        }

        if self.profile.combines_fragments {
            self.combined_anibnd.entries.append(&mut out.entries);
            if let Some(tae) = source.find(".tae") {
                self.combined_anibnd.entries.push(tae.clone());
            }
            if self
                .options
                .is_last_of(file_name, |n| n.contains(".anibnd"))
            {
                return self.finish_combined_anibnd();
            }
            return Ok(Vec::new());
        }

        self.finish_anibnd(out, source)
    }

    /// Attaches the converted event table and emits the animation binder.
    /// `clip_source` supplies the entry names the import-exclusion check
    /// probes against.
    fn finish_anibnd(&self, mut out: Container, clip_source: &Container) -> Result<Vec<Emitted>> {
        if let Some(tae_entry) = clip_source.find(".tae") {
            let entry = self.character_tae_entry(clip_source, tae_entry)?;
            if self.options.tae_only {
                return Ok(vec![Emitted {
                    file_name: format!("c{}.tae", self.options.ported_id),
                    bytes: entry.bytes,
                }]);
            }
            out.entries.push(entry);
        } else if self.options.tae_only {
            return Ok(Vec::new());
        }

        out.sort_by_id();
        Ok(vec![Emitted {
            file_name: format!("c{}.anibnd.dcx", self.options.ported_id),
            bytes: self.codec.write_container(&out)?,
        }])
    }

    fn finish_combined_anibnd(&mut self) -> Result<Vec<Emitted>> {
        let combined = std::mem::take(&mut self.combined_anibnd);
        let out = Container {
            entries: combined
                .entries
                .iter()
                .filter(|e| e.name.to_lowercase().ends_with(".hkx"))
                .cloned()
                .collect(),
        };
        self.finish_anibnd(out, &combined)
    }

    fn convert_chrbnd(&self, source: &Container) -> Result<Vec<Emitted>> {
        let ported = self.options.ported_id.clone();
        let source_id = self.options.source_id.clone();
        let mut out = Container::default();

        if !self.options.flver_only {
            out = self.convert_character_hkx(source, false)?;
            // Physics companions only make sense next to their HKX.
            if out.contains_name(&format!("c{ported}.hkx")) {
                out.transfer_from(
                    source,
                    &format!("c{source_id}.hkxpwv"),
                    &format!("{}c{ported}.hkxpwv", self.chr_path()),
                );
            }
            if out.contains_name(&format!("c{ported}_c.hkx")) {
                out.transfer_from(
                    source,
                    &format!("c{source_id}_c.clm2"),
                    &format!("{}c{ported}_c.clm2", self.chr_path()),
                );
            }
        }

        if let Some(flver_source) = source.entries.iter().find(|e| e.name.contains(".flver")) {
            let entry = self.flver_entry(flver_source, false)?;
            if self.options.flver_only {
                return Ok(vec![Emitted {
                    file_name: entry.file_name().to_string(),
                    bytes: entry.bytes,
                }]);
            }
            out.entries.push(entry);
        } else if self.options.flver_only {
            return Ok(Vec::new());
        }

        out.sort_by_id();
        Ok(vec![Emitted {
            file_name: format!("c{ported}.chrbnd.dcx"),
            bytes: self.codec.write_container(&out)?,
        }])
    }

    fn convert_objbnd(&self, source: &Container) -> Result<Vec<Emitted>> {
        let ported = self.options.ported_id.clone();
        let mut out = Container::default();

        if !self.options.tae_only && !self.options.flver_only {
            let mut hkx = self.convert_object_hkx(source, false)?;
            if hkx.contains_name(&format!("o{ported}_c.hkx")) {
                hkx.transfer_from(
                    source,
                    &format!("o{}_c.clm2", self.options.source_id),
                    &format!("{}o{ported}_c.clm2", self.obj_path()),
                );
            }
            out.entries.append(&mut hkx.entries);
        }

        if let Some(anibnd_entry) = source.entries.iter().find(|e| e.name.ends_with(".anibnd")) {
            if !self.options.flver_only {
                match self.convert_inner_anibnd(anibnd_entry)? {
                    InnerAnibnd::Standalone(emitted) => return Ok(vec![emitted]),
                    InnerAnibnd::Entry(entry) => out.entries.push(entry),
                    InnerAnibnd::Nothing => {}
                }
            }
        }
        if self.options.tae_only {
            return Ok(Vec::new());
        }

        let flvers = self.convert_object_flvers(source)?;
        if self.options.flver_only {
            return Ok(flvers
                .into_iter()
                .map(|e| Emitted {
                    file_name: e.file_name().to_string(),
                    bytes: e.bytes,
                })
                .collect());
        }
        out.entries.extend(flvers);

        out.sort_by_id();
        Ok(vec![Emitted {
            file_name: format!("o{ported}.objbnd.dcx"),
            bytes: self.codec.write_container(&out)?,
        }])
    }

    fn convert_geombnd(&mut self, file_name: &str, source: &Container) -> Result<Vec<Emitted>> {
        if let Some(anibnd_entry) = source.entries.iter().find(|e| e.name.ends_with(".anibnd")) {
            if !self.options.flver_only {
                match self.convert_inner_anibnd(anibnd_entry)? {
                    InnerAnibnd::Standalone(emitted) => return Ok(vec![emitted]),
                    InnerAnibnd::Entry(entry) => self.combined_objbnd.entries.push(entry),
                    InnerAnibnd::Nothing => {}
                }
            }
        }
        if self.options.tae_only {
            return Ok(Vec::new());
        }

        let flvers = self.convert_object_flvers(source)?;
        if self.options.flver_only {
            return Ok(flvers
                .into_iter()
                .map(|e| Emitted {
                    file_name: e.file_name().to_string(),
                    bytes: e.bytes,
                })
                .collect());
        }
        self.combined_objbnd.entries.extend(flvers);
        self.finish_combined_objbnd(file_name)
    }

    fn convert_geomhkxbnd(&mut self, file_name: &str, source: &Container) -> Result<Vec<Emitted>> {
        if self.options.tae_only || self.options.flver_only {
            return Ok(Vec::new());
        }
        let ported = self.options.ported_id.clone();
        let mut hkx = self.convert_object_hkx(source, false)?;
        if hkx.contains_name(&format!("o{ported}_c.hkx")) {
            hkx.transfer_from(
                source,
                &format!("o{}_c.clm2", self.options.source_id),
                &format!("{}o{ported}_c.clm2", self.obj_path()),
            );
        }
        self.combined_objbnd.entries.append(&mut hkx.entries);
        self.finish_combined_objbnd(file_name)
    }

    fn finish_combined_objbnd(&mut self, current: &str) -> Result<Vec<Emitted>> {
        let is_geometry = |n: &str| n.contains(".geombnd") || n.contains(".geomhkxbnd");
        if !self.options.is_last_of(current, is_geometry) {
            return Ok(Vec::new());
        }
        let mut combined = std::mem::take(&mut self.combined_objbnd);
        combined.sort_by_id();
        Ok(vec![Emitted {
            file_name: format!("o{}.objbnd.dcx", self.options.ported_id),
            bytes: self.codec.write_container(&combined)?,
        }])
    }

    /// Downgrades and renames the HKX entries of a character binder.
    /// Per-entry tool failures skip the entry; a missing compendium where
    /// the profile requires one fails the whole container.
    fn convert_character_hkx(&self, source: &Container, in_anibnd: bool) -> Result<Container> {
        let compendium = source
            .entries
            .iter()
            .find(|e| e.name.to_lowercase().ends_with(".compendium"));
        if in_anibnd && self.profile.requires_compendium && compendium.is_none() {
            return Err(
                PortError::MissingResource("source anibnd contains no compendium".into()).into(),
            );
        }

        let source_id = &self.options.source_id;
        let ported = &self.options.ported_id;
        let path = self.chr_path();
        let mut out = Container::default();

        for entry in source
            .entries
            .iter()
            .filter(|e| e.name.to_lowercase().ends_with(".hkx"))
        {
            let Some(bytes) = self.downgraded_bytes(entry, compendium) else {
                continue;
            };
            let name = entry.file_name().to_lowercase();
            let (new_name, new_id) = if name.ends_with(&format!("c{source_id}.hkx"))
                || name.ends_with(&format!("c{source_id}_c.hkx"))
            {
                (
                    format!("{path}{}", name.replace(source_id.as_str(), ported)),
                    entry.id,
                )
            } else if name.contains("skeleton") {
                (format!("{path}hkx\\{name}"), SKELETON_ENTRY_ID)
            } else {
                (
                    format!("{path}hkx\\{}", normalize_clip_name(&name)),
                    clip_entry_id(entry.id),
                )
            };
            out.entries.push(BinaryEntry::new(new_id, &new_name, bytes));
        }
        Ok(out)
    }

    /// Object-binder variant: outer entries are the collision/cloth pair,
    /// inner-anibnd entries are skeleton and clips.
    fn convert_object_hkx(&self, source: &Container, in_anibnd: bool) -> Result<Container> {
        let compendium = source
            .entries
            .iter()
            .find(|e| e.name.to_lowercase().ends_with(".compendium"));
        if in_anibnd && self.profile.requires_compendium && compendium.is_none() {
            warn!("object anibnd has no compendium, skipping its clips");
            return Ok(Container::default());
        }

        let ported = &self.options.ported_id;
        let path = self.obj_path();
        let mut out = Container::default();

        for entry in source
            .entries
            .iter()
            .filter(|e| e.name.to_lowercase().ends_with(".hkx"))
        {
            let Some(bytes) = self.downgraded_bytes(entry, compendium) else {
                continue;
            };
            let name = entry.file_name().to_lowercase();
            let (new_name, new_id) = if in_anibnd {
                if name.contains("skeleton") {
                    (format!("{path}hkx\\{name}"), SKELETON_ENTRY_ID)
                } else {
                    (
                        format!("{path}hkx\\{}", normalize_clip_name(&name)),
                        clip_entry_id(entry.id),
                    )
                }
            } else if name.contains("_c") {
                (format!("{path}o{ported}_c.hkx"), entry.id)
            } else if name.contains("_1") {
                (format!("{path}o{ported}_1.hkx"), entry.id)
            } else {
                (format!("{path}o{ported}.hkx"), entry.id)
            };
            out.entries.push(BinaryEntry::new(new_id, &new_name, bytes));
        }
        Ok(out)
    }

    fn downgraded_bytes(
        &self,
        entry: &BinaryEntry,
        compendium: Option<&BinaryEntry>,
    ) -> Option<Vec<u8>> {
        if !self.profile.needs_downgrade {
            return Some(entry.bytes.clone());
        }
        match self.downgrader.downgrade(entry, compendium) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(entry = entry.file_name(), %err, "downgrade failed, skipping entry");
                None
            }
        }
    }

    fn character_tae_entry(
        &self,
        clip_source: &Container,
        tae_entry: &BinaryEntry,
    ) -> Result<BinaryEntry> {
        let source = self.codec.read_tae(&tae_entry.bytes)?;
        let ctx = self.tae_context(clip_source);
        let converted = tae::convert_character_tae(&source, &ctx)?;
        Ok(BinaryEntry::new(
            TAE_ENTRY_ID,
            &format!("{}tae\\c{}.tae", self.chr_path(), self.options.ported_id),
            self.codec.write_tae(&converted)?,
        ))
    }

    fn object_tae_entry(&self, tae_entry: &BinaryEntry) -> Result<BinaryEntry> {
        let source = self.codec.read_tae(&tae_entry.bytes)?;
        let ctx = self.tae_context(&Container::default());
        let converted = tae::convert_object_tae(&source, &ctx)?;
        Ok(BinaryEntry::new(
            TAE_ENTRY_ID,
            &format!("{}tae\\o{}.tae", self.obj_path(), self.options.ported_id),
            self.codec.write_tae(&converted)?,
        ))
    }

    fn tae_context<'c>(&'c self, clip_source: &Container) -> TaeContext<'c> {
        TaeContext {
            rules: &self.rules,
            edit_table: &self.profile.edit_table,
            options: &self.options,
            source_clip_names: clip_source
                .entries
                .iter()
                .map(|e| e.file_name().to_string())
                .collect::<HashSet<_>>(),
        }
    }

    /// Converts the nested animation binder of an object binder.
    fn convert_inner_anibnd(&self, anibnd_entry: &BinaryEntry) -> Result<InnerAnibnd> {
        let inner = self.codec.read_container(&anibnd_entry.bytes)?;
        let mut converted = Container::default();
        if !self.options.tae_only {
            converted = self.convert_object_hkx(&inner, true)?;
        }

        if let Some(tae_entry) = inner.find(".tae") {
            let entry = self.object_tae_entry(tae_entry)?;
            if self.options.tae_only {
                return Ok(InnerAnibnd::Standalone(Emitted {
                    file_name: format!("o{}.tae", self.options.ported_id),
                    bytes: entry.bytes,
                }));
            }
            converted.entries.push(entry);
        }
        if self.options.tae_only || converted.entries.is_empty() {
            return Ok(InnerAnibnd::Nothing);
        }

        converted.sort_by_id();
        Ok(InnerAnibnd::Entry(BinaryEntry::new(
            INNER_ANIBND_ENTRY_ID,
            &format!("{}o{}.anibnd", self.obj_path(), self.options.ported_id),
            self.codec.write_container(&converted)?,
        )))
    }

    /// Geometry entries of an object binder, skipping `_S` shadow lods.
    fn convert_object_flvers(&self, source: &Container) -> Result<Vec<BinaryEntry>> {
        source
            .entries
            .iter()
            .filter(|e| {
                self.codec.is_flver(&e.bytes)
                    && !e.name.to_lowercase().ends_with("_s.flver")
            })
            .map(|e| self.flver_entry(e, true))
            .collect()
    }

    fn flver_entry(&self, source_entry: &BinaryEntry, object: bool) -> Result<BinaryEntry> {
        let source = self.codec.read_flver(&source_entry.bytes)?;
        let ported = self.options.ported_id.clone();

        let converted = if self.profile.game == Game::DarkSouls3 {
            // Same-generation repack: materials and layouts are already in
            // target shape; only texture paths move, and only when the
            // matching texture binder is part of the run.
            let mut out = source;
            let has_texbnd = self
                .options
                .source_file_names
                .iter()
                .any(|n| n.contains(".texbnd"));
            if has_texbnd {
                let from = format!("c{}", self.options.source_id);
                let to = format!("c{ported}");
                for mat in &mut out.materials {
                    for tex in &mut mat.textures {
                        tex.path = tex.path.replace(&from, &to);
                    }
                }
            }
            out
        } else {
            flver::convert_flver(&source, &self.catalog, TextureMode::Dummy, object)?
        };
        let bytes = self.codec.write_flver(&converted)?;

        let lower = source_entry.name.to_lowercase();
        Ok(if object {
            if lower.ends_with("_1.flver") {
                BinaryEntry::new(201, &format!("{}o{ported}_1.flver", self.obj_path()), bytes)
            } else {
                BinaryEntry::new(200, &format!("{}o{ported}.flver", self.obj_path()), bytes)
            }
        } else {
            BinaryEntry::new(200, &format!("{}c{ported}.flver", self.chr_path()), bytes)
        })
    }
}

enum InnerAnibnd {
    /// `tae_only` runs emit the converted table directly.
    Standalone(Emitted),
    Entry(BinaryEntry),
    Nothing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_ids_re_home_in_the_target_block() {
        assert_eq!(clip_entry_id(3_000_123), 100_000_123);
        assert_eq!(clip_entry_id(400_003_000), 100_003_000);
        assert_eq!(clip_entry_id(3000), 100_003_000);
    }

    #[test]
    fn clip_names_normalize_to_single_digit_layers() {
        assert_eq!(normalize_clip_name("a300_003000.hkx"), "a003_003000.hkx");
        assert_eq!(normalize_clip_name("a003_003000.hkx"), "a003_003000.hkx");
        assert_eq!(normalize_clip_name("a000_003000.hkx"), "a000_003000.hkx");
        assert_eq!(normalize_clip_name("skeleton.hkx"), "skeleton.hkx");
        assert_eq!(normalize_clip_name("c5020_c.hkx"), "c5020_c.hkx");
    }
}
