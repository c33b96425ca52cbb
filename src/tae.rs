//! Animation track (TAE) conversion.
//!
//! One table per source container, converted in a single pass: collect the
//! exclusion union, drop excluded animations, re-encode surviving ids,
//! filter and transcode each animation's events, optionally compact layer
//! offsets, and sort. The sort is a hard target-format contract; the table
//! reader rejects out-of-order ids.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anim_id::{self, HKX_UNIT, TAE_UNIT};
use crate::error::PortError;
use crate::event::{edit_event, EditContext, EditTable, Event};
use crate::options::Options;
use crate::rules::RuleSet;

/// Flags every emitted table carries in the target generation.
pub const TARGET_FLAGS: [u8; 8] = [1, 0, 1, 2, 2, 1, 1, 1];

pub const CHARACTER_EVENT_BANK: i64 = 21;
pub const OBJECT_EVENT_BANK: i64 = 18;

/// Per-animation header variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MiniHeader {
    Standard {
        imports_hkx: bool,
        /// Clip reference, encoded at the 100_000_000 unit.
        import_hkx_source_anim_id: u64,
    },
    ImportOtherAnim {
        import_from_anim_id: u64,
    },
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub id: u64,
    /// Derived from the id; refreshed whenever the id changes.
    pub file_name: String,
    pub mini_header: MiniHeader,
    pub events: Vec<Event>,
}

impl Animation {
    pub fn new(id: u64, mini_header: MiniHeader) -> Self {
        Self {
            id,
            file_name: anim_id::file_name(id),
            mini_header,
            events: Vec::new(),
        }
    }
}

/// One animation event table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tae {
    pub big_endian: bool,
    pub id: i64,
    pub flags: [u8; 8],
    pub skeleton_name: String,
    pub sib_name: String,
    pub event_bank: i64,
    pub animations: Vec<Animation>,
}

impl Tae {
    /// Empty target-format table for the ported asset.
    pub fn target(options: &Options, event_bank: i64) -> Result<Self, PortError> {
        Ok(Self {
            big_endian: false,
            id: 200_000 + ported_number(options)?,
            flags: TARGET_FLAGS,
            skeleton_name: "skeleton.hkt".to_string(),
            sib_name: format!("c{}.sib", options.ported_id),
            event_bank,
            animations: Vec::new(),
        })
    }
}

fn ported_number(options: &Options) -> Result<i64, PortError> {
    options.ported_id.parse().map_err(|_| {
        PortError::InvalidOptions(format!("ported id '{}' is not numeric", options.ported_id))
    })
}

/// Read-only inputs of one table conversion.
pub struct TaeContext<'a> {
    pub rules: &'a RuleSet,
    pub edit_table: &'a EditTable,
    pub options: &'a Options,
    /// File names present in the source container, used to verify that
    /// declared clip imports can actually be satisfied.
    pub source_clip_names: HashSet<String>,
}

/// Converts a character event table.
pub fn convert_character_tae(source: &Tae, ctx: &TaeContext) -> Result<Tae, PortError> {
    let mut out = Tae::target(ctx.options, CHARACTER_EVENT_BANK)?;

    let excluded = collect_exclusions(source, ctx);
    debug!(
        total = source.animations.len(),
        excluded = excluded.len(),
        "filtering animation table"
    );
    out.animations = source
        .animations
        .iter()
        .filter(|a| !excluded.contains(&a.id))
        .cloned()
        .collect();

    for anim in &mut out.animations {
        remap_import_reference(anim, ctx.rules)?;
        set_animation_properties(anim, ctx.rules)?;
        filter_and_transcode_events(anim, source.big_endian, ctx)?;
    }

    if !ctx.options.excluded_offsets.is_empty() {
        shift_animation_offsets(&mut out.animations, &ctx.options.excluded_offsets)?;
    }

    out.animations.sort_by_key(|a| a.id);
    Ok(out)
}

/// Converts an object event table. Objects have no exclusion rules or id
/// remapping; their animations are re-encoded in place and their events go
/// through the same filter and transcode steps.
pub fn convert_object_tae(source: &Tae, ctx: &TaeContext) -> Result<Tae, PortError> {
    let mut out = Tae::target(ctx.options, OBJECT_EVENT_BANK)?;
    out.animations = source.animations.clone();

    for anim in &mut out.animations {
        reencode_in_place(anim)?;
        filter_and_transcode_events(anim, source.big_endian, ctx)?;
    }

    out.animations.sort_by_key(|a| a.id);
    Ok(out)
}

/// The exclusion union of §step 1, computed once over the unfiltered set.
/// Import-based exclusions are deliberately single-pass: a chain A imports
/// B imports C with C excluded drops B but can leave A behind. The source
/// data does not nest imports deeper than one hop.
fn collect_exclusions(source: &Tae, ctx: &TaeContext) -> HashSet<u64> {
    let rules = ctx.rules;
    let mut excluded: HashSet<u64> = HashSet::new();

    for anim in &source.animations {
        // Listed outright, or a layered variant of a listed base.
        if rules.excluded_animations.contains(&(anim.id as i64))
            || (anim_id::layer_offset(anim.id) > 0
                && rules
                    .excluded_animations
                    .contains(&(anim_id::base_id(anim.id) as i64)))
        {
            excluded.insert(anim.id);
            continue;
        }
        // Declared clip import with no matching clip in the container.
        if let MiniHeader::Standard {
            imports_hkx: true,
            import_hkx_source_anim_id,
        } = anim.mini_header
        {
            let expected = anim_id::import_hkx_name(import_hkx_source_anim_id);
            if !ctx.source_clip_names.contains(&expected) {
                debug!(anim = anim.id, clip = %expected, "import clip missing, excluding");
                excluded.insert(anim.id);
            }
        }
    }

    // One hop of reference exclusion over the set built so far.
    let referencing: Vec<u64> = source
        .animations
        .iter()
        .filter_map(|a| match a.mini_header {
            MiniHeader::ImportOtherAnim { import_from_anim_id }
                if excluded.contains(&import_from_anim_id)
                    || rules
                        .excluded_animations
                        .contains(&(import_from_anim_id as i64)) =>
            {
                Some(a.id)
            }
            _ => None,
        })
        .collect();
    excluded.extend(referencing);

    // Whole layers dropped by the caller.
    for anim in &source.animations {
        if ctx
            .options
            .excluded_offsets
            .contains(&anim_id::layer_offset(anim.id))
        {
            excluded.insert(anim.id);
        }
    }

    excluded
}

/// Remaps the referenced id of an ImportOtherAnim header through the anim
/// remap table, before the owning animation's own id is touched.
fn remap_import_reference(anim: &mut Animation, rules: &RuleSet) -> Result<(), PortError> {
    if let MiniHeader::ImportOtherAnim { import_from_anim_id } = &mut anim.mini_header {
        let base = anim_id::base_id(*import_from_anim_id);
        if let Some(&mapped) = rules.anim_remapping.get(&(base as i64)) {
            *import_from_anim_id = anim_id::encode(
                mapped as u64,
                anim_id::layer_offset(*import_from_anim_id),
                TAE_UNIT,
            )?;
        }
    }
    Ok(())
}

/// Re-encodes the animation under its (possibly remapped) base at the same
/// layer, refreshes the derived file name, and forces Standard headers to
/// import the base's external clip. The target format loads clips lazily
/// through these import references.
fn set_animation_properties(anim: &mut Animation, rules: &RuleSet) -> Result<(), PortError> {
    let layer = anim_id::layer_offset(anim.id);
    let base = anim_id::base_id(anim.id);
    let new_base = rules
        .anim_remapping
        .get(&(base as i64))
        .map_or(base, |&v| v as u64);

    anim.id = anim_id::encode(new_base, layer, TAE_UNIT)?;
    anim.file_name = anim_id::file_name(anim.id);
    if let MiniHeader::Standard {
        imports_hkx,
        import_hkx_source_anim_id,
    } = &mut anim.mini_header
    {
        *imports_hkx = true;
        *import_hkx_source_anim_id = anim_id::encode(new_base, layer, HKX_UNIT)?;
    }
    Ok(())
}

/// Object-table variant of the property refresh: same base, no remap table.
fn reencode_in_place(anim: &mut Animation) -> Result<(), PortError> {
    let layer = anim_id::layer_offset(anim.id);
    let base = anim_id::base_id(anim.id);
    anim.id = anim_id::encode(base, layer, TAE_UNIT)?;
    anim.file_name = anim_id::file_name(anim.id);
    if let MiniHeader::Standard {
        imports_hkx,
        import_hkx_source_anim_id,
    } = &mut anim.mini_header
    {
        *imports_hkx = true;
        *import_hkx_source_anim_id = anim_id::encode(base, layer, HKX_UNIT)?;
    }
    Ok(())
}

/// Drops excluded events, then transcodes the survivors. All filtering
/// decisions read the original parameter bytes; rewriting happens after.
fn filter_and_transcode_events(
    anim: &mut Animation,
    big_endian: bool,
    ctx: &TaeContext,
) -> Result<(), PortError> {
    let rules = ctx.rules;
    let edit_ctx = EditContext {
        big_endian,
        sound_chr_id: ctx.options.sound_chr_id(),
        sp_effect_remapping: &rules.sp_effect_remapping,
    };

    let events = std::mem::take(&mut anim.events);
    for ev in events {
        let type_ok = !rules.excluded_events.contains(&i64::from(ev.event_type))
            || matches!(ev.sp_effect_id(big_endian)?,
                Some(id) if rules.allowed_sp_effects.contains(&i64::from(id)));
        let jump_ok = !matches!(ev.jump_table_id(big_endian)?,
            Some(id) if rules.excluded_jump_tables.contains(&i64::from(id)));
        let rumble_ok = !matches!(ev.rumble_cam_id(big_endian)?,
            Some(id) if rules.excluded_rumble_cams.contains(&i64::from(id)));
        if type_ok && jump_ok && rumble_ok {
            anim.events.push(edit_event(ev, ctx.edit_table, &edit_ctx)?);
        }
    }
    Ok(())
}

/// Compacts layer offsets after whole layers were dropped: each surviving
/// layer shifts down by the number of excluded layers below it, keeping the
/// numbering contiguous for consumers that index layers directly.
fn shift_animation_offsets(
    animations: &mut [Animation],
    excluded_offsets: &[u32],
) -> Result<(), PortError> {
    for anim in animations.iter_mut() {
        let layer = anim_id::layer_offset(anim.id);
        let shift = excluded_offsets.iter().filter(|&&off| off < layer).count() as u32;
        if shift == 0 {
            continue;
        }
        let new_layer = layer - shift;
        anim.id = anim_id::encode(anim_id::base_id(anim.id), new_layer, TAE_UNIT)?;
        anim.file_name = anim_id::file_name(anim.id);
        if let MiniHeader::Standard {
            imports_hkx: true,
            import_hkx_source_anim_id,
        } = &mut anim.mini_header
        {
            *import_hkx_source_anim_id = anim_id::encode(
                anim_id::base_id(*import_hkx_source_anim_id),
                new_layer,
                HKX_UNIT,
            )?;
        }
    }
    Ok(())
}
