//! Event parameter-block transcoding.
//!
//! Every TAE event carries an opaque parameter block whose length and field
//! offsets are implied by its type tag. Porting an event means rewriting
//! that block to the target game's shape for the same tag: resizing,
//! zeroing fields with no target equivalent, retagging, and splicing
//! remapped identifiers back in at fixed offsets.
//!
//! The per-game rewrite rules are data (see [`tables`]); this module is the
//! interpreter plus the pure id accessors the filtering pass runs on
//! original, un-rewritten bytes.

pub mod tables;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::PortError;

/// Event type tags that carry a sp-effect id in their leading field.
pub const SP_EFFECT_TYPES: [u16; 6] = [66, 67, 302, 331, 401, 797];

/// Inclusive range of type tags that carry a rumble-cam id.
pub const RUMBLE_CAM_TYPES: std::ops::RangeInclusive<u16> = 144..=145;

/// One timestamped, typed record of an animation's event track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Numeric type tag; defines the parameter block layout.
    pub event_type: u16,
    /// Group/category tag, mirroring the type tag in most cases.
    pub group_type: u16,
    /// Event window, carried through untouched.
    pub start_time: f32,
    pub end_time: f32,
    /// Opaque parameter block.
    pub param_bytes: Vec<u8>,
}

impl Event {
    pub fn new(event_type: u16, param_bytes: Vec<u8>) -> Self {
        Self {
            event_type,
            group_type: event_type,
            start_time: 0.0,
            end_time: 0.0,
            param_bytes,
        }
    }

    /// Jump-table id embedded in behavior-judge events (type 0 only).
    pub fn jump_table_id(&self, big_endian: bool) -> Result<Option<i32>, PortError> {
        if self.event_type != 0 {
            return Ok(None);
        }
        self.read_i32(0, big_endian).map(Some)
    }

    /// Rumble-cam id embedded in camera-shake events.
    pub fn rumble_cam_id(&self, big_endian: bool) -> Result<Option<i16>, PortError> {
        if !RUMBLE_CAM_TYPES.contains(&self.event_type) {
            return Ok(None);
        }
        self.read_i16(0, big_endian).map(Some)
    }

    /// Sp-effect id embedded in AddSpEffect-family events.
    pub fn sp_effect_id(&self, big_endian: bool) -> Result<Option<i32>, PortError> {
        if !SP_EFFECT_TYPES.contains(&self.event_type) {
            return Ok(None);
        }
        self.read_i32(0, big_endian).map(Some)
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), PortError> {
        let needed = offset + len;
        if self.param_bytes.len() < needed {
            return Err(PortError::MalformedEvent {
                event_type: self.event_type,
                len: self.param_bytes.len(),
                needed,
            });
        }
        Ok(())
    }

    fn read_i32(&self, offset: usize, big_endian: bool) -> Result<i32, PortError> {
        self.check_range(offset, 4)?;
        let bytes: [u8; 4] = self.param_bytes[offset..offset + 4].try_into().unwrap();
        Ok(if big_endian {
            i32::from_be_bytes(bytes)
        } else {
            i32::from_le_bytes(bytes)
        })
    }

    fn read_i16(&self, offset: usize, big_endian: bool) -> Result<i16, PortError> {
        self.check_range(offset, 2)?;
        let bytes: [u8; 2] = self.param_bytes[offset..offset + 2].try_into().unwrap();
        Ok(if big_endian {
            i16::from_be_bytes(bytes)
        } else {
            i16::from_le_bytes(bytes)
        })
    }

    fn write_i32(&mut self, offset: usize, value: i32, big_endian: bool) -> Result<(), PortError> {
        self.check_range(offset, 4)?;
        let bytes = if big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        self.param_bytes[offset..offset + 4].copy_from_slice(&bytes);
        Ok(())
    }
}

/// One rewrite step applied to an event's parameter block.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Set the block to exactly `len` bytes; new bytes are zero.
    Resize(usize),
    /// Zero a sub-range that has no target-format equivalent.
    ClearRange { start: usize, len: usize },
    /// Reassign the type tag (and mirrored group tag).
    Retag(u16),
    /// Rewrite the leading digits of the sound id field to the run's
    /// sound character id.
    RemapSoundId,
    /// Remap the leading sp-effect id through the rule table.
    RemapSpEffectId,
    /// Move one byte and zero its source (single-byte field relocation).
    MoveByte { from: usize, to: usize },
}

/// Per-game dispatch table: type tag to ordered rewrite steps.
pub type EditTable = HashMap<u16, Vec<EditOp>>;

/// Read-only context for one transcoding run.
pub struct EditContext<'a> {
    /// Endianness of integer fields inside parameter blocks.
    pub big_endian: bool,
    /// 4-digit character id substituted into sound ids; `None` leaves
    /// sound ids untouched.
    pub sound_chr_id: Option<&'a str>,
    /// Sp-effect id replacements.
    pub sp_effect_remapping: &'a hashbrown::HashMap<i64, i64>,
}

/// Rewrites one event according to the dispatch table. Events with no
/// table entry pass through unchanged. Pure with respect to its inputs.
pub fn edit_event(mut ev: Event, table: &EditTable, ctx: &EditContext) -> Result<Event, PortError> {
    let Some(ops) = table.get(&ev.event_type) else {
        return Ok(ev);
    };
    for op in ops {
        apply_op(&mut ev, op, ctx)?;
    }
    Ok(ev)
}

fn apply_op(ev: &mut Event, op: &EditOp, ctx: &EditContext) -> Result<(), PortError> {
    match *op {
        EditOp::Resize(len) => ev.param_bytes.resize(len, 0),
        EditOp::ClearRange { start, len } => {
            ev.check_range(start, len)?;
            ev.param_bytes[start..start + len].fill(0);
        }
        EditOp::Retag(new_type) => {
            ev.event_type = new_type;
            ev.group_type = new_type;
        }
        EditOp::RemapSoundId => remap_sound_id(ev, ctx)?,
        EditOp::RemapSpEffectId => {
            let id = ev.read_i32(0, ctx.big_endian)?;
            if let Some(&mapped) = ctx.sp_effect_remapping.get(&i64::from(id)) {
                let mapped = i32::try_from(mapped).map_err(|_| PortError::MalformedRules {
                    path: "speffect_remapping".into(),
                    reason: format!("mapped sp-effect id {mapped} does not fit a 32-bit field"),
                })?;
                ev.write_i32(0, mapped, ctx.big_endian)?;
            }
        }
        EditOp::MoveByte { from, to } => {
            ev.check_range(from.max(to), 1)?;
            ev.param_bytes[to] = ev.param_bytes[from];
            ev.param_bytes[from] = 0;
        }
    }
    Ok(())
}

/// Replaces the first four digits of a 9-digit sound id with the ported
/// character id. Sound types other than 1 (character SFX) and 8 (voice)
/// reference global banks and are left alone, as are ids in the shared
/// 9999 bank.
fn remap_sound_id(ev: &mut Event, ctx: &EditContext) -> Result<(), PortError> {
    let Some(chr_id) = ctx.sound_chr_id else {
        return Ok(());
    };
    let sound_type = ev.read_i32(0, ctx.big_endian)?;
    let sound_id = ev.read_i32(4, ctx.big_endian)?;

    if sound_type != 1 && sound_type != 8 {
        return Ok(());
    }
    let digits = sound_id.to_string();
    if digits.len() != 9 || &digits[..4] == "9999" {
        return Ok(());
    }
    // A malformed or oversized character id cannot form a valid sound id.
    let Ok(renumbered) = format!("{chr_id}{}", &digits[4..]).parse::<i32>() else {
        return Ok(());
    };
    ev.write_i32(4, renumbered, ctx.big_endian)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(remap: &'a hashbrown::HashMap<i64, i64>) -> EditContext<'a> {
        EditContext {
            big_endian: false,
            sound_chr_id: Some("3000"),
            sp_effect_remapping: remap,
        }
    }

    fn le_i32(v: i32) -> Vec<u8> {
        v.to_le_bytes().to_vec()
    }

    #[test]
    fn resize_zero_extends_to_exact_length() {
        let remap = hashbrown::HashMap::new();
        let mut table = EditTable::new();
        table.insert(7, vec![EditOp::Resize(16)]);

        let ev = Event::new(7, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let out = edit_event(ev, &table, &ctx(&remap)).unwrap();
        assert_eq!(out.param_bytes.len(), 16);
        assert_eq!(&out.param_bytes[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(out.param_bytes[8..].iter().all(|b| *b == 0));

        // Oversized input truncates to the same target length.
        let ev = Event::new(7, vec![9; 40]);
        let out = edit_event(ev, &table, &ctx(&remap)).unwrap();
        assert_eq!(out.param_bytes.len(), 16);
    }

    #[test]
    fn clear_range_out_of_bounds_fails_fast() {
        let remap = hashbrown::HashMap::new();
        let mut table = EditTable::new();
        table.insert(2, vec![EditOp::ClearRange { start: 17, len: 2 }]);

        let ev = Event::new(2, vec![0; 16]);
        let err = edit_event(ev, &table, &ctx(&remap)).unwrap_err();
        assert!(matches!(err, PortError::MalformedEvent { needed: 19, .. }));
    }

    #[test]
    fn retag_mirrors_group_type() {
        let remap = hashbrown::HashMap::new();
        let mut table = EditTable::new();
        table.insert(104, vec![EditOp::Retag(96), EditOp::Resize(16)]);

        let out = edit_event(Event::new(104, vec![0; 12]), &table, &ctx(&remap)).unwrap();
        assert_eq!(out.event_type, 96);
        assert_eq!(out.group_type, 96);
        assert_eq!(out.param_bytes.len(), 16);
    }

    #[test]
    fn sound_id_prefix_substitution() {
        let remap = hashbrown::HashMap::new();
        let mut table = EditTable::new();
        table.insert(128, vec![EditOp::RemapSoundId]);

        let mut bytes = le_i32(1);
        bytes.extend(le_i32(210004567));
        let out = edit_event(Event::new(128, bytes), &table, &ctx(&remap)).unwrap();
        let got = i32::from_le_bytes(out.param_bytes[4..8].try_into().unwrap());
        assert_eq!(got, 300004567);
    }

    #[test]
    fn sound_id_guards_leave_bytes_alone() {
        let remap = hashbrown::HashMap::new();
        let mut table = EditTable::new();
        table.insert(128, vec![EditOp::RemapSoundId]);

        // Shared 9999 bank.
        let mut bytes = le_i32(1);
        bytes.extend(le_i32(999904567));
        let out = edit_event(Event::new(128, bytes.clone()), &table, &ctx(&remap)).unwrap();
        assert_eq!(out.param_bytes, bytes);

        // Sound type outside {1, 8}.
        let mut bytes = le_i32(3);
        bytes.extend(le_i32(210004567));
        let out = edit_event(Event::new(128, bytes.clone()), &table, &ctx(&remap)).unwrap();
        assert_eq!(out.param_bytes, bytes);

        // Id shorter than nine digits.
        let mut bytes = le_i32(1);
        bytes.extend(le_i32(4567));
        let out = edit_event(Event::new(128, bytes.clone()), &table, &ctx(&remap)).unwrap();
        assert_eq!(out.param_bytes, bytes);
    }

    #[test]
    fn sp_effect_remap_splices_in_place() {
        let mut remap = hashbrown::HashMap::new();
        remap.insert(5300, 55300);
        let mut table = EditTable::new();
        table.insert(67, vec![EditOp::RemapSpEffectId]);

        let mut bytes = le_i32(5300);
        bytes.extend([7; 12]);
        let out = edit_event(Event::new(67, bytes), &table, &ctx(&remap)).unwrap();
        let got = i32::from_le_bytes(out.param_bytes[0..4].try_into().unwrap());
        assert_eq!(got, 55300);
        assert_eq!(&out.param_bytes[4..], &[7; 12]);
    }

    #[test]
    fn sp_effect_remap_rejects_values_over_field_width() {
        let mut remap = hashbrown::HashMap::new();
        remap.insert(5300, i64::from(i32::MAX) + 1);
        let mut table = EditTable::new();
        table.insert(67, vec![EditOp::RemapSpEffectId]);

        let err = edit_event(Event::new(67, le_i32(5300)), &table, &ctx(&remap)).unwrap_err();
        assert!(matches!(err, PortError::MalformedRules { .. }));
    }

    #[test]
    fn move_byte_zeroes_source() {
        let remap = hashbrown::HashMap::new();
        let mut table = EditTable::new();
        table.insert(100, vec![EditOp::MoveByte { from: 12, to: 13 }]);

        let mut bytes = vec![0; 16];
        bytes[12] = 0xAB;
        let out = edit_event(Event::new(100, bytes), &table, &ctx(&remap)).unwrap();
        assert_eq!(out.param_bytes[12], 0);
        assert_eq!(out.param_bytes[13], 0xAB);
    }

    #[test]
    fn accessors_reject_short_blocks() {
        let ev = Event::new(0, vec![1, 2]);
        assert!(ev.jump_table_id(false).is_err());

        let ev = Event::new(67, vec![1, 2, 3]);
        assert!(ev.sp_effect_id(false).is_err());

        let ev = Event::new(144, vec![]);
        assert!(ev.rumble_cam_id(false).is_err());
    }

    #[test]
    fn accessors_are_type_gated() {
        let ev = Event::new(96, vec![1, 0, 0, 0]);
        assert_eq!(ev.jump_table_id(false).unwrap(), None);
        assert_eq!(ev.sp_effect_id(false).unwrap(), None);
        assert_eq!(ev.rumble_cam_id(false).unwrap(), None);

        let ev = Event::new(0, 42i32.to_le_bytes().to_vec());
        assert_eq!(ev.jump_table_id(false).unwrap(), Some(42));

        let ev = Event::new(145, 7i16.to_le_bytes().to_vec());
        assert_eq!(ev.rumble_cam_id(false).unwrap(), Some(7));
    }

    #[test]
    fn big_endian_fields_decode_and_reencode() {
        let mut remap = hashbrown::HashMap::new();
        remap.insert(10, 20);
        let mut table = EditTable::new();
        table.insert(67, vec![EditOp::RemapSpEffectId]);

        let ctx = EditContext {
            big_endian: true,
            sound_chr_id: None,
            sp_effect_remapping: &remap,
        };
        let out = edit_event(Event::new(67, 10i32.to_be_bytes().to_vec()), &table, &ctx).unwrap();
        assert_eq!(i32::from_be_bytes(out.param_bytes[..4].try_into().unwrap()), 20);
    }
}
