//! Per-game event rewrite tables.
//!
//! Each source game has its own parameter block shapes per type tag; these
//! tables describe, as data, how every known-divergent tag is brought to
//! the DS3 shape. Tags without an entry pass through untouched.

use super::{EditOp, EditTable};
use crate::options::AssetKind;
use EditOp::{ClearRange, MoveByte, RemapSoundId, RemapSpEffectId, Resize, Retag};

fn table(entries: &[(u16, &[EditOp])]) -> EditTable {
    entries
        .iter()
        .map(|(tag, ops)| (*tag, ops.to_vec()))
        .collect()
}

/// Elden Ring events, character and object tracks alike.
pub fn elden_ring() -> EditTable {
    table(&[
        // InvokeAttackBehavior
        (1, &[Resize(16)]),
        // InvokeBulletBehavior
        (2, &[ClearRange { start: 17, len: 2 }, Resize(32)]),
        // SetWeaponStyle
        (32, &[Resize(16)]),
        // SwitchWeapon
        (33, &[Resize(16)]),
        // CastHighlightedMagic
        (64, &[Resize(17)]),
        // AddSpEffect_Multiplayer
        (66, &[Resize(16), RemapSpEffectId]),
        // AddSpEffect
        (67, &[Resize(16), RemapSpEffectId]),
        // SpawnOneShotFFX_Ember
        (95, &[Resize(16)]),
        // SpawnOneShotFFX
        (96, &[Resize(16)]),
        // SpawnFFX_104, folded into SpawnOneShotFFX
        (104, &[Retag(96), Resize(16)]),
        // SpawnFFX_General
        (110, &[Resize(16)]),
        // PlaySound_CenterBody
        (128, &[RemapSoundId, Resize(16)]),
        // PlaySound_ByStateInfo
        (129, &[RemapSoundId, ClearRange { start: 18, len: 14 }]),
        // PlaySound_Weapon
        (132, &[RemapSoundId, ClearRange { start: 8, len: 8 }]),
        // Wwise play-sound variants, folded into PlaySound_CenterBody
        (133, &[RemapSoundId, Retag(128), ClearRange { start: 8, len: 6 }]),
        (
            134,
            &[RemapSoundId, Retag(128), ClearRange { start: 8, len: 12 }, Resize(16)],
        ),
        // InvokeDecalParamID_DummyPoly
        (138, &[Resize(16)]),
        // InvokeRumbleCam_ByDummyPoly
        (145, &[ClearRange { start: 4, len: 2 }, Resize(16)]),
        // SetOpacityKeyframe
        (193, &[ClearRange { start: 8, len: 1 }]),
        // SetTurnSpeed
        (224, &[ClearRange { start: 5, len: 1 }, Resize(16)]),
        // SetSPRegenRatePercent
        (225, &[Resize(16)]),
        // SetKnockbackPercent
        (226, &[Resize(16)]),
        // SpawnAISound
        (237, &[Resize(16)]),
        // AddSpEffect_DragonForm
        (302, &[RemapSpEffectId]),
        // AddSpEffect_WeaponArts
        (331, &[RemapSpEffectId]),
        // AddSpEffect_Multiplayer_401
        (401, &[RemapSpEffectId]),
        // IgnoreHitsPartsMask
        (500, &[Resize(16)]),
        // SetSpecialLockOnParameter
        (522, &[ClearRange { start: 4, len: 12 }]),
        // EnableBehaviorFlags
        (600, &[Resize(16)]),
        // AdditiveAnimPlayback
        (601, &[ClearRange { start: 12, len: 4 }]),
        // TestParam
        (604, &[ClearRange { start: 0, len: 12 }]),
        // InvokeJiggleModifier
        (606, &[ClearRange { start: 1, len: 3 }]),
        // BehaviorDataUnk700
        (700, &[ClearRange { start: 21, len: 3 }, Resize(52)]),
        // InvokeFixedRotationDirection
        (703, &[Resize(16)]),
        // FacingAngleCorrection
        (705, &[Resize(16)]),
        // InvokeChrTurnSpeed_ForLock
        (706, &[ClearRange { start: 4, len: 4 }]),
        // Stagger module
        (714, &[ClearRange { start: 4, len: 4 }]),
        // OnlyForNon_c0000Enemies
        (730, &[Resize(16)]),
        // RootMotionMultiplierEX
        (760, &[Resize(32)]),
        // DisableDefaultWeaponTrail
        (790, &[Resize(16)]),
        // Poise override
        (795, &[Resize(16)]),
        // InvokeSfx
        (10096, &[ClearRange { start: 12, len: 4 }]),
        // PlaySound_WanderGhost
        (10130, &[RemapSoundId, ClearRange { start: 12, len: 4 }]),
        // Debug decals
        (10137, &[ClearRange { start: 4, len: 12 }]),
        (10138, &[ClearRange { start: 8, len: 8 }]),
    ])
}

/// Sekiro events. The PlaySound_ByStateInfo block diverged between the
/// character and object track layouts, so the table is asset-kind scoped.
pub fn sekiro(kind: AssetKind) -> EditTable {
    let mut t = table(&[
        // AddSpEffect_Multiplayer / AddSpEffect
        (66, &[RemapSpEffectId][..]),
        (67, &[RemapSpEffectId]),
        // SpawnOneShotFFX
        (96, &[Resize(16)]),
        // SpawnFFX_100, folded into SpawnOneShotFFX; the dummy-poly byte
        // moved one slot in DS3.
        (100, &[Retag(96), MoveByte { from: 12, to: 13 }]),
        // PlaySound_CenterBody
        (128, &[RemapSoundId]),
        // PlaySound_ByDummyPoly_PlayerVoice
        (130, &[RemapSoundId, ClearRange { start: 16, len: 2 }, Resize(32)]),
        // PlaySound_DummyPoly
        (131, &[RemapSoundId]),
        // SetLockCamParam_Boss
        (151, &[ClearRange { start: 4, len: 12 }, Resize(16)]),
        // SetOpacityKeyframe
        (193, &[Resize(16)]),
        // AddSpEffect_DragonForm
        (302, &[RemapSpEffectId]),
        // InvokeChrClothState
        (310, &[Resize(8)]),
        // AddSpEffect_WeaponArts
        (331, &[RemapSpEffectId]),
        // AddSpEffect_Multiplayer_401
        (401, &[ClearRange { start: 8, len: 4 }, RemapSpEffectId]),
        // EnableBehaviorFlags
        (600, &[Resize(16)]),
        // AdditiveAnimPlayback
        (601, &[ClearRange { start: 12, len: 4 }]),
        // BehaviorDataUnk700
        (700, &[Resize(52)]),
        // FacingAngleCorrection
        (705, &[ClearRange { start: 8, len: 4 }]),
        // CultCatchAttach
        (720, &[ClearRange { start: 1, len: 1 }]),
        // OnlyForNon_c0000Enemies
        (730, &[ClearRange { start: 8, len: 4 }]),
        // AddSpEffect_CultRitualCompletion
        (797, &[RemapSpEffectId]),
        // PlaySound_WanderGhost
        (10130, &[RemapSoundId, ClearRange { start: 12, len: 4 }, Resize(16)]),
    ]);
    // PlaySound_ByStateInfo
    let ops_129 = match kind {
        AssetKind::Character => vec![RemapSoundId, ClearRange { start: 18, len: 2 }],
        AssetKind::Object => {
            vec![RemapSoundId, ClearRange { start: 12, len: 4 }, Resize(32)]
        }
    };
    t.insert(129, ops_129);
    t
}

/// Bloodborne events.
pub fn bloodborne() -> EditTable {
    table(&[
        // AddSpEffect_Multiplayer / AddSpEffect
        (66, &[RemapSpEffectId][..]),
        (67, &[RemapSpEffectId]),
        // SpawnFFX_108 / SpawnFFX_109, folded into SpawnOneShotFFX
        (108, &[Retag(96), Resize(16)]),
        (109, &[Retag(96), Resize(16)]),
        // PlaySound family
        (128, &[RemapSoundId]),
        (129, &[RemapSoundId]),
        (130, &[RemapSoundId]),
        (131, &[RemapSoundId]),
        (132, &[RemapSoundId]),
        // AddSpEffect_DragonForm
        (302, &[RemapSpEffectId]),
        // SprjChrActionFlagModule
        (312, &[Resize(32)]),
        // PlayerInputCheck
        (320, &[Resize(16), ClearRange { start: 7, len: 9 }]),
        // AddSpEffect_WeaponArts
        (331, &[RemapSpEffectId]),
        // AddSpEffect_Multiplayer_401
        (401, &[RemapSpEffectId]),
        // IgnoreHitsPartsMask
        (500, &[Resize(16), ClearRange { start: 2, len: 14 }]),
        // AddSpEffect_CultRitualCompletion
        (797, &[RemapSpEffectId]),
        // PlaySound_WanderGhost
        (10130, &[RemapSoundId]),
    ])
}

/// DS3-to-DS3 repacks leave event blocks alone.
pub fn dark_souls3() -> EditTable {
    EditTable::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sekiro_table_varies_by_asset_kind() {
        let chr = sekiro(AssetKind::Character);
        let obj = sekiro(AssetKind::Object);
        assert_ne!(chr.get(&129), obj.get(&129));
        assert_eq!(chr.get(&96), obj.get(&96));
    }

    #[test]
    fn untouched_tags_have_no_entry() {
        assert!(!elden_ring().contains_key(&3));
        assert!(dark_souls3().is_empty());
    }
}
