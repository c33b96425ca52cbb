//! Animation identifier codec.
//!
//! Animation ids encode a variant bank ("layer") in the leading digits of
//! their 9-digit decimal form: `id == base + layer * unit`. The unit is
//! 1_000_000 in the DS3/Bloodborne/Sekiro animation tables and 100_000_000
//! for Elden Ring ids and for Standard-header HKX import references.

use crate::error::PortError;

/// Animation id unit of the DS3-generation animation table.
pub const TAE_UNIT: u64 = 1_000_000;

/// Animation id unit of Elden Ring tables and of HKX import references.
pub const HKX_UNIT: u64 = 100_000_000;

/// Extracts the layer index from the 3-digit prefix of the zero-padded
/// 9-digit form. Leading zeros contribute nothing; the contiguous run of
/// nonzero digits after them is the layer, so both `005123456` (unit 1e6)
/// and `500123456` (unit 1e8) decode to layer 5.
pub fn layer_offset(id: u64) -> u32 {
    let digits = format!("{id:09}");
    let prefix = &digits[..3];
    let run: String = prefix
        .chars()
        .skip_while(|c| *c == '0')
        .take_while(|c| *c != '0')
        .collect();
    if run.is_empty() {
        0
    } else {
        run.parse().unwrap_or(0)
    }
}

/// Strips the 3-digit layer prefix, leaving the 6-digit base id.
/// Ids at layer 0 are already at most 6 digits and pass through unchanged.
pub fn base_id(id: u64) -> u64 {
    if layer_offset(id) == 0 {
        return id;
    }
    let digits = format!("{id:09}");
    digits[3..].parse().unwrap_or(id)
}

/// Re-encodes a base id at a layer. Fails if the base would spill into the
/// layer digits or the layer is not representable as a single digit.
pub fn encode(base: u64, layer: u32, unit: u64) -> Result<u64, PortError> {
    if base >= unit || layer > 9 {
        return Err(PortError::InvalidId { base, layer, unit });
    }
    Ok(base + u64::from(layer) * unit)
}

/// Derives the animation file name the target format expects:
/// `a` + 9-digit id with `_` after the third digit + `.hkt`.
pub fn file_name(id: u64) -> String {
    let digits = format!("{id:09}");
    format!("a{}_{}.hkt", &digits[..3], &digits[3..])
}

/// File name of the external clip an import reference points at,
/// `a00{layer}_{base}.hkx`. Used to probe the source container.
pub fn import_hkx_name(import_id: u64) -> String {
    format!("a00{}_{:06}.hkx", layer_offset(import_id), base_id(import_id))
}
