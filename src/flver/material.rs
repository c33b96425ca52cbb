//! Material retargeting.
//!
//! Source shaders do not exist in the target generation, so every material
//! is renamed to its closest canonical MTD and its texture slots are either
//! dummied out or carried over with re-identified paths.

use crate::catalog::MaterialCatalog;
use crate::error::PortError;

use super::types::{Material, Texture};

/// How retargeted texture slots are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureMode<'a> {
    /// Placeholder system textures; the artist rewires slots afterwards.
    Dummy,
    /// Reuse the source paths, re-identified from the source asset id to
    /// the ported one. Same-generation ports keep their real textures.
    CarryOver {
        source_id: &'a str,
        ported_id: &'a str,
    },
}

/// Suffix tokens of a source MTD name that survive into the canonical name.
/// `e` followed by `m` collapses into the combined `em` token.
const TOKEN_MAP: &[(&str, &str)] = &[
    ("add", "_Add"),
    ("sss", "_SSS"),
    ("em", "_em"),
    ("e", "_e"),
    ("glow", "_Glow"),
    ("m", "_m"),
    ("decal", "_Decal"),
    ("cloth", "_Cloth"),
];

/// Derives the canonical target MTD path for a source MTD path.
pub fn canonical_mtd(source_mtd: &str) -> String {
    let lowered = source_mtd.to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split(['_', '.'])
        .filter_map(|part| {
            TOKEN_MAP
                .iter()
                .find(|(src, _)| *src == part)
                .map(|(_, dst)| *dst)
        })
        .collect();

    // A separate `_e` and `_m` pair means the combined emissive-metallic
    // shader, which has its own MTD.
    if let Some(e_pos) = tokens.iter().position(|t| *t == "_e") {
        if let Some(m_pos) = tokens.iter().position(|t| *t == "_m") {
            tokens.remove(e_pos.max(m_pos));
            tokens[e_pos.min(m_pos)] = "_em";
        }
    }

    let mut name = String::from("C[ARSN]");
    for t in tokens {
        name.push_str(t);
    }
    format!("N:\\FDP\\data\\Material\\mtd\\character\\{name}.mtd")
}

/// Placeholder path for a texture channel role. Roles without a known
/// placeholder stay empty; the renderer tolerates an empty slot.
fn dummy_path(channel: &str) -> &'static str {
    if channel.contains("Diffuse") {
        "N:\\SPRJ\\data\\Other\\SysTex\\SYSTEX_BLACK.tga"
    } else if channel.contains("Specular") {
        "N:\\SPRJ\\data\\Other\\SysTex\\SYSTEX_DummySpecular.tga"
    } else if channel.contains("Shininess") {
        "N:\\SPRJ\\data\\Other\\SysTex\\SYSTEX_DummyShininess.tga"
    } else if channel.contains("Bumpmap") {
        "N:\\SPRJ\\data\\Other\\SysTex\\SYSTEX_DummyNormal.tga"
    } else if channel.contains("ScatteringMask") {
        "N:\\FDP\\data\\Other\\SysTex\\SYSTEX_DummyScatteringMask.tga"
    } else if channel.contains("Emissive") {
        "N:\\SPRJ\\data\\Other\\SysTex\\SYSTEX_DummyEmissive.tga"
    } else if channel.contains("BloodMask") || channel.contains("Displacement") {
        "N:\\LiveTokyo\\data\\model\\common\\tex\\dummy128.tga"
    } else {
        ""
    }
}

/// Rebuilds a source material against the catalog: canonical MTD, exactly
/// the channel slots the target shader declares, dummy or carried-over
/// paths. The GX index is assigned later, once lists are deduplicated.
pub fn retarget_material(
    source: &Material,
    catalog: &MaterialCatalog,
    mode: TextureMode,
) -> Result<Material, PortError> {
    let mtd = canonical_mtd(&source.mtd);
    let def = catalog.find(&mtd)?;

    let textures = def
        .texture_channels
        .iter()
        .map(|channel| {
            let path = match mode {
                TextureMode::Dummy => dummy_path(channel).to_string(),
                TextureMode::CarryOver {
                    source_id,
                    ported_id,
                } => source
                    .textures
                    .iter()
                    .find(|t| t.channel == *channel && !t.path.is_empty())
                    .map(|t| {
                        t.path
                            .replace(&format!("c{source_id}"), &format!("c{ported_id}"))
                    })
                    .unwrap_or_else(|| dummy_path(channel).to_string()),
            };
            Texture {
                channel: channel.clone(),
                path,
            }
        })
        .collect();

    Ok(Material {
        name: source.name.clone(),
        mtd,
        textures,
        gx_index: -1,
    })
}
