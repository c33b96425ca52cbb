//! Target-generation material catalog.
//!
//! Maps each canonical MTD name to the texture channels, acceptable vertex
//! buffer declarations and default GX items the target renderer expects.
//! Loaded once per run from `material_catalog.toml` under the resource
//! directory.

use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::Deserialize;

use crate::error::PortError;
use crate::flver::types::{BufferLayout, GxItem, GxList, LayoutMember};

#[derive(Debug, Deserialize)]
struct CatalogDoc {
    #[serde(default)]
    material: Vec<MaterialDoc>,
}

#[derive(Debug, Deserialize)]
struct MaterialDoc {
    mtd: String,
    #[serde(default)]
    texture_channels: Vec<String>,
    /// Each entry is one acceptable declaration: a list of buffers, each an
    /// ordered member list.
    layout_sets: Vec<Vec<Vec<LayoutMember>>>,
    #[serde(default)]
    gx_items: Vec<GxItemDoc>,
}

#[derive(Debug, Deserialize)]
struct GxItemDoc {
    id: String,
    unk04: i32,
    data_len: usize,
}

/// One catalog entry.
#[derive(Debug, Clone)]
pub struct MaterialDef {
    pub mtd: String,
    pub texture_channels: Vec<String>,
    pub layout_sets: Vec<Vec<BufferLayout>>,
    pub gx_items: Vec<GxItem>,
}

impl MaterialDef {
    /// The declaration the conversion uses. Catalog validation guarantees
    /// at least one set per entry.
    pub fn preferred_layouts(&self) -> &[BufferLayout] {
        &self.layout_sets[0]
    }
}

/// All material definitions, keyed by lowercased MTD file name.
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    defs: HashMap<String, MaterialDef>,
}

/// `N:\...\C[ARSN]_em.mtd` → `c[arsn]_em.mtd`.
pub fn mtd_key(mtd_path: &str) -> String {
    mtd_path
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(mtd_path)
        .to_lowercase()
}

impl MaterialCatalog {
    pub fn parse(text: &str) -> Result<Self> {
        let doc: CatalogDoc = toml::from_str(text).context("parsing material catalog")?;
        let mut defs = HashMap::new();
        for mat in doc.material {
            anyhow::ensure!(
                !mat.layout_sets.is_empty(),
                "material {} has no layout sets",
                mat.mtd
            );
            let def = MaterialDef {
                mtd: mat.mtd.clone(),
                texture_channels: mat.texture_channels,
                layout_sets: mat.layout_sets,
                gx_items: mat
                    .gx_items
                    .into_iter()
                    .map(|g| GxItem {
                        id: g.id,
                        unk04: g.unk04,
                        data: vec![0; g.data_len],
                    })
                    .collect(),
            };
            defs.insert(mtd_key(&mat.mtd), def);
        }
        Ok(Self { defs })
    }

    pub fn load(res_dir: &Path) -> Result<Self> {
        let path = res_dir.join("material_catalog.toml");
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text)
    }

    /// Looks up the definition for an MTD path. Unknown materials abort the
    /// mesh conversion; emitting a mesh the renderer cannot draw helps
    /// nobody.
    pub fn find(&self, mtd_path: &str) -> Result<&MaterialDef, PortError> {
        self.defs
            .get(&mtd_key(mtd_path))
            .ok_or_else(|| PortError::UnknownMaterial(mtd_path.to_string()))
    }

    /// Default GX items for an MTD, cloned into a fresh list.
    pub fn default_gx_list(&self, mtd_path: &str) -> Result<GxList, PortError> {
        Ok(self.find(mtd_path)?.gx_items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flver::types::{LayoutSemantic, LayoutType};

    const DOC: &str = r#"
        [[material]]
        mtd = "N:\\FDP\\data\\Material\\mtd\\character\\C[ARSN].mtd"
        texture_channels = ["g_DiffuseTexture", "g_SpecularTexture", "g_BumpmapTexture"]
        layout_sets = [
            [
                [
                    { semantic = "position", type = "float3" },
                    { semantic = "normal", type = "byte4_b" },
                    { semantic = "tangent", type = "byte4_b" },
                    { semantic = "uv", type = "uv_pair" },
                    { semantic = "vertex_color", type = "byte4_c" },
                ],
            ],
        ]
        gx_items = [{ id = "GX00", unk04 = 102, data_len = 16 }]
    "#;

    #[test]
    fn lookup_is_case_insensitive_on_the_file_name() {
        let cat = MaterialCatalog::parse(DOC).unwrap();
        let def = cat.find("c[arsn].mtd").unwrap();
        assert_eq!(def.texture_channels.len(), 3);
        let def = cat
            .find("N:\\Other\\prefix\\C[ARSN].mtd")
            .unwrap();
        assert_eq!(def.preferred_layouts()[0].len(), 5);
    }

    #[test]
    fn unknown_material_is_an_error() {
        let cat = MaterialCatalog::parse(DOC).unwrap();
        assert!(matches!(
            cat.find("c[arsn]_cloth.mtd"),
            Err(PortError::UnknownMaterial(_))
        ));
    }

    #[test]
    fn gx_items_zero_fill_their_data() {
        let cat = MaterialCatalog::parse(DOC).unwrap();
        let gx = cat.default_gx_list("c[arsn].mtd").unwrap();
        assert_eq!(gx[0].data, vec![0u8; 16]);
        assert_eq!(gx[0].unk04, 102);
    }

    #[test]
    fn uv_pair_counts_double() {
        assert_eq!(LayoutType::UvPair.uv_count(), 2);
        assert_eq!(LayoutType::Uv.uv_count(), 1);
        let _ = LayoutSemantic::Uv;
    }
}
