//! Mesh conversion into the target generation's schema.

pub mod bounds;
pub mod material;
pub mod types;

pub use types::Flver;

use crate::catalog::MaterialCatalog;
use crate::error::PortError;

use material::{retarget_material, TextureMode};
use types::{layouts_equal, BufferLayout, GxList, LayoutSemantic, Vertex, OPAQUE_WHITE};

/// Index of a stored GX list structurally matching the candidate: same
/// length and per-item id, unk04 and data length. Item payloads are opaque
/// and excluded from the comparison.
fn gx_list_position(flver: &Flver, candidate: &GxList) -> Option<usize> {
    flver.gx_lists.iter().position(|list| {
        list.len() == candidate.len()
            && list.iter().zip(candidate).all(|(a, b)| {
                a.id == b.id && a.unk04 == b.unk04 && a.data.len() == b.data.len()
            })
    })
}

/// Pads the vertex's UV, tangent and color lists up to what the buffer
/// layouts require. Never truncates; existing attributes keep their values.
/// UV members of a paired type count as two channels.
fn pad_vertex(vertex: &mut Vertex, layouts: &[BufferLayout]) {
    let mut uv = 0usize;
    let mut tangent = 0usize;
    let mut color = 0usize;
    for member in layouts.iter().flatten() {
        match member.semantic {
            LayoutSemantic::Uv => uv += member.member_type.uv_count(),
            LayoutSemantic::Tangent => tangent += 1,
            LayoutSemantic::VertexColor => color += 1,
            _ => {}
        }
    }

    while vertex.uvs.len() < uv {
        vertex.uvs.push(Default::default());
    }
    while vertex.tangents.len() < tangent {
        vertex.tangents.push(Default::default());
    }
    while vertex.colors.len() < color {
        vertex.colors.push(OPAQUE_WHITE);
    }
}

/// Maps each reference layout to an index in the output layout table,
/// registering layouts not seen before.
fn register_layouts(table: &mut Vec<BufferLayout>, references: &[BufferLayout]) -> Vec<usize> {
    references
        .iter()
        .map(|reference| {
            match table.iter().position(|known| layouts_equal(known, reference)) {
                Some(i) => i,
                None => {
                    table.push(reference.clone());
                    table.len() - 1
                }
            }
        })
        .collect()
}

/// Rebuilds a source mesh container in the target schema.
///
/// Materials are retargeted against the catalog, GX lists are assigned per
/// distinct MTD with structural dedup, every mesh gets the catalog's
/// preferred buffer declaration with vertices padded to fit, and legacy
/// per-mesh bone tables are dropped. `recompute_bounds` is set for object
/// assets, whose shipped boxes are unreliable.
pub fn convert_flver(
    source: &Flver,
    catalog: &MaterialCatalog,
    mode: TextureMode,
    recompute_bounds: bool,
) -> Result<Flver, PortError> {
    let mut out = Flver {
        header: source.header.clone(),
        dummies: source.dummies.clone(),
        materials: source
            .materials
            .iter()
            .map(|m| retarget_material(m, catalog, mode))
            .collect::<Result<_, _>>()?,
        bones: source
            .bones
            .iter()
            .cloned()
            .map(|mut b| {
                // Usage flags other than 0/1 crash the target loader.
                if b.usage_flag > 1 {
                    b.usage_flag = 0;
                }
                b
            })
            .collect(),
        meshes: source.meshes.clone(),
        buffer_layouts: Vec::new(),
        gx_lists: Vec::new(),
    };

    let mut distinct_mtds: Vec<String> = Vec::new();
    for mat in &out.materials {
        if !distinct_mtds.contains(&mat.mtd) {
            distinct_mtds.push(mat.mtd.clone());
        }
    }
    for mtd in &distinct_mtds {
        let gx_list = catalog.default_gx_list(mtd)?;
        let index = match gx_list_position(&out, &gx_list) {
            Some(i) => i,
            None => {
                out.gx_lists.push(gx_list);
                out.gx_lists.len() - 1
            }
        } as i32;
        for mat in out.materials.iter_mut().filter(|m| m.mtd == *mtd) {
            mat.gx_index = index;
        }
    }

    for mesh in &mut out.meshes {
        let mtd = &out.materials[mesh.material_index].mtd;
        let layouts = catalog.find(mtd)?.preferred_layouts().to_vec();

        // The target generation has no per-mesh bone table.
        mesh.bone_indices.clear();

        for vertex in &mut mesh.vertices {
            pad_vertex(vertex, &layouts);
        }
        mesh.layout_indices = register_layouts(&mut out.buffer_layouts, &layouts);
    }

    if recompute_bounds {
        bounds::recompute_bounds(&mut out);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Bone, FaceSet, Material, Mesh, Texture};

    fn catalog() -> MaterialCatalog {
        MaterialCatalog::parse(
            r#"
            [[material]]
            mtd = "N:\\FDP\\data\\Material\\mtd\\character\\C[ARSN].mtd"
            texture_channels = ["g_DiffuseTexture"]
            layout_sets = [
                [
                    [
                        { semantic = "position", type = "float3" },
                        { semantic = "uv", type = "uv_pair" },
                        { semantic = "tangent", type = "byte4_b" },
                        { semantic = "vertex_color", type = "byte4_c" },
                    ],
                ],
            ]
            gx_items = [{ id = "GX00", unk04 = 102, data_len = 16 }]

            [[material]]
            mtd = "N:\\FDP\\data\\Material\\mtd\\character\\C[ARSN]_Add.mtd"
            texture_channels = ["g_DiffuseTexture"]
            layout_sets = [[[{ semantic = "position", type = "float3" }]]]
            gx_items = [{ id = "GX00", unk04 = 102, data_len = 16 }]
            "#,
        )
        .unwrap()
    }

    fn material(name: &str, mtd: &str) -> Material {
        Material {
            name: name.into(),
            mtd: mtd.into(),
            textures: vec![Texture {
                channel: "g_DiffuseTexture".into(),
                path: String::new(),
            }],
            gx_index: 9,
        }
    }

    fn mesh(material_index: usize, vertices: Vec<Vertex>) -> Mesh {
        Mesh {
            material_index,
            default_bone_index: 0,
            bone_indices: vec![0, 1, 2],
            face_sets: vec![FaceSet {
                flags: 0,
                triangle_strip: false,
                cull_backfaces: true,
                indices: vec![0, 1, 2],
            }],
            layout_indices: Vec::new(),
            bounding_box: Default::default(),
            vertices,
        }
    }

    fn source() -> Flver {
        Flver {
            materials: vec![
                material("body", "c5020_body.mtd"),
                material("hair", "c5020_hair.mtd"),
            ],
            bones: vec![Bone {
                name: "root".into(),
                parent_index: -1,
                bounding_box: Default::default(),
                usage_flag: 5,
            }],
            meshes: vec![
                mesh(0, vec![Vertex::default()]),
                mesh(1, vec![Vertex::default()]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn padding_meets_the_layout_and_never_truncates() {
        let mut v = Vertex {
            uvs: vec![Default::default(); 3],
            ..Default::default()
        };
        let layouts = catalog()
            .find("c[arsn].mtd")
            .unwrap()
            .preferred_layouts()
            .to_vec();
        pad_vertex(&mut v, &layouts);
        // The paired UV member wants 2; the existing 3 stay.
        assert_eq!(v.uvs.len(), 3);
        assert_eq!(v.tangents.len(), 1);
        assert_eq!(v.colors, vec![OPAQUE_WHITE]);
    }

    #[test]
    fn identical_materials_share_one_gx_list() {
        let out = convert_flver(&source(), &catalog(), TextureMode::Dummy, false).unwrap();
        // Both source MTDs collapse to C[ARSN] with the same GX items.
        assert_eq!(out.gx_lists.len(), 1);
        assert_eq!(out.materials[0].gx_index, 0);
        assert_eq!(out.materials[1].gx_index, 0);
    }

    #[test]
    fn meshes_share_registered_layouts_and_drop_bone_tables() {
        let out = convert_flver(&source(), &catalog(), TextureMode::Dummy, false).unwrap();
        assert_eq!(out.buffer_layouts.len(), 1);
        assert_eq!(out.meshes[0].layout_indices, vec![0]);
        assert_eq!(out.meshes[1].layout_indices, vec![0]);
        assert!(out.meshes.iter().all(|m| m.bone_indices.is_empty()));
    }

    #[test]
    fn bone_usage_flags_clamp_to_zero_or_one() {
        let out = convert_flver(&source(), &catalog(), TextureMode::Dummy, false).unwrap();
        assert_eq!(out.bones[0].usage_flag, 0);
    }
}
