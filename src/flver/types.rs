//! Mesh container records.
//!
//! Mirrors the fields the conversion touches; everything else rides through
//! the codec as passthrough words.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Vertex attribute a layout member describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutSemantic {
    Position,
    BoneWeights,
    BoneIndices,
    Normal,
    Uv,
    Tangent,
    Bitangent,
    VertexColor,
}

/// Packed storage type of a layout member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    Float2,
    Float3,
    Float4,
    Byte4A,
    Byte4B,
    Short2ToFloat2,
    Byte4C,
    Uv,
    /// Two UV channels packed into one member.
    UvPair,
    ShortBoneIndices,
    Short4ToFloat4A,
    Short4ToFloat4B,
    Byte4E,
}

impl LayoutType {
    /// How many UV channels a member of this type consumes.
    pub fn uv_count(self) -> usize {
        match self {
            LayoutType::Float4 | LayoutType::UvPair => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutMember {
    pub semantic: LayoutSemantic,
    #[serde(rename = "type")]
    pub member_type: LayoutType,
}

/// One vertex buffer declaration: an ordered member list.
pub type BufferLayout = Vec<LayoutMember>;

/// Two layouts are interchangeable when their (semantic, type) sequences
/// match; the rest of the member data is derived.
pub fn layouts_equal(a: &BufferLayout, b: &BufferLayout) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.semantic == y.semantic && x.member_type == y.member_type)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    /// Channel role, e.g. `g_DiffuseTexture`.
    pub channel: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub mtd: String,
    pub textures: Vec<Texture>,
    pub gx_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GxItem {
    pub id: String,
    pub unk04: i32,
    pub data: Vec<u8>,
}

pub type GxList = Vec<GxItem>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Grows the box to contain `point`. A zeroed box adopts the point.
    pub fn grow(&mut self, point: Vec3) {
        if *self == BoundingBox::default() {
            self.min = point;
            self.max = point;
        } else {
            self.min = self.min.min(point);
            self.max = self.max.max(point);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// -1 when the bone is a root.
    pub parent_index: i16,
    pub bounding_box: BoundingBox,
    /// 0 when geometry is skinned to the bone, 1 when it is dummied out.
    pub usage_flag: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexColor {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const OPAQUE_WHITE: VertexColor = VertexColor {
    a: 255,
    r: 255,
    g: 255,
    b: 255,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub bone_weights: [f32; 4],
    pub bone_indices: [i32; 4],
    pub normal: Vec3,
    pub normal_w: i32,
    pub uvs: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub bitangent: Vec4,
    pub colors: Vec<VertexColor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSet {
    pub flags: u32,
    pub triangle_strip: bool,
    pub cull_backfaces: bool,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub material_index: usize,
    pub default_bone_index: i32,
    /// Legacy per-mesh bone table; the target generation drops it.
    pub bone_indices: Vec<i32>,
    pub face_sets: Vec<FaceSet>,
    /// One index into [`Flver::buffer_layouts`] per vertex buffer.
    pub layout_indices: Vec<usize>,
    pub bounding_box: BoundingBox,
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlverHeader {
    pub bounding_box: BoundingBox,
    pub unicode: bool,
    /// Misc header words carried through unchanged.
    pub misc: [u8; 8],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flver {
    pub header: FlverHeader,
    /// Dummy-point blob, passthrough.
    pub dummies: Vec<u8>,
    pub materials: Vec<Material>,
    pub bones: Vec<Bone>,
    pub meshes: Vec<Mesh>,
    pub buffer_layouts: Vec<BufferLayout>,
    pub gx_lists: Vec<GxList>,
}
