//! Bounding volume recomputation for object meshes.
//!
//! Object sources often ship stale or zeroed boxes; the target engine culls
//! by them, so they are rebuilt from the actual vertex positions.

use super::types::Flver;

/// Zeroes every box, then grows the header, mesh and influencing-bone boxes
/// from the vertices. A bone's box also grows up its parent chain so
/// ancestors always contain their children. Bones left without any skinned
/// geometry are flagged as dummied out.
pub fn recompute_bounds(flver: &mut Flver) {
    flver.header.bounding_box = Default::default();
    for bone in &mut flver.bones {
        bone.bounding_box = Default::default();
        bone.usage_flag = 1;
    }

    for mesh in &mut flver.meshes {
        mesh.bounding_box = Default::default();
        for vertex in &mesh.vertices {
            flver.header.bounding_box.grow(vertex.position);
            mesh.bounding_box.grow(vertex.position);

            for &bone_index in &vertex.bone_indices {
                let Ok(mut index) = usize::try_from(bone_index) else {
                    continue;
                };
                if index >= flver.bones.len() {
                    continue;
                }
                flver.bones[index].usage_flag = 0;
                loop {
                    let bone = &mut flver.bones[index];
                    bone.bounding_box.grow(vertex.position);
                    match usize::try_from(bone.parent_index) {
                        Ok(parent) if parent < flver.bones.len() => index = parent,
                        _ => break,
                    }
                }
            }
        }
    }
}
