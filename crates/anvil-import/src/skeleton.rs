//! Armature construction from model bones

use anvil_core::Result;
use anvil_scene::{
    roll_to_align, unique_name, Armature, EditBone, ObjectData, ObjectId, Scene, SkinBinding,
};
use anvil_xmodel::Model;
use glam::Vec3;

/// The armature object created for a model
#[derive(Debug, Clone)]
pub struct BuiltSkeleton {
    pub object: ObjectId,
    /// Armature bone slot of each model bone
    pub bone_slots: Vec<usize>,
}

/// Host name of a model bone
pub fn bone_name(name: &str) -> String {
    name.to_lowercase()
}

/// Vertex group names for a model, one per bone in bone order
pub fn vertex_group_names(model: &Model) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(model.bones.len());
    for bone in &model.bones {
        let name = unique_name(&bone_name(&bone.name), |n| names.iter().any(|g| g == n));
        names.push(name);
    }
    names
}

/// Create `<model>_skel` holding armature `<model>_amt`.
///
/// Bones are added first and linked afterwards, so a parent may appear
/// after its children in the model.
pub fn build_skeleton(
    scene: &mut Scene,
    model: &Model,
    scale: f32,
    use_parents: bool,
) -> Result<BuiltSkeleton> {
    let mut armature = Armature::new(format!("{}_amt", model.name));
    let mut bone_slots = Vec::with_capacity(model.bones.len());

    for bone in &model.bones {
        let head = Vec3::from(bone.offset) * scale;
        let tail = head + Vec3::from(bone.axis()) * scale;
        let mut edit = EditBone::new(bone_name(&bone.name), head, tail);
        edit.roll = roll_to_align(head, tail, Vec3::from(bone.roll_reference()));
        bone_slots.push(armature.add_bone(edit));
    }

    if use_parents {
        for (i, bone) in model.bones.iter().enumerate() {
            let Some(parent) = bone.parent else {
                continue;
            };
            let child_slot = bone_slots[i];
            let parent_slot = bone_slots[parent];
            if child_slot == parent_slot {
                tracing::debug!(
                    "Skipped parent link of '{}': both bones map to the same slot",
                    bone.name
                );
                continue;
            }
            if let Err(e) = armature.set_parent(child_slot, Some(parent_slot)) {
                tracing::debug!("Skipped parent link of '{}': {}", bone.name, e);
            }
        }
    }

    let bone_count = armature.len();
    let object = scene.add_object(&format!("{}_skel", model.name), ObjectData::Armature(armature));
    scene.get_mut(object)?.show_in_front = true;
    tracing::info!(
        "Created skeleton '{}' with {} bones",
        scene.get(object)?.name,
        bone_count
    );

    Ok(BuiltSkeleton { object, bone_slots })
}

/// Parent a mesh object to a skeleton and bind its vertex groups to it
pub fn bind_mesh(scene: &mut Scene, mesh: ObjectId, skeleton: ObjectId) -> Result<()> {
    scene.set_parent(mesh, Some(skeleton), None)?;
    scene.get_mut(mesh)?.skin = Some(SkinBinding::vertex_groups(skeleton));
    Ok(())
}
