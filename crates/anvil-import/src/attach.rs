//! Attaching a new skeleton to an existing one, and merging the two
//!
//! Weapon and viewhand models are authored as separate skeletons that meet at
//! well-known tag bones. Attaching hangs the new skeleton object from the
//! matching bone; merging then folds its bones into the target armature.

use anvil_core::{AnvilError, DiagnosticKind, Diagnostics, Result};
use anvil_scene::{
    roll_to_align, strip_join_suffix, unique_name, Armature, EditBone, ObjectId, Scene,
    SkinBinding,
};
use glam::{Mat4, Vec3};

/// Local offset of an attached skeleton under its parent bone's tail
pub const ATTACH_OFFSET: Vec3 = Vec3::new(0.0, -1.0, 0.0);

const GUN_BONE: &str = "j_gun";
const WEAPON_TAG: &str = "tag_weapon";
const WEAPON_TAG_RIGHT: &str = "tag_weapon_right";

/// What happened during a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Incoming bones that were kept as new bones
    pub bones_added: usize,
    /// Incoming bones folded into a same-named target bone
    pub bones_merged: usize,
    pub meshes_moved: usize,
}

/// Pick the target bone a skeleton whose first bone is `first_bone` hangs
/// from. Returns `None` only when the target has no bones.
pub fn select_attach_bone(
    first_bone: Option<&str>,
    target: &Armature,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let has = |name: &str| target.find(name).is_some();

    if let Some(first) = first_bone {
        if first == GUN_BONE && has(WEAPON_TAG) {
            return Some(WEAPON_TAG.to_string());
        }
        if first == WEAPON_TAG && has(WEAPON_TAG_RIGHT) {
            return Some(WEAPON_TAG_RIGHT.to_string());
        }
        if has(first) {
            return Some(first.to_string());
        }
    }

    let fallback = target.bones().first()?.name.clone();
    diagnostics.warn(
        DiagnosticKind::Heuristic,
        format!(
            "No matching bone for '{}' in '{}', attaching to '{}'; the merge may be incorrect",
            first_bone.unwrap_or("<none>"),
            target.name,
            fallback
        ),
    );
    Some(fallback)
}

fn armature_of<'a>(scene: &'a Scene, id: ObjectId) -> Result<&'a Armature> {
    let obj = scene.get(id)?;
    obj.armature()
        .ok_or_else(|| AnvilError::SceneError(format!("'{}' is not an armature", obj.name)))
}

fn armature_of_mut(scene: &mut Scene, id: ObjectId) -> Result<&mut Armature> {
    let obj = scene.get_mut(id)?;
    let name = obj.name.clone();
    obj.armature_mut()
        .ok_or_else(|| AnvilError::SceneError(format!("'{}' is not an armature", name)))
}

/// Parent `skeleton` to the matching bone of `target`.
///
/// Returns the chosen bone, or `None` when the target has no bones and the
/// skeleton is parented to the object itself.
pub fn attach_skeleton(
    scene: &mut Scene,
    skeleton: ObjectId,
    target: ObjectId,
    diagnostics: &mut Diagnostics,
) -> Result<Option<String>> {
    let first = armature_of(scene, skeleton)?
        .bones()
        .first()
        .map(|b| b.name.clone());
    let bone = select_attach_bone(first.as_deref(), armature_of(scene, target)?, diagnostics);

    scene.set_parent(skeleton, Some(target), bone.as_deref())?;
    scene.get_mut(skeleton)?.matrix_local = Mat4::from_translation(ATTACH_OFFSET);

    tracing::info!(
        "Attached '{}' to '{}' bone {:?}",
        scene.get(skeleton)?.name,
        scene.get(target)?.name,
        bone
    );
    Ok(bone)
}

/// Bones of `source` expressed in the space of `target`
fn bones_in_target_space(source: &Armature, relative: Mat4) -> Vec<EditBone> {
    source
        .bones()
        .iter()
        .map(|bone| {
            let head = relative.transform_point3(bone.head);
            let tail = relative.transform_point3(bone.tail);
            let up = relative.transform_vector3(bone.matrix().z_axis);
            EditBone {
                name: bone.name.clone(),
                head,
                tail,
                roll: roll_to_align(head, tail, up),
                parent: bone.parent,
            }
        })
        .collect()
}

/// Hang the gun bone from the weapon tag, or failing that the weapon tag
/// from the right-hand weapon tag. The first pair present wins even when the
/// link itself is refused.
fn relink_weapon_bones(arm: &mut Armature) {
    let pairs = [(GUN_BONE, WEAPON_TAG), (WEAPON_TAG, WEAPON_TAG_RIGHT)];
    let Some((child, parent, c, p)) = pairs.iter().find_map(|&(child, parent)| {
        Some((child, parent, arm.find(child)?, arm.find(parent)?))
    }) else {
        return;
    };
    if let Err(e) = arm.set_parent(c, Some(p)) {
        tracing::debug!("Could not parent '{}' to '{}': {}", child, parent, e);
    }
}

/// Fold the bones of `skeleton` into `target` and remove `skeleton`.
///
/// Incoming bones that clash with target bones are renamed with a counter
/// suffix, their children are moved onto the bone they clash with and the
/// renamed bone is dropped. Meshes bound to `skeleton` move to `target` without
/// changing their world placement.
pub fn merge_skeleton(
    scene: &mut Scene,
    skeleton: ObjectId,
    target: ObjectId,
) -> Result<MergeReport> {
    if skeleton == target {
        return Err(AnvilError::SceneError(
            "cannot merge a skeleton into itself".to_string(),
        ));
    }

    let mut meshes = scene.children(skeleton);
    for id in scene.skinned_by(skeleton) {
        if !meshes.contains(&id) {
            meshes.push(id);
        }
    }
    meshes.retain(|&id| scene.object(id).is_some_and(|o| o.mesh().is_some()));
    let mut placements = Vec::with_capacity(meshes.len());
    for &id in &meshes {
        placements.push((id, scene.world_matrix(id)?));
    }

    let relative = scene.world_matrix(target)?.inverse() * scene.world_matrix(skeleton)?;
    let incoming = bones_in_target_space(armature_of(scene, skeleton)?, relative);

    let arm = armature_of_mut(scene, target)?;
    let offset = arm.len();
    for bone in &incoming {
        let name = unique_name(&bone.name, |n| arm.find(n).is_some());
        arm.add_bone(EditBone {
            name,
            parent: None,
            ..bone.clone()
        });
    }
    for (i, bone) in incoming.iter().enumerate() {
        if let Some(parent) = bone.parent {
            if let Err(e) = arm.set_parent(offset + i, Some(offset + parent)) {
                tracing::debug!("Skipped parent link of '{}': {}", bone.name, e);
            }
        }
    }

    let mut report = MergeReport::default();
    let suffixed: Vec<(String, String)> = arm
        .bones()
        .iter()
        .filter_map(|b| {
            let base = strip_join_suffix(&b.name)?;
            arm.find(base).map(|_| (b.name.clone(), base.to_string()))
        })
        .collect();
    for (name, base) in &suffixed {
        let (Some(index), Some(base_index)) = (arm.find(name), arm.find(base)) else {
            continue;
        };
        for child in arm.children(index) {
            if let Err(e) = arm.set_parent(child, Some(base_index)) {
                tracing::debug!("Could not move child of '{}' onto '{}': {}", name, base, e);
            }
        }
        arm.remove_bone(index)?;
        report.bones_merged += 1;
    }
    report.bones_added = incoming.len() - report.bones_merged.min(incoming.len());

    relink_weapon_bones(arm);

    let removed = scene.remove_object(skeleton)?;
    for (id, world) in placements {
        scene.set_parent(id, Some(target), None)?;
        scene.set_world_matrix(id, world)?;
        scene.get_mut(id)?.skin = Some(SkinBinding::vertex_groups(target));
        report.meshes_moved += 1;
    }
    scene.set_active(Some(target));

    tracing::info!(
        "Merged '{}' into '{}': {} bones added, {} merged, {} meshes moved",
        removed.name,
        scene.get(target)?.name,
        report.bones_added,
        report.bones_merged,
        report.meshes_moved
    );
    Ok(report)
}
