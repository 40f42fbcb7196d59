//! Anvil Import - XModel files into the Anvil scene
//!
//! An import runs in stages over one borrowed [`Scene`](anvil_scene::Scene):
//! 1. read the model (`anvil-xmodel`)
//! 2. bind materials and resolve their images
//! 3. reconcile each sub-mesh into a scene mesh and compact its material slots
//! 4. build the skeleton and bind the meshes to it
//! 5. optionally attach to, or merge into, the active object's skeleton

mod attach;
mod images;
mod import;
mod materials;
mod options;
mod reconcile;
mod skeleton;

pub use attach::{
    attach_skeleton, merge_skeleton, select_attach_bone, MergeReport, ATTACH_OFFSET,
};
pub use images::{find_image_file, ImageResolver};
pub use import::{import_xmodel, ImportReport, MeshReport};
pub use materials::{bind_materials, compact_material_slots, BoundMaterials};
pub use options::ImportOptions;
pub use reconcile::{reconcile, ReconcileStats, ReconciledMesh, COLOR_LAYER, UV_LAYER};
pub use skeleton::{
    bind_mesh, bone_name, build_skeleton, vertex_group_names, BuiltSkeleton,
};
