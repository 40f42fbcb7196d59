//! Anvil Scene - the content-creation scene that imports land in
//!
//! This crate models the host side of an import:
//! - `Scene` - objects, names, parenting, the active object and world matrices
//! - `Mesh` / `MeshBuilder` - shared-vertex triangle meshes with loop layers
//! - `Armature` - edit bones with head, tail and roll
//! - `MaterialLibrary` / `ImageLibrary` - scene-global asset records

mod armature;
mod library;
mod mesh;
mod naming;
mod scene;

pub use armature::{bone_matrix, roll_to_align, Armature, EditBone};
pub use library::{Image, ImageId, ImageLibrary, Material, MaterialId, MaterialLibrary};
pub use mesh::{FaceError, LoopLayer, Mesh, MeshBuilder, MeshFace, VertexWeight};
pub use naming::{strip_join_suffix, unique_name};
pub use scene::{ObjectData, ObjectId, Scene, SceneObject, SkinBinding};
