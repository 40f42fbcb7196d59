//! Scene objects, parenting and world transforms

use anvil_core::{AnvilError, Result, UnitSettings};
use glam::Mat4;
use std::collections::HashMap;

use crate::armature::Armature;
use crate::library::{ImageLibrary, MaterialLibrary};
use crate::mesh::Mesh;
use crate::naming::unique_name;

/// Handle to an object in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Data block owned by an object
#[derive(Debug, Clone)]
pub enum ObjectData {
    Empty,
    Mesh(Mesh),
    Armature(Armature),
}

/// Binds a mesh object's vertex groups to an armature object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinBinding {
    pub target: ObjectId,
    pub use_vertex_groups: bool,
    pub use_envelopes: bool,
}

impl SkinBinding {
    /// Deform through vertex groups only
    pub fn vertex_groups(target: ObjectId) -> Self {
        Self {
            target,
            use_vertex_groups: true,
            use_envelopes: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
    pub parent: Option<ObjectId>,
    /// Bone of the parent armature this object hangs from
    pub parent_bone: Option<String>,
    pub matrix_local: Mat4,
    /// Vertex group names; group `i` is deform group `i` of the mesh
    pub vertex_groups: Vec<String>,
    pub skin: Option<SkinBinding>,
    pub show_in_front: bool,
}

impl SceneObject {
    fn new(name: String, data: ObjectData) -> Self {
        Self {
            name,
            data,
            parent: None,
            parent_bone: None,
            matrix_local: Mat4::IDENTITY,
            vertex_groups: Vec::new(),
            skin: None,
            show_in_front: false,
        }
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn armature(&self) -> Option<&Armature> {
        match &self.data {
            ObjectData::Armature(arm) => Some(arm),
            _ => None,
        }
    }

    pub fn armature_mut(&mut self) -> Option<&mut Armature> {
        match &mut self.data {
            ObjectData::Armature(arm) => Some(arm),
            _ => None,
        }
    }

    pub fn is_armature(&self) -> bool {
        matches!(self.data, ObjectData::Armature(_))
    }
}

/// Object arena with unique names and an active object
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<Option<SceneObject>>,
    names: HashMap<String, ObjectId>,
    active: Option<ObjectId>,
    pub materials: MaterialLibrary,
    pub images: ImageLibrary,
    pub units: UnitSettings,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. A taken name gets a `.NNN` suffix; the name actually
    /// used is on the returned object.
    pub fn add_object(&mut self, name: &str, data: ObjectData) -> ObjectId {
        let name = unique_name(name, |n| self.names.contains_key(n));
        let id = ObjectId(self.objects.len());
        self.names.insert(name.clone(), id);
        self.objects.push(Some(SceneObject::new(name, data)));
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0).and_then(Option::as_ref)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Like [`Scene::object`] but with an error for stale handles
    pub fn get(&self, id: ObjectId) -> Result<&SceneObject> {
        self.object(id)
            .ok_or_else(|| AnvilError::ObjectNotFound(format!("object #{}", id.0)))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.object_mut(id)
            .ok_or_else(|| AnvilError::ObjectNotFound(format!("object #{}", id.0)))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Live objects in creation order
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().map(|o| (ObjectId(i), o)))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    pub fn set_active(&mut self, id: Option<ObjectId>) {
        self.active = id.filter(|id| self.object(*id).is_some());
    }

    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.objects()
            .filter(|(_, o)| o.parent == Some(id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Mesh objects whose skin binding targets `armature`
    pub fn skinned_by(&self, armature: ObjectId) -> Vec<ObjectId> {
        self.objects()
            .filter(|(_, o)| o.skin.map(|s| s.target) == Some(armature))
            .map(|(i, _)| i)
            .collect()
    }

    /// The armature associated with an object: the object itself, the
    /// target of its skin binding, or its armature parent.
    pub fn find_armature(&self, id: ObjectId) -> Option<ObjectId> {
        let obj = self.object(id)?;
        if obj.is_armature() {
            return Some(id);
        }
        if let Some(skin) = obj.skin {
            if self.object(skin.target).is_some_and(SceneObject::is_armature) {
                return Some(skin.target);
            }
        }
        obj.parent
            .filter(|p| self.object(*p).is_some_and(SceneObject::is_armature))
    }

    /// Set or clear an object's parent. The local matrix is left unchanged.
    pub fn set_parent(
        &mut self,
        child: ObjectId,
        parent: Option<ObjectId>,
        bone: Option<&str>,
    ) -> Result<()> {
        self.get(child)?;

        if let Some(p) = parent {
            let parent_obj = self.get(p)?;
            if let Some(bone) = bone {
                let has_bone = parent_obj
                    .armature()
                    .is_some_and(|arm| arm.find(bone).is_some());
                if !has_bone {
                    return Err(AnvilError::HierarchyError(format!(
                        "'{}' has no bone '{}'",
                        parent_obj.name, bone
                    )));
                }
            }

            let mut current = Some(p);
            while let Some(id) = current {
                if id == child {
                    return Err(AnvilError::HierarchyError(format!(
                        "parenting '{}' to '{}' would form a cycle",
                        self.get(child)?.name,
                        self.get(p)?.name
                    )));
                }
                current = self.object(id).and_then(|o| o.parent);
            }
        }

        let obj = self.get_mut(child)?;
        obj.parent = parent;
        obj.parent_bone = parent.and(bone.map(str::to_string));
        Ok(())
    }

    /// Transform of the parent space an object's local matrix lives in
    fn parent_space(&self, obj: &SceneObject) -> Result<Mat4> {
        let Some(parent_id) = obj.parent else {
            return Ok(Mat4::IDENTITY);
        };
        let parent_world = self.world_matrix(parent_id)?;

        let bone_space = obj.parent_bone.as_deref().and_then(|name| {
            self.object(parent_id)
                .and_then(SceneObject::armature)
                .and_then(|arm| arm.find_bone(name))
                .map(|bone| bone.tail_transform())
        });

        Ok(match bone_space {
            Some(bone) => parent_world * bone,
            None => parent_world,
        })
    }

    pub fn world_matrix(&self, id: ObjectId) -> Result<Mat4> {
        let obj = self.get(id)?;
        Ok(self.parent_space(obj)? * obj.matrix_local)
    }

    /// Place an object at `world` under its current parent
    pub fn set_world_matrix(&mut self, id: ObjectId, world: Mat4) -> Result<()> {
        let space = self.parent_space(self.get(id)?)?;
        self.get_mut(id)?.matrix_local = space.inverse() * world;
        Ok(())
    }

    /// Remove an object. Children keep their world transform and skin
    /// bindings targeting it are cleared.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<SceneObject> {
        self.get(id)?;

        for child in self.children(id) {
            let world = self.world_matrix(child)?;
            let obj = self.get_mut(child)?;
            obj.parent = None;
            obj.parent_bone = None;
            obj.matrix_local = world;
        }
        for obj in self.objects.iter_mut().flatten() {
            if obj.skin.map(|s| s.target) == Some(id) {
                obj.skin = None;
            }
        }

        let removed = self.objects[id.0]
            .take()
            .ok_or_else(|| AnvilError::ObjectNotFound(format!("object #{}", id.0)))?;
        self.names.remove(&removed.name);
        if self.active == Some(id) {
            self.active = None;
        }
        tracing::debug!("Removed object '{}'", removed.name);
        Ok(removed)
    }
}
