//! Shared-vertex triangle meshes

use anvil_core::{AnvilError, Result};
use glam::{Vec2, Vec3};
use std::collections::HashSet;
use std::fmt;

use crate::library::MaterialId;

/// A triangle referencing three mesh vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshFace {
    pub vertices: [u32; 3],
    pub material_index: u16,
    pub smooth: bool,
}

/// A per-loop attribute layer. Face `i` owns loops `3i..3i + 3`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopLayer<T> {
    pub name: String,
    pub data: Vec<T>,
}

impl<T> LoopLayer<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
        }
    }
}

/// Weight of one vertex for one deform group (bone slot)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub group: usize,
    pub weight: f32,
}

/// Mesh data owned by a scene object
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<MeshFace>,
    pub uv_layers: Vec<LoopLayer<Vec2>>,
    pub color_layers: Vec<LoopLayer<[f32; 4]>>,
    /// Custom split normals, one per loop
    pub custom_normals: Option<Vec<Vec3>>,
    /// Per-vertex deform weights; empty when the mesh has no deform layer
    pub deform: Vec<Vec<VertexWeight>>,
    pub materials: Vec<Option<MaterialId>>,
}

impl Mesh {
    pub fn loop_count(&self) -> usize {
        self.faces.len() * 3
    }

    pub fn uv_layer(&self, name: &str) -> Option<&LoopLayer<Vec2>> {
        self.uv_layers.iter().find(|l| l.name == name)
    }

    pub fn color_layer(&self, name: &str) -> Option<&LoopLayer<[f32; 4]>> {
        self.color_layers.iter().find(|l| l.name == name)
    }

    /// Weights of one vertex, empty when it has none
    pub fn vertex_weights(&self, vertex: usize) -> &[VertexWeight] {
        self.deform.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set the weight of `vertex` in `group`, replacing an existing entry.
    /// Creates the deform layer on first use.
    pub fn set_weight(&mut self, vertex: usize, group: usize, weight: f32) {
        if self.deform.len() < self.vertices.len() {
            self.deform.resize(self.vertices.len(), Vec::new());
        }
        let weights = &mut self.deform[vertex];
        match weights.iter_mut().find(|w| w.group == group) {
            Some(existing) => existing.weight = weight,
            None => weights.push(VertexWeight { group, weight }),
        }
    }

    /// Remove material slot `index`, shifting higher face material indices
    /// down by one so they keep pointing at the same materials.
    pub fn remove_material_slot(&mut self, index: usize) -> Result<()> {
        if index >= self.materials.len() {
            return Err(AnvilError::SceneError(format!(
                "mesh '{}' has no material slot {}",
                self.name, index
            )));
        }
        self.materials.remove(index);
        for face in &mut self.faces {
            if face.material_index as usize > index {
                face.material_index -= 1;
            }
        }
        Ok(())
    }

    /// Check the structural invariants of the mesh
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len() as u32;
        for (i, face) in self.faces.iter().enumerate() {
            let [a, b, c] = face.vertices;
            if a >= vertex_count || b >= vertex_count || c >= vertex_count {
                return Err(AnvilError::SceneError(format!(
                    "mesh '{}' face {} references a missing vertex",
                    self.name, i
                )));
            }
            if a == b || b == c || a == c {
                return Err(AnvilError::SceneError(format!(
                    "mesh '{}' face {} is degenerate",
                    self.name, i
                )));
            }
            if !self.materials.is_empty() && face.material_index as usize >= self.materials.len()
            {
                return Err(AnvilError::SceneError(format!(
                    "mesh '{}' face {} uses missing material slot {}",
                    self.name, i, face.material_index
                )));
            }
        }

        let loops = self.loop_count();
        let layer_lengths = self
            .uv_layers
            .iter()
            .map(|l| (l.name.as_str(), l.data.len()))
            .chain(self.color_layers.iter().map(|l| (l.name.as_str(), l.data.len())))
            .chain(self.custom_normals.iter().map(|n| ("custom normals", n.len())));
        for (name, len) in layer_lengths {
            if len != loops {
                return Err(AnvilError::SceneError(format!(
                    "mesh '{}' layer '{}' has {} entries for {} loops",
                    self.name, name, len, loops
                )));
            }
        }

        if !self.deform.is_empty() && self.deform.len() != self.vertices.len() {
            return Err(AnvilError::SceneError(format!(
                "mesh '{}' deform layer covers {} of {} vertices",
                self.name,
                self.deform.len(),
                self.vertices.len()
            )));
        }

        Ok(())
    }
}

/// Why a triangle could not be added to a [`MeshBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceError {
    /// Two corners use the same vertex
    Degenerate,
    /// A triangle over the same three vertices already exists
    Exists,
    /// A corner references a vertex that was never added
    MissingVertex,
}

impl fmt::Display for FaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceError::Degenerate => f.write_str("face uses a vertex more than once"),
            FaceError::Exists => f.write_str("face already exists"),
            FaceError::MissingVertex => f.write_str("face references a missing vertex"),
        }
    }
}

impl std::error::Error for FaceError {}

/// Incremental mesh construction.
///
/// Faces are keyed by their vertex set, so a second triangle over the same
/// three vertices is refused whatever its winding.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    mesh: Mesh,
    face_keys: HashSet<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            mesh: Mesh {
                name: name.into(),
                ..Default::default()
            },
            face_keys: HashSet::new(),
        }
    }

    pub fn add_vertex(&mut self, position: Vec3) -> u32 {
        self.mesh.vertices.push(position);
        (self.mesh.vertices.len() - 1) as u32
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.mesh.faces.len()
    }

    /// Add a triangle, returning its face index
    pub fn add_face(
        &mut self,
        vertices: [u32; 3],
        material_index: u16,
    ) -> std::result::Result<usize, FaceError> {
        let [a, b, c] = vertices;
        if a == b || b == c || a == c {
            return Err(FaceError::Degenerate);
        }
        let count = self.mesh.vertices.len() as u32;
        if a >= count || b >= count || c >= count {
            return Err(FaceError::MissingVertex);
        }

        let mut key = vertices;
        key.sort_unstable();
        if !self.face_keys.insert(key) {
            return Err(FaceError::Exists);
        }

        self.mesh.faces.push(MeshFace {
            vertices,
            material_index,
            smooth: false,
        });
        Ok(self.mesh.faces.len() - 1)
    }

    /// Mutable access to the mesh being built, for layers and weights
    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn finish(self) -> Mesh {
        self.mesh
    }
}
