//! In-memory XModel data model

use anvil_core::{AnvilError, Result};
use std::collections::BTreeMap;

/// A parsed model: bones, materials and one or more sub-meshes
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub version: u32,
    pub bones: Vec<Bone>,
    pub materials: Vec<Material>,
    pub meshes: Vec<SubMesh>,
}

impl Model {
    /// Total number of source vertices across all sub-meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.verts.len()).sum()
    }

    /// Total number of source faces across all sub-meshes
    pub fn face_count(&self) -> usize {
        self.meshes.iter().map(|m| m.faces.len()).sum()
    }
}

/// A bone in model space.
///
/// `matrix` rows are (unused, axis direction, roll reference).
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub offset: [f32; 3],
    pub scale: [f32; 3],
    pub matrix: [[f32; 3]; 3],
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            offset: [0.0; 3],
            scale: [1.0; 3],
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Direction and length of the bone (matrix row 1)
    pub fn axis(&self) -> [f32; 3] {
        self.matrix[1]
    }

    /// Reference vector used to compute the bone roll (matrix row 2)
    pub fn roll_reference(&self) -> [f32; 3] {
        self.matrix[2]
    }
}

/// A material and its texture channels (channel name -> image filename)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: String,
    pub kind: String,
    pub images: BTreeMap<String, String>,
}

/// A group of vertices and the triangles that reference them
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    pub name: String,
    pub verts: Vec<Vert>,
    pub faces: Vec<Face>,
}

/// A vertex position with its bone weights (applied as-is, not normalized)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vert {
    pub offset: [f32; 3],
    pub weights: Vec<(usize, f32)>,
}

/// One corner of a triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceIndex {
    pub vertex: usize,
    pub normal: [f32; 3],
    /// V grows downward in the file
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl FaceIndex {
    pub fn new(vertex: usize) -> Self {
        Self {
            vertex,
            normal: [0.0; 3],
            uv: [0.0; 2],
            color: [1.0; 4],
        }
    }
}

/// A triangle with its material slot
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub indices: [FaceIndex; 3],
    pub material_id: usize,
    /// Index of the source object the face belongs to
    pub object_index: usize,
}

impl Face {
    /// A face is valid when its three corners reference distinct vertices
    pub fn is_valid(&self) -> bool {
        let [a, b, c] = self.vertex_indices();
        a != b && b != c && a != c
    }

    pub fn vertex_indices(&self) -> [usize; 3] {
        [
            self.indices[0].vertex,
            self.indices[1].vertex,
            self.indices[2].vertex,
        ]
    }
}

/// Flat model contents shared by the text and binary readers, before
/// validation and sub-mesh assembly.
#[derive(Debug, Default)]
pub(crate) struct ParsedModel {
    pub version: u32,
    pub bones: Vec<Bone>,
    pub materials: Vec<Material>,
    pub objects: Vec<String>,
    pub verts: Vec<Vert>,
    pub faces: Vec<Face>,
}

impl ParsedModel {
    /// Validate indices and group faces into sub-meshes
    pub fn into_model(self, name: &str, split_meshes: bool) -> Result<Model> {
        self.validate()?;

        let ParsedModel {
            version,
            bones,
            materials,
            objects,
            verts,
            faces,
        } = self;

        let meshes = if split_meshes {
            split_by_object(&objects, &verts, faces)
        } else {
            vec![SubMesh {
                name: name.to_string(),
                verts,
                faces,
            }]
        };

        Ok(Model {
            name: name.to_string(),
            version,
            bones,
            materials,
            meshes,
        })
    }

    fn validate(&self) -> Result<()> {
        let bone_count = self.bones.len();
        for bone in &self.bones {
            if let Some(parent) = bone.parent {
                if parent >= bone_count {
                    return Err(AnvilError::InvalidIndex {
                        what: "bone parent",
                        index: parent as i64,
                        count: bone_count,
                    });
                }
            }
        }
        check_forest(&self.bones)?;

        for vert in &self.verts {
            for &(bone, _) in &vert.weights {
                if bone >= bone_count {
                    return Err(AnvilError::InvalidIndex {
                        what: "weight bone",
                        index: bone as i64,
                        count: bone_count,
                    });
                }
            }
        }

        for face in &self.faces {
            for index in &face.indices {
                if index.vertex >= self.verts.len() {
                    return Err(AnvilError::InvalidIndex {
                        what: "vertex",
                        index: index.vertex as i64,
                        count: self.verts.len(),
                    });
                }
            }
            if face.material_id >= self.materials.len() {
                return Err(AnvilError::InvalidIndex {
                    what: "material",
                    index: face.material_id as i64,
                    count: self.materials.len(),
                });
            }
            if !self.objects.is_empty() && face.object_index >= self.objects.len() {
                return Err(AnvilError::InvalidIndex {
                    what: "object",
                    index: face.object_index as i64,
                    count: self.objects.len(),
                });
            }
        }

        Ok(())
    }
}

/// Reject parent chains that loop back on themselves
fn check_forest(bones: &[Bone]) -> Result<()> {
    for (start, bone) in bones.iter().enumerate() {
        let mut current = bone.parent;
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == start || steps > bones.len() {
                return Err(AnvilError::HierarchyError(format!(
                    "bone '{}' is its own ancestor",
                    bone.name
                )));
            }
            current = bones[parent].parent;
            steps += 1;
        }
    }
    Ok(())
}

/// Build one sub-mesh per source object, renumbering vertices in order of
/// first use.
fn split_by_object(objects: &[String], verts: &[Vert], faces: Vec<Face>) -> Vec<SubMesh> {
    let mut groups: BTreeMap<usize, Vec<Face>> = BTreeMap::new();
    for face in faces {
        groups.entry(face.object_index).or_default().push(face);
    }

    groups
        .into_iter()
        .map(|(object_index, mut faces)| {
            let mut remap: Vec<Option<usize>> = vec![None; verts.len()];
            let mut local_verts = Vec::new();

            for face in &mut faces {
                for index in &mut face.indices {
                    let original = index.vertex;
                    let local = *remap[original].get_or_insert_with(|| {
                        local_verts.push(verts[original].clone());
                        local_verts.len() - 1
                    });
                    index.vertex = local;
                }
            }

            let name = objects
                .get(object_index)
                .cloned()
                .unwrap_or_else(|| format!("object_{}", object_index));

            SubMesh {
                name,
                verts: local_verts,
                faces,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vert(x: f32) -> Vert {
        Vert {
            offset: [x, 0.0, 0.0],
            weights: vec![(0, 1.0)],
        }
    }

    fn face(a: usize, b: usize, c: usize, object_index: usize) -> Face {
        Face {
            indices: [FaceIndex::new(a), FaceIndex::new(b), FaceIndex::new(c)],
            material_id: 0,
            object_index,
        }
    }

    fn parsed() -> ParsedModel {
        ParsedModel {
            version: 6,
            bones: vec![Bone::new("tag_origin", None)],
            materials: vec![Material {
                name: "mtl".to_string(),
                ..Default::default()
            }],
            objects: vec!["body".to_string(), "lens".to_string()],
            verts: (0..6).map(|i| vert(i as f32)).collect(),
            faces: vec![face(0, 1, 2, 0), face(3, 4, 5, 1), face(2, 1, 3, 0)],
        }
    }

    #[test]
    fn merged_model_keeps_single_mesh() {
        let model = parsed().into_model("gun", false).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].name, "gun");
        assert_eq!(model.vertex_count(), 6);
        assert_eq!(model.face_count(), 3);
    }

    #[test]
    fn split_renumbers_vertices_per_object() {
        let model = parsed().into_model("gun", true).unwrap();
        assert_eq!(model.meshes.len(), 2);

        let body = &model.meshes[0];
        assert_eq!(body.name, "body");
        assert_eq!(body.verts.len(), 4);
        assert_eq!(body.faces[0].vertex_indices(), [0, 1, 2]);
        assert_eq!(body.faces[1].vertex_indices(), [2, 1, 3]);
        assert_eq!(body.verts[3].offset[0], 3.0);

        let lens = &model.meshes[1];
        assert_eq!(lens.name, "lens");
        assert_eq!(lens.faces[0].vertex_indices(), [0, 1, 2]);
        assert_eq!(lens.verts[0].offset[0], 3.0);
    }

    #[test]
    fn out_of_range_vertex_is_fatal() {
        let mut model = parsed();
        model.faces.push(face(0, 1, 9, 0));
        let err = model.into_model("gun", false).unwrap_err();
        assert!(matches!(
            err,
            AnvilError::InvalidIndex { what: "vertex", index: 9, .. }
        ));
    }

    #[test]
    fn out_of_range_material_is_fatal() {
        let mut model = parsed();
        model.faces[0].material_id = 3;
        assert!(model.into_model("gun", false).is_err());
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let mut model = parsed();
        model.bones = vec![Bone::new("a", Some(1)), Bone::new("b", Some(0))];
        model.verts.iter_mut().for_each(|v| v.weights.clear());
        let err = model.into_model("gun", false).unwrap_err();
        assert!(matches!(err, AnvilError::HierarchyError(_)));
    }

    #[test]
    fn child_may_precede_parent() {
        let mut model = parsed();
        model.bones = vec![
            Bone::new("j_child", Some(1)),
            Bone::new("tag_origin", None),
        ];
        let model = model.into_model("gun", false).unwrap();
        assert_eq!(model.bones[0].parent, Some(1));
    }

    #[test]
    fn degenerate_face_is_invalid() {
        assert!(face(0, 1, 2, 0).is_valid());
        assert!(!face(0, 1, 1, 0).is_valid());
        assert!(!face(2, 1, 2, 0).is_valid());
    }
}
