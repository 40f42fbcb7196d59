//! Geometry reconciliation
//!
//! Source faces index a shared vertex list, but the scene mesh refuses a
//! second triangle over the same three vertices. Such faces (usually the back
//! side of double-sided geometry) are deferred and replayed over duplicated
//! vertices so they survive as independent triangles.

use anvil_core::{AnvilError, DiagnosticKind, Diagnostics, Result};
use anvil_scene::{FaceError, LoopLayer, Mesh, MeshBuilder};
use anvil_xmodel::{FaceIndex, SubMesh};
use glam::{Vec2, Vec3};
use std::collections::HashMap;

use crate::options::ImportOptions;

/// Name of the UV loop layer
pub const UV_LAYER: &str = "UVMap";
/// Name of the vertex color loop layer
pub const COLOR_LAYER: &str = "Color";

/// Counters describing one reconciled sub-mesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub faces_inserted: usize,
    pub degenerate_faces: usize,
    pub deferred_faces: usize,
    pub duplicate_vertices: usize,
    /// Deferred faces dropped because duplicate triangles were disabled
    pub dropped_faces: usize,
    /// Deferred faces that collided again on replay
    pub skipped_duplicates: usize,
}

/// A built mesh plus per-slot material usage
#[derive(Debug)]
pub struct ReconciledMesh {
    pub mesh: Mesh,
    /// Faces per model material slot
    pub material_usage: Vec<usize>,
    pub stats: ReconcileStats,
}

#[derive(Default)]
struct LoopBuffers {
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<[f32; 4]>,
}

impl LoopBuffers {
    fn record(&mut self, corners: &[FaceIndex; 3]) {
        for corner in corners {
            self.normals.push(Vec3::from(corner.normal));
            self.uvs.push(Vec2::new(corner.uv[0], 1.0 - corner.uv[1]));
            self.colors.push(corner.color);
        }
    }
}

/// Duplicates of original vertices, allocated on first use
struct DuplicateVerts {
    base: usize,
    map: HashMap<usize, usize>,
    sources: Vec<usize>,
}

impl DuplicateVerts {
    fn new(base: usize) -> Self {
        Self {
            base,
            map: HashMap::new(),
            sources: Vec::new(),
        }
    }

    fn get_or_alloc(&mut self, original: usize) -> usize {
        if let Some(&dup) = self.map.get(&original) {
            return dup;
        }
        let dup = self.base + self.sources.len();
        self.sources.push(original);
        self.map.insert(original, dup);
        dup
    }
}

fn slot_index(material_id: usize, material_count: usize) -> Result<u16> {
    if material_id >= material_count {
        return Err(AnvilError::InvalidIndex {
            what: "material",
            index: material_id as i64,
            count: material_count,
        });
    }
    u16::try_from(material_id).map_err(|_| AnvilError::InvalidIndex {
        what: "material",
        index: material_id as i64,
        count: u16::MAX as usize,
    })
}

/// Build the scene mesh for one sub-mesh.
///
/// `scale` multiplies every position. Faces with repeated vertices are
/// discarded with a geometry diagnostic; faces over an already used vertex
/// set are replayed on duplicated vertices when `use_dup_tris` is on and
/// dropped (one diagnostic per mesh) otherwise.
pub fn reconcile(
    sub: &SubMesh,
    mesh_name: &str,
    material_count: usize,
    scale: f32,
    options: &ImportOptions,
    diagnostics: &mut Diagnostics,
) -> Result<ReconciledMesh> {
    let mut builder = MeshBuilder::new(mesh_name);
    let positions: Vec<Vec3> = sub
        .verts
        .iter()
        .map(|v| Vec3::from(v.offset) * scale)
        .collect();
    for &p in &positions {
        builder.add_vertex(p);
    }

    let mut loops = LoopBuffers::default();
    let mut usage = vec![0usize; material_count];
    let mut stats = ReconcileStats::default();
    let mut dups = DuplicateVerts::new(sub.verts.len());
    let mut deferred: Vec<([FaceIndex; 3], u16)> = Vec::new();

    for (face_no, face) in sub.faces.iter().enumerate() {
        let slot = slot_index(face.material_id, material_count)?;
        let corners = [face.indices[0], face.indices[2], face.indices[1]];
        let verts = corners.map(|c| c.vertex as u32);

        match builder.add_face(verts, slot) {
            Ok(_) => {
                loops.record(&corners);
                usage[slot as usize] += 1;
                stats.faces_inserted += 1;
            }
            Err(FaceError::Degenerate) => {
                stats.degenerate_faces += 1;
                diagnostics.warn(
                    DiagnosticKind::Geometry,
                    format!(
                        "Discarded degenerate face {} in mesh '{}' (vertices {:?})",
                        face_no, mesh_name, verts
                    ),
                );
            }
            Err(FaceError::Exists) => {
                let mut rewritten = corners;
                for corner in &mut rewritten {
                    corner.vertex = dups.get_or_alloc(corner.vertex);
                }
                deferred.push((rewritten, slot));
                stats.deferred_faces += 1;
            }
            Err(FaceError::MissingVertex) => {
                return Err(AnvilError::InvalidIndex {
                    what: "vertex",
                    index: verts.iter().copied().max().unwrap_or(0) as i64,
                    count: sub.verts.len(),
                });
            }
        }
    }

    let keep_duplicates = options.use_dup_tris && !deferred.is_empty();
    if keep_duplicates {
        for &source in &dups.sources {
            builder.add_vertex(positions[source]);
        }
        stats.duplicate_vertices = dups.sources.len();

        for (corners, slot) in &deferred {
            let verts = corners.map(|c| c.vertex as u32);
            match builder.add_face(verts, *slot) {
                Ok(_) => {
                    loops.record(corners);
                    usage[*slot as usize] += 1;
                    stats.faces_inserted += 1;
                }
                Err(err) => {
                    tracing::debug!(
                        "Skipped duplicate of a duplicate face in '{}' ({:?}): {}",
                        mesh_name,
                        verts,
                        err
                    );
                    stats.skipped_duplicates += 1;
                }
            }
        }
    } else if !deferred.is_empty() {
        stats.dropped_faces = deferred.len();
        diagnostics.warn(
            DiagnosticKind::Geometry,
            format!(
                "Dropped {} duplicate faces in mesh '{}' (duplicate triangles are disabled)",
                deferred.len(),
                mesh_name
            ),
        );
    }

    let mut mesh = builder.finish();

    for (i, vert) in sub.verts.iter().enumerate() {
        for &(bone, weight) in &vert.weights {
            mesh.set_weight(i, bone, weight);
        }
    }
    if keep_duplicates {
        for (n, &source) in dups.sources.iter().enumerate() {
            for &(bone, weight) in &sub.verts[source].weights {
                mesh.set_weight(dups.base + n, bone, weight);
            }
        }
    }

    for face in &mut mesh.faces {
        face.smooth = true;
    }
    if options.use_custom_normals {
        mesh.custom_normals = Some(loops.normals.iter().map(|n| n.normalize_or_zero()).collect());
    }
    mesh.uv_layers.push(LoopLayer {
        name: UV_LAYER.to_string(),
        data: loops.uvs,
    });
    if options.use_vertex_colors {
        mesh.color_layers.push(LoopLayer {
            name: COLOR_LAYER.to_string(),
            data: loops.colors,
        });
    }

    tracing::debug!("Reconciled '{}': {:?}", mesh_name, stats);

    Ok(ReconciledMesh {
        mesh,
        material_usage: usage,
        stats,
    })
}
