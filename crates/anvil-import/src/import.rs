//! The `import_xmodel` operation

use anvil_core::{ContentHash, Diagnostic, Diagnostics, Result};
use anvil_scene::{ImageId, ObjectData, ObjectId, Scene};
use anvil_xmodel::load_model;
use std::path::Path;

use crate::attach::{attach_skeleton, merge_skeleton, MergeReport};
use crate::images::ImageResolver;
use crate::materials::{bind_materials, compact_material_slots};
use crate::options::ImportOptions;
use crate::reconcile::{reconcile, ReconcileStats};
use crate::skeleton::{bind_mesh, build_skeleton, vertex_group_names};

/// A mesh object created by an import
#[derive(Debug, Clone)]
pub struct MeshReport {
    pub object: ObjectId,
    pub name: String,
    pub stats: ReconcileStats,
}

/// Everything an import created, plus its warnings
#[derive(Debug)]
pub struct ImportReport {
    pub model_name: String,
    pub source_hash: ContentHash,
    pub meshes: Vec<MeshReport>,
    /// Armature object the meshes are bound to (the target after a merge)
    pub skeleton: Option<ObjectId>,
    /// Target bone the new skeleton was attached to
    pub attached_to: Option<String>,
    pub merge: Option<MergeReport>,
    /// Color image of each model material
    pub color_images: Vec<Option<ImageId>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportReport {
    /// User-facing warning text, if there were any warnings
    pub fn warning_summary(&self) -> Option<String> {
        let mut collected = Diagnostics::new();
        collected.extend(self.diagnostics.clone());
        collected.summary()
    }
}

/// Import a model file into `scene`.
///
/// The scene's active object at call time selects the skeleton to attach to
/// when `attach_model` is set. Parse errors abort the import; missing images,
/// bad faces and guessed bones are reported in the returned diagnostics.
pub fn import_xmodel(
    scene: &mut Scene,
    path: impl AsRef<Path>,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let path = path.as_ref();
    let mut diagnostics = Diagnostics::new();

    let target = if options.use_armature {
        scene.active().and_then(|id| scene.find_armature(id))
    } else {
        None
    };
    let attach = options.use_armature && options.attach_model && target.is_some();
    let merge = attach && options.merge_skeleton;
    if options.attach_model && !attach {
        tracing::debug!("Attachment disabled: no target armature or armatures are off");
    }

    let source_hash = ContentHash::from_file(path)?;
    let model = load_model(path, !options.use_single_mesh)?;
    let scale = options.effective_scale(&scene.units);
    tracing::info!(
        "Importing '{}' from {} (scale {})",
        model.name,
        path.display(),
        scale
    );

    let source_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut resolver = ImageResolver::new(source_dir, options.use_image_search);
    let bound = bind_materials(scene, &model, &mut resolver, &mut diagnostics)?;
    let groups = vertex_group_names(&model);

    let mut meshes = Vec::with_capacity(model.meshes.len());
    for sub in &model.meshes {
        let (object_name, mesh_name) = if options.use_single_mesh {
            (model.name.clone(), format!("{}_mesh", model.name))
        } else {
            let name = format!("{}_{}", model.name, sub.name);
            (name.clone(), name)
        };

        let reconciled = reconcile(
            sub,
            &mesh_name,
            model.materials.len(),
            scale,
            options,
            &mut diagnostics,
        )?;
        let mut mesh = reconciled.mesh;
        compact_material_slots(&mut mesh, &bound.slots, &reconciled.material_usage)?;
        mesh.validate()?;

        let (vertex_count, face_count) = (mesh.vertices.len(), mesh.faces.len());
        let object = scene.add_object(&object_name, ObjectData::Mesh(mesh));
        let obj = scene.get_mut(object)?;
        obj.vertex_groups = groups.clone();
        tracing::info!(
            "Created mesh '{}' ({} vertices, {} faces)",
            obj.name,
            vertex_count,
            face_count
        );

        meshes.push(MeshReport {
            object,
            name: obj.name.clone(),
            stats: reconciled.stats,
        });
    }

    let mut report = ImportReport {
        model_name: model.name.clone(),
        source_hash,
        meshes,
        skeleton: None,
        attached_to: None,
        merge: None,
        color_images: bound.color_images,
        diagnostics: Vec::new(),
    };

    if options.use_armature {
        let built = build_skeleton(scene, &model, scale, options.use_parents)?;
        for mesh in &report.meshes {
            bind_mesh(scene, mesh.object, built.object)?;
        }
        report.skeleton = Some(built.object);
        scene.set_active(Some(built.object));

        if let (true, Some(target)) = (attach, target) {
            report.attached_to = attach_skeleton(scene, built.object, target, &mut diagnostics)?;
            if merge {
                report.merge = Some(merge_skeleton(scene, built.object, target)?);
                report.skeleton = Some(target);
            }
        }
    } else {
        scene.set_active(report.meshes.first().map(|m| m.object));
    }

    report.diagnostics = diagnostics.drain();
    Ok(report)
}
