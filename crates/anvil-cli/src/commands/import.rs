//! `anvil import`

use anvil_import::{import_xmodel, ImportOptions, ImportReport};
use anvil_scene::{ObjectData, Scene};
use anyhow::{Context, Result};
use std::path::Path;

pub struct ImportArgs {
    pub path: String,
    pub config: Option<String>,
    pub scale: Option<f32>,
    pub split: bool,
    pub no_dup_tris: bool,
    pub no_custom_normals: bool,
    pub no_vertex_colors: bool,
    pub no_armature: bool,
    pub no_parents: bool,
    pub no_image_search: bool,
    pub onto: Option<String>,
    pub merge: bool,
}

/// Options from the config file (if any) with command-line flags on top
fn build_options(args: &ImportArgs) -> Result<ImportOptions> {
    let mut options = match &args.config {
        Some(path) => ImportOptions::load_from_file(Path::new(path))
            .with_context(|| format!("loading import options from {}", path))?,
        None => ImportOptions::default(),
    };

    if let Some(scale) = args.scale {
        options.global_scale = scale;
    }
    if args.split {
        options.use_single_mesh = false;
    }
    if args.no_dup_tris {
        options.use_dup_tris = false;
    }
    if args.no_custom_normals {
        options.use_custom_normals = false;
    }
    if args.no_vertex_colors {
        options.use_vertex_colors = false;
    }
    if args.no_armature {
        options.use_armature = false;
    }
    if args.no_parents {
        options.use_parents = false;
    }
    if args.no_image_search {
        options.use_image_search = false;
    }
    if args.onto.is_some() {
        options.attach_model = true;
    }
    if args.merge {
        options.merge_skeleton = true;
    }
    Ok(options)
}

pub fn run(args: ImportArgs) -> Result<()> {
    if !Path::new(&args.path).exists() {
        anyhow::bail!("File not found: {}", args.path);
    }
    if args.merge && args.onto.is_none() {
        anyhow::bail!("--merge needs a skeleton to merge into; pass one with --onto");
    }

    let options = build_options(&args)?;
    tracing::debug!("Import options: {:?}", options);
    let mut scene = Scene::new();

    if let Some(base) = &args.onto {
        let base_options = ImportOptions {
            attach_model: false,
            merge_skeleton: false,
            use_armature: true,
            ..options.clone()
        };
        let report = import_xmodel(&mut scene, base, &base_options)
            .with_context(|| format!("importing {}", base))?;
        print_report(&scene, &report);
    }

    let report = import_xmodel(&mut scene, &args.path, &options)
        .with_context(|| format!("importing {}", args.path))?;
    print_report(&scene, &report);

    println!();
    print_scene(&scene);
    Ok(())
}

fn print_report(scene: &Scene, report: &ImportReport) {
    println!("Imported '{}'", report.model_name);
    println!("  Hash: {}", report.source_hash.to_prefixed_hex());
    for mesh in &report.meshes {
        println!(
            "  Mesh '{}': {} faces, {} duplicate vertices, {} degenerate, {} dropped",
            mesh.name,
            mesh.stats.faces_inserted,
            mesh.stats.duplicate_vertices,
            mesh.stats.degenerate_faces,
            mesh.stats.dropped_faces
        );
    }
    if let Some(skel) = report.skeleton.and_then(|id| scene.object(id)) {
        println!("  Skeleton: {}", skel.name);
    }
    if let Some(bone) = &report.attached_to {
        println!("  Attached to bone: {}", bone);
    }
    if let Some(merge) = &report.merge {
        println!(
            "  Merged: {} bones added, {} folded, {} meshes moved",
            merge.bones_added, merge.bones_merged, merge.meshes_moved
        );
    }
    if let Some(summary) = report.warning_summary() {
        println!("  Warnings:");
        for line in summary.lines() {
            println!("    {}", line);
        }
    }
}

fn print_scene(scene: &Scene) {
    println!("Scene: {} object(s)", scene.len());
    for (id, obj) in scene.objects() {
        let active = if scene.active() == Some(id) { " (active)" } else { "" };
        let parent = match (obj.parent.and_then(|p| scene.object(p)), &obj.parent_bone) {
            (Some(p), Some(bone)) => format!(" <- {}:{}", p.name, bone),
            (Some(p), None) => format!(" <- {}", p.name),
            _ => String::new(),
        };
        match &obj.data {
            ObjectData::Mesh(mesh) => println!(
                "  {} [mesh] {} verts, {} faces, {} material(s){}{}",
                obj.name,
                mesh.vertices.len(),
                mesh.faces.len(),
                mesh.materials.len(),
                parent,
                active
            ),
            ObjectData::Armature(arm) => println!(
                "  {} [armature] {} bones{}{}",
                obj.name,
                arm.len(),
                parent,
                active
            ),
            ObjectData::Empty => println!("  {} [empty]{}{}", obj.name, parent, active),
        }
    }
    println!(
        "  {} material(s), {} image(s)",
        scene.materials.len(),
        scene.images.len()
    );
    for (_, image) in scene.images.iter() {
        match (&image.filepath, image.size) {
            (Some(path), Some((w, h))) => {
                println!("    {} {}x{} ({})", image.name, w, h, path.display())
            }
            (Some(path), None) => println!("    {} ({})", image.name, path.display()),
            (None, _) => println!("    {} (placeholder)", image.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ImportArgs {
        ImportArgs {
            path: "gun.xmodel_export".to_string(),
            config: None,
            scale: None,
            split: false,
            no_dup_tris: false,
            no_custom_normals: false,
            no_vertex_colors: false,
            no_armature: false,
            no_parents: false,
            no_image_search: false,
            onto: None,
            merge: false,
        }
    }

    #[test]
    fn flags_override_defaults() {
        let options = build_options(&ImportArgs {
            scale: Some(2.54),
            split: true,
            no_dup_tris: true,
            onto: Some("hands.xmodel_export".to_string()),
            merge: true,
            ..args()
        })
        .unwrap();

        assert_eq!(options.global_scale, 2.54);
        assert!(!options.use_single_mesh);
        assert!(!options.use_dup_tris);
        assert!(options.attach_model);
        assert!(options.merge_skeleton);
        assert!(options.use_custom_normals);
    }

    #[test]
    fn no_flags_keep_defaults() {
        assert_eq!(build_options(&args()).unwrap(), ImportOptions::default());
    }
}
