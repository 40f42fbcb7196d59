//! `anvil inspect`

use anvil_xmodel::{load_model, ModelFormat};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run(path: &str, split: bool) -> Result<()> {
    let model = load_model(path, split).with_context(|| format!("reading {}", path))?;

    println!(
        "Model '{}' (version {}, {:?})",
        model.name,
        model.version,
        ModelFormat::from_path(Path::new(path))
    );

    println!("Bones: {}", model.bones.len());
    for (i, bone) in model.bones.iter().enumerate() {
        let parent = bone
            .parent
            .and_then(|p| model.bones.get(p))
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        println!(
            "  [{}] {} (parent {}) at {:?}",
            i, bone.name, parent, bone.offset
        );
    }

    println!("Materials: {}", model.materials.len());
    for material in &model.materials {
        println!("  {} ({})", material.name, material.kind);
        for (channel, file) in &material.images {
            println!("    {}: {}", channel, file);
        }
    }

    println!("Meshes: {}", model.meshes.len());
    for mesh in &model.meshes {
        println!(
            "  {}: {} verts, {} faces",
            mesh.name,
            mesh.verts.len(),
            mesh.faces.len()
        );
    }

    Ok(())
}
