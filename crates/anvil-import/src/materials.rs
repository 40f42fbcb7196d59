//! Material binding and per-mesh slot compaction

use anvil_core::{DiagnosticKind, Diagnostics, Result};
use anvil_scene::{ImageId, Material, MaterialId, Mesh, Scene};
use anvil_xmodel::Model;
use std::collections::HashMap;

use crate::images::ImageResolver;

/// Host materials for every model material, in model order
#[derive(Debug, Clone, Default)]
pub struct BoundMaterials {
    pub slots: Vec<MaterialId>,
    /// Image bound to each model material's color channel
    pub color_images: Vec<Option<ImageId>>,
}

/// Create or reuse a scene material for each model material.
///
/// Materials already in the scene are reused untouched (with a diagnostic);
/// names repeated inside the model share the first one's material.
pub fn bind_materials(
    scene: &mut Scene,
    model: &Model,
    resolver: &mut ImageResolver,
    diagnostics: &mut Diagnostics,
) -> Result<BoundMaterials> {
    let mut bound = BoundMaterials::default();
    let mut created: HashMap<&str, MaterialId> = HashMap::new();

    for material in &model.materials {
        if let Some(&id) = created.get(material.name.as_str()) {
            bound.slots.push(id);
            bound.color_images.push(color_image(scene, id));
            continue;
        }

        if let Some(id) = scene.materials.find(&material.name) {
            diagnostics.warn(
                DiagnosticKind::Material,
                format!("Material '{}' already exists, reusing it", material.name),
            );
            created.insert(&material.name, id);
            bound.slots.push(id);
            bound.color_images.push(color_image(scene, id));
            continue;
        }

        let mut host = Material::new(&material.name);
        for (channel, filename) in &material.images {
            let image = resolver.resolve(filename, &mut scene.images, diagnostics);
            host.channels.insert(channel.clone(), image);
        }
        let color = host.color_image();
        let id = scene.materials.add(host)?;
        tracing::debug!("Created material '{}'", material.name);

        created.insert(&material.name, id);
        bound.slots.push(id);
        bound.color_images.push(color);
    }

    Ok(bound)
}

fn color_image(scene: &Scene, id: MaterialId) -> Option<ImageId> {
    scene.materials.get(id).and_then(Material::color_image)
}

/// Give `mesh` every model slot, then drop the slots no face uses.
///
/// One forward pass: `kept` is the next index into the shrinking slot list
/// and `usage` walks the per-slot face counts.
pub fn compact_material_slots(
    mesh: &mut Mesh,
    slots: &[MaterialId],
    usage: &[usize],
) -> Result<()> {
    mesh.materials = slots.iter().copied().map(Some).collect();

    let mut kept = 0;
    for &count in usage.iter().take(slots.len()) {
        if count == 0 {
            mesh.remove_material_slot(kept)?;
        } else {
            kept += 1;
        }
    }
    Ok(())
}
