//! Anvil XModel - model file reader
//!
//! Reads XModel files into the [`Model`] data model. Two serializations of
//! the same schema are supported and chosen by file extension:
//! - `.xmodel_bin` - binary chunk stream
//! - anything else (normally `.xmodel_export`) - line-oriented text

mod binary;
mod model;
mod text;

pub use model::{Bone, Face, FaceIndex, Material, Model, SubMesh, Vert};

use anvil_core::Result;
use std::path::Path;

/// Serialization variant of a model file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Text,
    Binary,
}

impl ModelFormat {
    /// Pick the variant from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if ext == "xmodel_bin" {
            ModelFormat::Binary
        } else {
            ModelFormat::Text
        }
    }
}

/// Model name derived from a path: the file name without its last extension
pub fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

/// Load a model file.
///
/// With `split_meshes` every source object becomes its own sub-mesh;
/// otherwise all faces land in a single sub-mesh named after the model.
pub fn load_model<P: AsRef<Path>>(path: P, split_meshes: bool) -> Result<Model> {
    let path = path.as_ref();
    let name = model_name_from_path(path);
    let format = ModelFormat::from_path(path);

    let model = match format {
        ModelFormat::Binary => parse_binary(&name, &std::fs::read(path)?, split_meshes)?,
        ModelFormat::Text => parse_text(&name, &std::fs::read_to_string(path)?, split_meshes)?,
    };
    tracing::debug!(
        "Loaded {:?} model '{}': {} bones, {} materials, {} meshes, {} verts, {} faces",
        format,
        model.name,
        model.bones.len(),
        model.materials.len(),
        model.meshes.len(),
        model.vertex_count(),
        model.face_count()
    );
    Ok(model)
}

/// Parse a text model held in memory
pub fn parse_text(name: &str, source: &str, split_meshes: bool) -> Result<Model> {
    text::parse(source)?.into_model(name, split_meshes)
}

/// Parse a binary model held in memory
pub fn parse_binary(name: &str, data: &[u8], split_meshes: bool) -> Result<Model> {
    binary::parse(data)?.into_model(name, split_meshes)
}
