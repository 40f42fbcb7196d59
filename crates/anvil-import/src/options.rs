//! Import options
//!
//! Options can be loaded from a TOML file; missing keys take their defaults:
//!
//! ```toml
//! global_scale = 1.0
//! use_single_mesh = false
//! attach_model = true
//! ```

use anvil_core::{unit_scale_factor, AnvilError, Result, UnitSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_scale() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Options for one `import_xmodel` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportOptions {
    #[serde(default = "default_scale")]
    pub global_scale: f32,
    /// Multiply by the scene unit factor as well
    #[serde(default)]
    pub apply_unit_scale: bool,
    /// Merge every source object into one mesh
    #[serde(default = "default_true")]
    pub use_single_mesh: bool,
    /// Keep faces that reuse another face's vertices (double-sided geometry)
    #[serde(default = "default_true")]
    pub use_dup_tris: bool,
    #[serde(default = "default_true")]
    pub use_custom_normals: bool,
    #[serde(default = "default_true")]
    pub use_vertex_colors: bool,
    #[serde(default = "default_true")]
    pub use_armature: bool,
    #[serde(default = "default_true")]
    pub use_parents: bool,
    /// Parent the new skeleton to the active object's armature
    #[serde(default)]
    pub attach_model: bool,
    /// Fuse the new bones into the active object's armature
    #[serde(default)]
    pub merge_skeleton: bool,
    /// Search the model's directory tree for missing images
    #[serde(default = "default_true")]
    pub use_image_search: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            global_scale: default_scale(),
            apply_unit_scale: false,
            use_single_mesh: true,
            use_dup_tris: true,
            use_custom_normals: true,
            use_vertex_colors: true,
            use_armature: true,
            use_parents: true,
            attach_model: false,
            merge_skeleton: false,
            use_image_search: true,
        }
    }
}

impl ImportOptions {
    /// Load options from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            AnvilError::TomlParseError(format!(
                "Failed to parse options {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Scale applied to positions and bones for a scene with `units`
    pub fn effective_scale(&self, units: &UnitSettings) -> f32 {
        self.global_scale * unit_scale_factor(units, self.apply_unit_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::UnitSystem;

    #[test]
    fn empty_file_gives_defaults() {
        let options: ImportOptions = toml::from_str("").unwrap();
        assert_eq!(options, ImportOptions::default());
        assert!(options.use_single_mesh);
        assert!(options.use_dup_tris);
        assert!(!options.attach_model);
        assert!(!options.merge_skeleton);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let options: ImportOptions =
            toml::from_str("global_scale = 2.5\nuse_single_mesh = false\n").unwrap();
        assert_eq!(options.global_scale, 2.5);
        assert!(!options.use_single_mesh);
        assert!(options.use_armature);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ImportOptions>("use_dup_trs = false").is_err());
    }

    #[test]
    fn load_from_file_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(&path, "global_scale = \"big\"").unwrap();
        let err = ImportOptions::load_from_file(&path).unwrap_err();
        assert!(matches!(err, AnvilError::TomlParseError(_)));
    }

    #[test]
    fn effective_scale_uses_units_only_when_applied() {
        let units = UnitSettings {
            system: UnitSystem::Metric,
            scale_length: 0.0254,
        };
        let mut options = ImportOptions {
            global_scale: 2.0,
            ..Default::default()
        };
        assert_eq!(options.effective_scale(&units), 2.0);

        options.apply_unit_scale = true;
        assert!((options.effective_scale(&units) - 2.0).abs() < 1e-5);
    }
}
