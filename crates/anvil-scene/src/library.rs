//! Scene-global material and image libraries

use anvil_core::{AnvilError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Handle to a material in a [`MaterialLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

/// Handle to an image in an [`ImageLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub usize);

/// A surface material with image-backed channels
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: String,
    /// Channel name (`color`, `normal`, ...) to image
    pub channels: BTreeMap<String, ImageId>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: BTreeMap::new(),
        }
    }

    pub fn color_image(&self) -> Option<ImageId> {
        self.channels.get("color").copied()
    }
}

/// Materials by name
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material. Names are unique within the library.
    pub fn add(&mut self, material: Material) -> Result<MaterialId> {
        if self.by_name.contains_key(&material.name) {
            return Err(AnvilError::SceneError(format!(
                "material '{}' already exists",
                material.name
            )));
        }
        let id = MaterialId(self.materials.len());
        self.by_name.insert(material.name.clone(), id);
        self.materials.push(material);
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }
}

/// An image record. Pixels are never loaded; only the size is probed.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: String,
    /// Resolved file on disk, `None` for placeholders
    pub filepath: Option<PathBuf>,
    /// Stands in for a file that could not be found
    pub placeholder: bool,
    pub size: Option<(u32, u32)>,
}

impl Image {
    pub fn from_file(path: impl Into<PathBuf>, size: Option<(u32, u32)>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        Self {
            name,
            filepath: Some(path),
            placeholder: false,
            size,
        }
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filepath: None,
            placeholder: true,
            size: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ImageLibrary {
    images: Vec<Image>,
}

impl ImageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, image: Image) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn get(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id.0)
    }

    /// Image loaded from `path`, if any
    pub fn find_by_path(&self, path: &Path) -> Option<ImageId> {
        self.images
            .iter()
            .position(|img| img.filepath.as_deref() == Some(path))
            .map(ImageId)
    }

    /// Placeholder image called `name`, if any
    pub fn find_placeholder(&self, name: &str) -> Option<ImageId> {
        self.images
            .iter()
            .position(|img| img.placeholder && img.name == name)
            .map(ImageId)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &Image)> {
        self.images.iter().enumerate().map(|(i, img)| (ImageId(i), img))
    }
}
