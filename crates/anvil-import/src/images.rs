//! Texture file resolution

use anvil_core::{DiagnosticKind, Diagnostics};
use anvil_scene::{Image, ImageId, ImageLibrary};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Locate an image file referenced by a model.
///
/// Tried in order: the name as given, `<source_dir>/<name>`,
/// `<source_dir>/<basename>` and, with `search`, every file under
/// `source_dir` whose name matches the basename case-insensitively.
pub fn find_image_file(filename: &str, source_dir: &Path, search: bool) -> Option<PathBuf> {
    let normalized = filename.replace('\\', "/");
    if normalized.is_empty() {
        return None;
    }
    let given = PathBuf::from(&normalized);
    let basename = given.file_name()?.to_os_string();

    let candidates = [
        given.clone(),
        source_dir.join(&given),
        source_dir.join(&basename),
    ];
    if let Some(found) = candidates.into_iter().find(|p| p.is_file()) {
        return Some(found);
    }

    if !search {
        return None;
    }

    let wanted = basename.to_string_lossy().to_lowercase();
    WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name().to_string_lossy().to_lowercase() == wanted)
        .map(|entry| entry.into_path())
}

/// Pixel size from the file header, if it can be read
fn probe_dimensions(path: &Path) -> Option<(u32, u32)> {
    match image::image_dimensions(path) {
        Ok(size) => Some(size),
        Err(e) => {
            tracing::debug!("Could not read image size of {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolves the images of one model, each filename at most once
#[derive(Debug)]
pub struct ImageResolver {
    source_dir: PathBuf,
    use_search: bool,
    cache: HashMap<String, ImageId>,
}

impl ImageResolver {
    pub fn new(source_dir: impl Into<PathBuf>, use_search: bool) -> Self {
        Self {
            source_dir: source_dir.into(),
            use_search,
            cache: HashMap::new(),
        }
    }

    /// Image for `filename`. A file already in the library is reused; an
    /// unresolvable name yields a placeholder and a resource diagnostic.
    pub fn resolve(
        &mut self,
        filename: &str,
        images: &mut ImageLibrary,
        diagnostics: &mut Diagnostics,
    ) -> ImageId {
        if let Some(&id) = self.cache.get(filename) {
            return id;
        }

        let id = match find_image_file(filename, &self.source_dir, self.use_search) {
            Some(path) => match images.find_by_path(&path) {
                Some(existing) => existing,
                None => {
                    let size = probe_dimensions(&path);
                    tracing::debug!("Loaded image {} ({:?})", path.display(), size);
                    images.add(Image::from_file(path, size))
                }
            },
            None => {
                diagnostics.warn(
                    DiagnosticKind::Resource,
                    format!("Image '{}' not found, using a placeholder", filename),
                );
                images
                    .find_placeholder(filename)
                    .unwrap_or_else(|| images.add(Image::placeholder(filename)))
            }
        };

        self.cache.insert(filename.to_string(), id);
        id
    }
}
