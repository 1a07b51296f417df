use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use tracing::info;

use crate::error::{Result, StoreError};

/// File extensions treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Read-only view of a connected image folder.
#[derive(Debug, Clone)]
pub struct ImageSource {
    root: PathBuf,
}

impl ImageSource {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::NotADirectory(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every image below the root, as `/`-separated relative ids, sorted.
    pub fn scan(&self) -> Result<Vec<String>> {
        let mut images = Vec::new();
        for entry in WalkDir::new(&self.root).skip_hidden(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !is_image_file(&path) {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&self.root) {
                images.push(image_id(relative));
            }
        }
        images.sort();
        info!(root = %self.root.display(), images = images.len(), "scanned image folder");
        Ok(images)
    }

    /// Absolute path of an image id.
    pub fn path_of(&self, image_id: &str) -> PathBuf {
        image_id.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }
}

fn image_id(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
