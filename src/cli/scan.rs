use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of the formats whose metadata can be edited.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Expand files and directories (recursively) into the supported images.
/// A file reached twice, directly or through a directory, is listed once.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |file: PathBuf| {
        if seen.insert(std::path::absolute(&file).unwrap_or_else(|_| file.clone())) {
            found.push(file);
        }
    };

    for input in paths {
        if input.is_dir() {
            WalkDir::new(input)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_supported_image(entry.path()))
                .for_each(|entry| push(entry.into_path()));
        } else if input.is_file() {
            if is_supported_image(input) {
                push(input.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", input.display());
            }
        } else {
            log::warn!("Path does not exist: {}", input.display());
        }
    }

    found
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}
