//! The set of images open under one working directory.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::EditorContext;
use crate::diagnostics::Diagnostic;
use crate::error::{ContainerParseError, Error};
use crate::exif::TagHint;
use crate::metadata::MetadataImage;

/// Rendered preview of an image, produced by the front end.
pub type Pixmap = Arc<image::RgbaImage>;

/// Cache of opened images and their pixmaps, keyed by absolute path.
///
/// Every mutating operation takes `&mut self`; the batch has a single owner.
#[derive(Debug, Default)]
pub struct FileBatch {
    context: EditorContext,
    images: BTreeMap<PathBuf, MetadataImage>,
    pixmaps: HashMap<PathBuf, Pixmap>,
}

fn cache_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl FileBatch {
    pub fn new(context: EditorContext) -> Self {
        Self {
            context,
            images: BTreeMap::new(),
            pixmaps: HashMap::new(),
        }
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// The image for `path`, opened on first use. A failed open is not
    /// cached, so a later call tries again.
    pub fn get(&mut self, path: impl AsRef<Path>) -> Result<&mut MetadataImage, ContainerParseError> {
        match self.images.entry(cache_key(path.as_ref())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let image = MetadataImage::open(entry.key(), self.context.clone())?;
                Ok(entry.insert(image))
            }
        }
    }

    /// Forget every image and pixmap without saving anything.
    pub fn reset(&mut self) {
        let dirty = self.dirty_count();
        if dirty > 0 {
            log::info!("Discarding {dirty} image(s) with unsaved changes");
        }
        self.images.clear();
        self.pixmaps.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Number of open images with unsaved changes.
    pub fn dirty_count(&self) -> usize {
        self.images.values().filter(|image| image.updated()).count()
    }

    /// Whether `path` is open and has unsaved changes. Never opens the file.
    pub fn is_updated(&self, path: impl AsRef<Path>) -> bool {
        self.images
            .get(&cache_key(path.as_ref()))
            .is_some_and(MetadataImage::updated)
    }

    pub fn dirty_paths(&self) -> Vec<PathBuf> {
        self.images
            .iter()
            .filter(|(_, image)| image.updated())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Drop the cached image of `path`, unsaved changes included.
    pub fn discard(&mut self, path: impl AsRef<Path>) -> bool {
        let key = cache_key(path.as_ref());
        self.pixmaps.remove(&key);
        self.images.remove(&key).is_some()
    }

    /// Make `keys` on every destination equal to the source: present tags
    /// are written with the source's type, absent ones deleted. Returns how
    /// many tag values changed.
    pub fn copy_tag<S, D, K>(&mut self, src: S, dsts: &[D], keys: &[K]) -> Result<usize, Error>
    where
        S: AsRef<Path>,
        D: AsRef<Path>,
        K: AsRef<str>,
    {
        let source = self.get(src.as_ref())?;
        let source_path = source.path().to_path_buf();
        let values: Vec<(&str, Option<(String, TagHint)>)> = keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                (key, source.get_value(key).map(|value| (value.raw, source.tag_hint(key))))
            })
            .collect();

        let mut changed = 0;
        for dst in dsts {
            let image = self.get(dst.as_ref())?;
            if image.path() == source_path {
                continue;
            }
            for (key, value) in &values {
                let outcome = match value {
                    Some((raw, hint)) => image.set_hinted(key, raw, hint)?,
                    None => image.del_value(key),
                };
                if outcome.is_changed() {
                    changed += 1;
                }
            }
        }
        log::debug!(
            "Copied {} tag(s) from {} to {} file(s): {changed} change(s)",
            values.len(),
            source_path.display(),
            dsts.len()
        );
        Ok(changed)
    }

    /// Save every image with unsaved changes. Failures are collected per
    /// path and never stop the remaining saves; an empty map means every
    /// save succeeded.
    pub fn save_all(&mut self) -> BTreeMap<PathBuf, String> {
        let mut failures = BTreeMap::new();
        let mut saved = 0;
        for (path, image) in self.images.iter_mut().filter(|(_, image)| image.updated()) {
            match image.save() {
                Ok(()) => saved += 1,
                Err(e) => {
                    let message = e.to_string();
                    self.context.diagnostics.report(&Diagnostic::SaveFailed {
                        path,
                        error: &message,
                    });
                    failures.insert(path.clone(), message);
                }
            }
        }
        log::info!("Saved {saved} file(s), {} failed", failures.len());
        failures
    }

    // ── pixmap cache ────────────────────────────────────────────────

    pub fn get_pixmap(&self, path: impl AsRef<Path>) -> Option<Pixmap> {
        self.pixmaps.get(&cache_key(path.as_ref())).cloned()
    }

    pub fn set_pixmap(&mut self, path: impl AsRef<Path>, pixmap: Pixmap) {
        self.pixmaps.insert(cache_key(path.as_ref()), pixmap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TagType;

    fn fixtures(names: &[&str]) -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                image::RgbImage::new(8, 8).save(&path).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    // ── cache ───────────────────────────────────────────────────────

    #[test]
    fn get_is_idempotent() {
        let (_dir, paths) = fixtures(&["a.jpg"]);
        let mut batch = FileBatch::default();
        batch.get(&paths[0]).unwrap().set_artist("Anna").unwrap();
        assert!(batch.get(&paths[0]).unwrap().updated());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.dirty_count(), 1);
        assert!(batch.is_updated(&paths[0]));
    }

    #[test]
    fn failed_open_is_not_cached() {
        let (dir, _) = fixtures(&[]);
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not an image").unwrap();
        let mut batch = FileBatch::default();
        assert!(batch.get(&path).is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let (_dir, paths) = fixtures(&["a.jpg"]);
        let mut batch = FileBatch::default();
        batch.get(&paths[0]).unwrap().set_artist("Anna").unwrap();
        batch.set_pixmap(&paths[0], Arc::new(image::RgbaImage::new(2, 2)));
        batch.reset();
        assert_eq!(batch.dirty_count(), 0);
        assert!(batch.get_pixmap(&paths[0]).is_none());
        assert!(batch.save_all().is_empty());
    }

    #[test]
    fn discard_drops_one_image() {
        let (_dir, paths) = fixtures(&["a.jpg", "b.jpg"]);
        let mut batch = FileBatch::default();
        batch.get(&paths[0]).unwrap().set_artist("Anna").unwrap();
        batch.get(&paths[1]).unwrap().set_artist("Bob").unwrap();
        assert!(batch.discard(&paths[0]));
        assert_eq!(batch.dirty_paths(), vec![cache_key(&paths[1])]);
        assert!(!batch.get(&paths[0]).unwrap().updated());
    }

    #[test]
    fn pixmaps_are_memoised() {
        let (_dir, paths) = fixtures(&["a.png"]);
        let mut batch = FileBatch::default();
        let pixmap: Pixmap = Arc::new(image::RgbaImage::new(4, 4));
        batch.set_pixmap(&paths[0], pixmap.clone());
        assert!(Arc::ptr_eq(&batch.get_pixmap(&paths[0]).unwrap(), &pixmap));
    }

    // ── copy ────────────────────────────────────────────────────────

    #[test]
    fn copy_syncs_values() {
        let (_dir, paths) = fixtures(&["src.jpg", "dst.jpg"]);
        let mut batch = FileBatch::default();
        batch.get(&paths[0]).unwrap().set_artist("Anna").unwrap();
        let changed = batch
            .copy_tag(&paths[0], &paths[1..], &["Exif.Image.Artist"])
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(batch.get(&paths[1]).unwrap().artist().as_deref(), Some("Anna"));

        // second copy changes nothing
        let changed = batch
            .copy_tag(&paths[0], &paths[1..], &["Exif.Image.Artist"])
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn copy_carries_unregistered_tags() {
        let (_dir, paths) = fixtures(&["src.jpg", "dst.jpg"]);
        let mut batch = FileBatch::default();
        let source = batch.get(&paths[0]).unwrap();
        source
            .set_value_as("Exif.Image.0x9999", "hello", TagType::Ascii)
            .unwrap();
        source
            .set_value("Xmp.dc.subject", "Smith\\, John, sea")
            .unwrap();
        let keys = ["Exif.Image.0x9999", "Xmp.dc.subject"];
        let changed = batch.copy_tag(&paths[0], &paths[1..], &keys).unwrap();
        assert_eq!(changed, 1);

        let target = batch.get(&paths[1]).unwrap();
        assert_eq!(target.tag_type("Exif.Image.0x9999"), Some(TagType::Ascii));
        assert_eq!(target.get_value("Exif.Image.0x9999").unwrap().raw, "hello");
        assert_eq!(
            target.get_value("Xmp.dc.subject").unwrap().raw,
            "Smith\\, John, sea"
        );
    }

    #[test]
    fn copy_errors_propagate() {
        let (_dir, paths) = fixtures(&["src.jpg", "dst.png"]);
        let mut batch = FileBatch::default();
        batch
            .get(&paths[0])
            .unwrap()
            .set_value("Iptc.Application2.Caption", "Beach")
            .unwrap();
        let err = batch
            .copy_tag(&paths[0], &paths[1..], &["Iptc.Application2.Caption"])
            .unwrap_err();
        assert!(matches!(err, Error::Update(_)));
        assert!(!batch.is_updated(&paths[1]));
    }
}
