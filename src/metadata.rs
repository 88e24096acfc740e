//! One image file's metadata with change tracking.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::codec::{TagCodec, TagType, TagValue, fields};
use crate::context::EditorContext;
use crate::diagnostics::Diagnostic;
use crate::error::{ContainerParseError, ExifSaveError, TagUpdateError};
use crate::exif::{Container, ImageFormat, TagHint};
use crate::groups::{self, Group};

/// Result of a mutator: whether the stored value actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Changed,
    Unchanged,
}

impl ChangeOutcome {
    pub fn is_changed(self) -> bool {
        self == Self::Changed
    }

    fn from_changed(changed: bool) -> Self {
        if changed { Self::Changed } else { Self::Unchanged }
    }
}

/// Metadata of one image file.
///
/// `updated` is false after [`open`](Self::open), [`save`](Self::save) and
/// [`revert`](Self::revert), and becomes true only when an edit observes the
/// stored value change.
#[derive(Debug, Clone)]
pub struct MetadataImage {
    path: PathBuf,
    container: Container,
    /// Group names in display order.
    groups: Vec<String>,
    updated: bool,
    context: EditorContext,
}

impl MetadataImage {
    /// Read and parse the metadata of `path`. The file is not kept open.
    pub fn open(path: impl AsRef<Path>, context: EditorContext) -> Result<Self, ContainerParseError> {
        let path = path.as_ref().to_path_buf();
        let container = Container::load(&path)?;
        let mut image = Self {
            path,
            container,
            groups: Vec::new(),
            updated: false,
            context,
        };
        image.refresh_groups();
        log::debug!("Opened {} ({} tags)", image.path.display(), image.container.keys().len());
        Ok(image)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ImageFormat {
        self.container.format()
    }

    /// Whether there are unsaved changes.
    pub fn updated(&self) -> bool {
        self.updated
    }

    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    // ── enumeration ─────────────────────────────────────────────────

    /// Every tag key, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut keys = self.container.keys();
        keys.sort();
        keys
    }

    /// Distinct group names in display order.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Sorted keys of one group.
    pub fn tags_in_group(&self, group: &str) -> Vec<String> {
        self.tags()
            .into_iter()
            .filter(|key| crate::key::group_of(key) == group)
            .collect()
    }

    /// Full group index, recomputed from the current tags.
    pub fn group_tags(&self) -> Vec<Group> {
        groups::group_tags(self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.container.contains(key)
    }

    pub fn tag_type(&self, key: &str) -> Option<TagType> {
        self.container.tag_type(key)
    }

    pub fn label(&self, key: &str) -> String {
        TagCodec::decode_label(key)
    }

    pub fn description_of(&self, key: &str) -> String {
        TagCodec::decode_description(key)
    }

    // ── values ──────────────────────────────────────────────────────

    /// Raw and interpreted value of `key`; `None` when the tag is absent.
    pub fn get_value(&self, key: &str) -> Option<TagValue> {
        let value = self.decode(key)?;
        if let Some(anomaly) = &value.anomaly {
            self.context.diagnostics.report(&Diagnostic::DecodeAnomaly {
                path: &self.path,
                key,
                anomaly,
            });
        }
        Some(value)
    }

    fn decode(&self, key: &str) -> Option<TagValue> {
        let (tag_type, raw) = self.container.get(key)?;
        Some(self.context.codec().decode(key, tag_type, &raw))
    }

    /// Store `value` (raw textual form) under `key`.
    ///
    /// Passing the current raw or interpreted value is a no-op. Otherwise the
    /// value is written, read back and compared with the previous one; a
    /// rejected write leaves the image untouched.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<ChangeOutcome, TagUpdateError> {
        self.set_hinted(key, value, &TagHint::default())
    }

    /// [`set_value`](Self::set_value) for a tag the registry does not know,
    /// such as `Exif.Image.0x9999`: a new tag is created as `tag_type`. An
    /// existing tag keeps its stored type.
    pub fn set_value_as(&mut self, key: &str, value: &str, tag_type: TagType) -> Result<ChangeOutcome, TagUpdateError> {
        let hint = TagHint {
            tag_type: Some(tag_type),
            namespace: None,
        };
        self.set_hinted(key, value, &hint)
    }

    /// Stored type and XMP namespace of `key`, for copying it elsewhere.
    pub(crate) fn tag_hint(&self, key: &str) -> TagHint {
        self.container.hint(key)
    }

    pub(crate) fn set_hinted(&mut self, key: &str, value: &str, hint: &TagHint) -> Result<ChangeOutcome, TagUpdateError> {
        let current = self.decode(key);
        if current
            .as_ref()
            .is_some_and(|current| current.raw == value || current.interpreted == value)
        {
            return Ok(ChangeOutcome::Unchanged);
        }
        let previous = self.container.get(key).map(|(_, raw)| raw);
        self.container.set_with(key, value, hint)?;
        let stored = self.container.get(key).map(|(_, raw)| raw);
        Ok(self.record_change(stored != previous))
    }

    /// Remove `key`; sets `updated` when the tag was present.
    pub fn del_value(&mut self, key: &str) -> ChangeOutcome {
        let removed = self.container.remove(key);
        self.record_change(removed)
    }

    fn record_change(&mut self, changed: bool) -> ChangeOutcome {
        if changed {
            self.updated = true;
            self.refresh_groups();
        }
        ChangeOutcome::from_changed(changed)
    }

    fn refresh_groups(&mut self) {
        self.groups = groups::group_tags(self).into_iter().map(|group| group.name).collect();
    }

    // ── persistence ─────────────────────────────────────────────────

    /// Write the changed metadata sections back into the file. `updated`
    /// stays set when this fails.
    pub fn save(&mut self) -> Result<(), ExifSaveError> {
        self.container.save(&self.path)?;
        self.updated = false;
        log::debug!("Saved {}", self.path.display());
        Ok(())
    }

    /// Drop unsaved changes by reading the file again.
    pub fn revert(&mut self) -> Result<(), ContainerParseError> {
        self.container = Container::load(&self.path)?;
        self.updated = false;
        self.refresh_groups();
        Ok(())
    }

    // ── named fields ────────────────────────────────────────────────

    pub fn description(&self) -> Option<String> {
        self.raw(fields::DESCRIPTION_KEY)
            .map(|raw| fields::decode_description(&raw))
    }

    pub fn set_description(&mut self, text: &str) -> Result<ChangeOutcome, TagUpdateError> {
        self.set_value(fields::DESCRIPTION_KEY, &fields::encode_description(text))
    }

    /// User comment without its charset marker.
    pub fn comment(&self) -> Option<String> {
        self.raw(fields::COMMENT_KEY).map(|raw| fields::decode_comment(&raw))
    }

    pub fn set_comment(&mut self, text: &str) -> Result<ChangeOutcome, TagUpdateError> {
        if self.comment().as_deref() == Some(text) {
            return Ok(ChangeOutcome::Unchanged);
        }
        self.set_value(fields::COMMENT_KEY, &fields::encode_comment(text))
    }

    /// Artists, one per line.
    pub fn artist(&self) -> Option<String> {
        self.raw(fields::ARTIST_KEY).map(|raw| fields::decode_artist(&raw))
    }

    pub fn set_artist(&mut self, text: &str) -> Result<ChangeOutcome, TagUpdateError> {
        self.set_value(fields::ARTIST_KEY, &fields::encode_artist(text))
    }

    pub fn copyright(&self) -> Option<String> {
        self.raw(fields::COPYRIGHT_KEY)
            .map(|raw| fields::decode_copyright(&raw))
    }

    pub fn set_copyright(&mut self, text: &str) -> Result<ChangeOutcome, TagUpdateError> {
        self.set_value(fields::COPYRIGHT_KEY, &fields::encode_copyright(text))
    }

    /// Capture timestamp as stored, `YYYY:MM:DD HH:MM:SS`.
    pub fn timestamp(&self) -> Option<String> {
        self.raw(fields::TIMESTAMP_KEY)
            .map(|raw| fields::decode_timestamp(&raw))
    }

    /// Set the capture timestamp; `text` must use the `YYYY:MM:DD HH:MM:SS`
    /// layout.
    pub fn set_timestamp(&mut self, text: &str) -> Result<ChangeOutcome, TagUpdateError> {
        let time = fields::parse_timestamp(text).ok_or_else(|| TagUpdateError::InvalidValue {
            key: fields::TIMESTAMP_KEY.to_string(),
            tag_type: TagType::Ascii,
            reason: format!("`{text}` does not match YYYY:MM:DD HH:MM:SS"),
        })?;
        self.set_capture_time(&time)
    }

    pub fn capture_time(&self) -> Option<NaiveDateTime> {
        self.timestamp().and_then(|text| fields::parse_timestamp(&text))
    }

    pub fn set_capture_time(&mut self, time: &NaiveDateTime) -> Result<ChangeOutcome, TagUpdateError> {
        self.set_value(fields::TIMESTAMP_KEY, &fields::format_timestamp(time))
    }

    fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.container.get(key).map(|(_, raw)| raw)
    }
}
