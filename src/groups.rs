//! Grouping of tag keys by namespace prefix for display.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::EditorConfig;
use crate::key::group_of;
use crate::metadata::MetadataImage;

/// One namespace prefix and its sorted member keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub keys: Vec<String>,
}

impl Group {
    pub fn label(&self) -> String {
        group_label(&self.name)
    }
}

/// Display label of a group: `Exif.Image` → `Exif Image`.
pub fn group_label(name: &str) -> String {
    name.replace('.', " ")
}

/// Group index of `image`, ordered by the priority table of its config.
pub fn group_tags(image: &MetadataImage) -> Vec<Group> {
    index(image.tags(), &image.context().config)
}

/// Group `keys` by prefix. Groups are ordered by `(priority, name)`, keys
/// within a group lexicographically.
pub fn index<I, S>(keys: I, config: &EditorConfig) -> Vec<Group>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut by_group: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in keys {
        let key = key.into();
        by_group.entry(group_of(&key).to_string()).or_default().push(key);
    }
    let mut groups: Vec<Group> = by_group
        .into_iter()
        .map(|(name, mut keys)| {
            keys.sort();
            keys.dedup();
            Group { name, keys }
        })
        .collect();
    groups.sort_by(|a, b| {
        (config.priority(&a.name), &a.name).cmp(&(config.priority(&b.name), &b.name))
    });
    groups
}
