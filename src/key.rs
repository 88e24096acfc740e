use std::fmt;

/// Metadata family a tag key belongs to (first key segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Exif,
    Iptc,
    Xmp,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exif => "Exif",
            Self::Iptc => "Iptc",
            Self::Xmp => "Xmp",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "Exif" => Some(Self::Exif),
            "Iptc" => Some(Self::Iptc),
            "Xmp" => Some(Self::Xmp),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `<Family>.<Group>.<Name>` tag key, borrowing from the key string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagKey<'a> {
    pub family: Family,
    pub group: &'a str,
    pub name: &'a str,
}

impl<'a> TagKey<'a> {
    /// Parse a key such as `Exif.Image.Artist`. Exactly three non-empty
    /// dot-separated segments are required.
    pub fn parse(key: &'a str) -> Option<Self> {
        let mut parts = key.split('.');
        let (Some(family), Some(group), Some(name), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if group.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            family: Family::from_str(family)?,
            group,
            name,
        })
    }
}

impl fmt::Display for TagKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.family, self.group, self.name)
    }
}

/// Group part of a key: everything before the final `.<Name>`.
pub fn group_of(key: &str) -> &str {
    key.rsplit_once('.').map_or(key, |(group, _)| group)
}
