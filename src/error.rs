//! Error types of the metadata core.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::TagType;
use crate::exif::ImageFormat;
use crate::key::Family;

/// Opening (or re-reading) an image's metadata failed.
#[derive(Debug, Error)]
pub enum ContainerParseError {
    #[error("{}: cannot read file: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: not a JPEG, PNG or WebP image", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The image file structure itself is damaged.
    #[error("{}: damaged {format} file: {reason}", .path.display())]
    Carrier {
        path: PathBuf,
        format: ImageFormat,
        reason: String,
    },

    /// One metadata section could not be parsed.
    #[error("{}: malformed {family} metadata: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        family: Family,
        reason: String,
    },
}

/// The container rejected a write to one tag.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagUpdateError {
    #[error("invalid tag key '{key}', expected <Family>.<Group>.<Name>")]
    InvalidKey { key: String },

    #[error("unknown tag '{key}'")]
    UnknownTag { key: String },

    #[error("{format} files cannot hold {family} tag '{key}'")]
    UnsupportedFamily {
        key: String,
        family: Family,
        format: ImageFormat,
    },

    #[error("invalid value for '{key}' ({tag_type}): {reason}")]
    InvalidValue {
        key: String,
        tag_type: TagType,
        reason: String,
    },
}

/// Writing an image back to disk failed.
#[derive(Debug, Error)]
pub enum ExifSaveError {
    #[error("{}: cannot read file before writing: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: cannot write file: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata could not be encoded into the file.
    #[error("{}: {reason}", .path.display())]
    Container { path: PathBuf, reason: String },
}

/// Any failure of the core, for operations that can hit several kinds.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ContainerParseError),

    #[error(transparent)]
    Update(#[from] TagUpdateError),

    #[error(transparent)]
    Save(#[from] ExifSaveError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
