//! # exif-editor
//!
//! Metadata model and batch-edit engine for EXIF, IPTC and XMP tags embedded
//! in JPEG, PNG and WebP files.
//!
//! ## Quick Start
//!
//! A [`FileBatch`] opens images lazily, tracks which ones have unsaved
//! changes and saves them all, collecting per-file failures instead of
//! stopping at the first one:
//!
//! ```rust,no_run
//! use exif_editor::{EditorContext, FileBatch};
//!
//! fn main() -> Result<(), exif_editor::Error> {
//!     let mut batch = FileBatch::new(EditorContext::default());
//!
//!     let image = batch.get("photos/beach.jpg")?;
//!     image.set_artist("Anna")?;
//!     image.set_value("Xmp.dc.subject", "sea, sunset")?;
//!
//!     // Make the artist of two more files match the first one
//!     batch.copy_tag("photos/beach.jpg", &["photos/dune.jpg", "photos/pier.jpg"], &["Exif.Image.Artist"])?;
//!
//!     for (path, error) in batch.save_all() {
//!         eprintln!("{}: {error}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Reading Tags
//!
//! ```rust,no_run
//! use exif_editor::{EditorContext, MetadataImage};
//!
//! let image = MetadataImage::open("photo.jpg", EditorContext::default()).unwrap();
//! for group in image.group_tags() {
//!     println!("{}", group.label());
//!     for key in &group.keys {
//!         if let Some(value) = image.get_value(key) {
//!             println!("  {:<32} {}", image.label(key), value.interpreted);
//!         }
//!     }
//! }
//! ```
//!
//! ## Tag Keys
//!
//! Tags are addressed as `<Family>.<Group>.<Name>`:
//!
//! | Family | Groups | Example |
//! |--------|--------|---------|
//! | `Exif` | `Image`, `Photo`, `GPSInfo`, `Iop`, `Thumbnail` | `Exif.Photo.FNumber` |
//! | `Iptc` | `Envelope`, `Application2` | `Iptc.Application2.Keywords` |
//! | `Xmp` | schema prefix (`dc`, `xmp`, `photoshop`, ...) | `Xmp.dc.title` |
//!
//! ## Modules
//!
//! - [`codec`]: decoding of raw values into display strings, named field codecs
//! - [`registry`]: known tags with their labels, descriptions and types
//! - [`metadata`]: one file's metadata with change tracking
//! - [`groups`]: grouping of tags by namespace
//! - [`batch`]: the set of open images, tag copy and batch save
//! - [`config`]: configuration types and loading/saving

pub mod batch;
pub mod codec;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
mod exif;
pub mod groups;
pub mod key;
pub mod metadata;
pub mod registry;

pub use batch::{FileBatch, Pixmap};
pub use codec::{DecodeAnomaly, TagCodec, TagType, TagValue};
pub use config::EditorConfig;
pub use context::EditorContext;
pub use diagnostics::{Diagnostic, Diagnostics, LogDiagnostics};
pub use error::{ContainerParseError, Error, ExifSaveError, TagUpdateError};
pub use exif::ImageFormat;
pub use groups::Group;
pub use metadata::{ChangeOutcome, MetadataImage};
