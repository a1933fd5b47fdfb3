//! Embedded EXIF metadata: extraction, sanitization and derived views.
//!
//! The stored blob is the TIFF-structured EXIF payload exactly as it appears
//! after the `Exif\0\0` header of a JPEG APP1 segment (or inside a PNG
//! `eXIf` chunk). Sanitizing drops a fixed set of bulky fields and rewrites
//! the payload; every other field keeps its original value.

mod views;

pub use views::{
    dms_to_decimal, gps_coordinates, signed_decimal, taken_at, taken_timestamp, Axis,
    EXIF_DATETIME_FORMAT,
};

use exif::experimental::Writer;
use exif::{Exif, Field, In, Reader, Tag, Value};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use crate::error::Result;

/// Containers that can carry an EXIF payload
const EXIF_CONTAINERS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "heif"];

/// Layout fields the writer regenerates from the IFD structure itself
const STRUCTURAL_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Metadata fields removed before persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StripTag {
    /// The embedded secondary thumbnail image and the IFD describing it
    Thumbnail,

    /// Manufacturer-specific opaque note
    MakerNote,

    /// Free-text user comment
    UserComment,
}

impl StripTag {
    fn removes(&self, field: &Field) -> bool {
        match self {
            Self::Thumbnail => field.ifd_num == In::THUMBNAIL,
            Self::MakerNote => field.tag == Tag::MakerNote,
            Self::UserComment => field.tag == Tag::UserComment,
        }
    }
}

/// Read the raw EXIF payload embedded in `path`.
///
/// Returns `Ok(None)` when the container holds no EXIF data or cannot carry
/// any; returns an error when the payload is present but unreadable.
pub fn extract(path: &Path) -> Result<Option<Vec<u8>>> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !EXIF_CONTAINERS.contains(&ext.as_str()) {
        debug!("No EXIF container for '{}'", path.display());
        return Ok(None);
    }

    let mut reader = BufReader::new(File::open(path)?);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(Some(exif.buf().to_vec())),
        Err(exif::Error::NotFound(_) | exif::Error::BlankValue(_) | exif::Error::NotSupported(_)) => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse a stored EXIF payload
pub(crate) fn parse(blob: &[u8]) -> Result<Exif> {
    Ok(Reader::new().read_raw(blob.to_vec())?)
}

/// Remove the fields named by `strip` from a raw EXIF payload.
///
/// All remaining fields are written back with their original values and
/// byte order. Fields of a type the writer cannot encode are dropped with a
/// warning so the rest of the payload survives.
pub fn sanitize(raw: &[u8], strip: &[StripTag]) -> Result<Vec<u8>> {
    let exif = parse(raw)?;

    let mut writer = Writer::new();
    let mut removed = 0usize;
    for field in exif.fields() {
        if STRUCTURAL_TAGS.contains(&field.tag) {
            continue;
        }
        if strip.iter().any(|tag| tag.removes(field)) {
            removed += 1;
            continue;
        }
        if let Value::Unknown(typ, count, _) = field.value {
            warn!(
                "Dropping EXIF field {:#06x} in {:?}: unsupported type {} (count {})",
                field.tag.number(),
                field.ifd_num,
                typ,
                count
            );
            removed += 1;
            continue;
        }
        writer.push_field(field);
    }

    if !strip.contains(&StripTag::Thumbnail) {
        if let Some(jpeg) = embedded_thumbnail(&exif) {
            writer.set_jpeg(jpeg, In::THUMBNAIL);
        }
    }

    let mut out = Cursor::new(Vec::with_capacity(raw.len()));
    writer.write(&mut out, exif.little_endian())?;
    let sanitized = out.into_inner();

    debug!(
        "Sanitized EXIF: removed {} fields, {} -> {} bytes",
        removed,
        raw.len(),
        sanitized.len()
    );

    Ok(sanitized)
}

/// Extract and sanitize in one step
pub fn extract_sanitized(path: &Path, strip: &[StripTag]) -> Result<Option<Vec<u8>>> {
    match extract(path)? {
        Some(raw) => sanitize(&raw, strip).map(Some),
        None => Ok(None),
    }
}

/// The JPEG bytes of the IFD1 thumbnail, if the payload carries one
pub fn embedded_thumbnail(exif: &Exif) -> Option<&[u8]> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;

    exif.buf().get(offset..offset.checked_add(length)?)
}
