//! Views derived on demand from a sanitized EXIF payload.
//!
//! Nothing here is stored; every view is recomputed from the blob and is
//! absent (`None`) rather than partial when the source fields are missing or
//! malformed.

use chrono::NaiveDateTime;
use exif::{Exif, In, Rational, Tag, Value};
use log::warn;

use super::parse;

/// Layout of the EXIF `DateTimeOriginal` field
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Which coordinate a degrees/minutes/seconds triple belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// (positive, negative) hemisphere references
    fn hemispheres(self) -> (&'static str, &'static str) {
        match self {
            Self::Latitude => ("N", "S"),
            Self::Longitude => ("E", "W"),
        }
    }

    fn tags(self) -> (Tag, Tag) {
        match self {
            Self::Latitude => (Tag::GPSLatitude, Tag::GPSLatitudeRef),
            Self::Longitude => (Tag::GPSLongitude, Tag::GPSLongitudeRef),
        }
    }
}

fn parse_quietly(blob: &[u8]) -> Option<Exif> {
    match parse(blob) {
        Ok(exif) => Some(exif),
        Err(e) => {
            warn!("Could not parse stored EXIF: {}", e);
            None
        }
    }
}

/// First ASCII string of a field, with trailing NULs and padding removed
fn ascii_value(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(strings) => {
            let first = strings.first()?;
            let text = std::str::from_utf8(first).ok()?;
            Some(text.trim_end_matches('\0').trim().to_string())
        }
        _ => None,
    }
}

/// The original capture date/time as recorded in the file
pub fn taken_timestamp(blob: &[u8]) -> Option<String> {
    let exif = parse_quietly(blob)?;
    let text = ascii_value(&exif, Tag::DateTimeOriginal)?;

    // Malformed timestamps are reported as absent
    NaiveDateTime::parse_from_str(&text, EXIF_DATETIME_FORMAT).ok()?;
    Some(text)
}

/// The original capture date/time, parsed
pub fn taken_at(blob: &[u8]) -> Option<NaiveDateTime> {
    let text = taken_timestamp(blob)?;
    NaiveDateTime::parse_from_str(&text, EXIF_DATETIME_FORMAT).ok()
}

/// Convert a degrees/minutes/seconds triple to decimal degrees.
///
/// Returns `None` unless exactly three components are given, or if any
/// component has a zero denominator.
pub fn dms_to_decimal(dms: &[Rational]) -> Option<f64> {
    let [degrees, minutes, seconds] = dms else {
        return None;
    };

    if [degrees, minutes, seconds].iter().any(|r| r.denom == 0) {
        return None;
    }

    Some(degrees.to_f64() + minutes.to_f64() / 60.0 + seconds.to_f64() / 3600.0)
}

/// Decimal degrees, negated for the southern or western hemisphere.
///
/// Any reference other than the two valid ones for `axis` yields `None`.
pub fn signed_decimal(dms: &[Rational], reference: &str, axis: Axis) -> Option<f64> {
    let decimal = dms_to_decimal(dms)?;
    let (positive, negative) = axis.hemispheres();

    match reference.trim() {
        r if r.eq_ignore_ascii_case(positive) => Some(decimal),
        r if r.eq_ignore_ascii_case(negative) => Some(-decimal),
        _ => None,
    }
}

fn coordinate(exif: &Exif, axis: Axis) -> Option<f64> {
    let (value_tag, ref_tag) = axis.tags();

    let dms = match &exif.get_field(value_tag, In::PRIMARY)?.value {
        Value::Rational(parts) => parts,
        _ => return None,
    };
    let reference = ascii_value(exif, ref_tag)?;

    signed_decimal(dms, &reference, axis)
}

/// Latitude and longitude in signed decimal degrees.
///
/// All four GPS fields (both values and both hemisphere references) must be
/// present and well formed; otherwise the view is absent.
pub fn gps_coordinates(blob: &[u8]) -> Option<(f64, f64)> {
    let exif = parse_quietly(blob)?;
    let latitude = coordinate(&exif, Axis::Latitude)?;
    let longitude = coordinate(&exif, Axis::Longitude)?;
    Some((latitude, longitude))
}
