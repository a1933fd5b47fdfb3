//! Fixture builders shared by the unit tests.

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Cells per side of the block pattern
const GRID: u32 = 8;

/// A deterministic image of GRID×GRID flat colour blocks.
///
/// The pattern is independent of the output size, so the same seed rendered
/// at two sizes is the same picture.
pub fn block_image(seed: u64, width: u32, height: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut cells = Vec::with_capacity((GRID * GRID) as usize);
    for _ in 0..GRID * GRID {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let bytes = (state >> 24).to_le_bytes();
        cells.push(Rgb([bytes[0], bytes[1], bytes[2]]));
    }

    let img = RgbImage::from_fn(width, height, |x, y| {
        let cx = (x * GRID / width).min(GRID - 1);
        let cy = (y * GRID / height).min(GRID - 1);
        cells[(cy * GRID + cx) as usize]
    });
    DynamicImage::ImageRgb8(img)
}

/// Write a block image as PNG
pub fn write_png(dir: &Path, name: &str, seed: u64, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    block_image(seed, width, height)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

/// Which variant of the GPS block to write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GpsFixture {
    #[default]
    Complete,
    MissingLongitudeRef,
    ZeroDenominator,
}

/// Fields to include in a generated EXIF payload
#[derive(Debug, Clone)]
pub struct ExifFixture {
    pub date_time_original: Option<String>,
    pub maker_note: bool,
    pub user_comment: bool,
    pub thumbnail: bool,
    pub gps: bool,
    pub gps_fixture: GpsFixture,
}

impl Default for ExifFixture {
    fn default() -> Self {
        Self {
            date_time_original: Some("2023:07:14 18:30:05".to_string()),
            maker_note: false,
            user_comment: false,
            thumbnail: false,
            gps: false,
            gps_fixture: GpsFixture::Complete,
        }
    }
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn dms(d: u32, m: u32, s: u32) -> Value {
    Value::Rational(vec![
        Rational { num: d, denom: 1 },
        Rational { num: m, denom: 1 },
        Rational { num: s, denom: 1 },
    ])
}

/// Build a TIFF-structured EXIF payload
pub fn exif_fixture(fixture: &ExifFixture) -> Vec<u8> {
    let mut fields = vec![
        field(Tag::Make, ascii("Canon")),
        field(Tag::Model, ascii("EOS 5D")),
    ];

    if let Some(date) = &fixture.date_time_original {
        fields.push(field(Tag::DateTimeOriginal, ascii(date)));
    }
    if fixture.maker_note {
        fields.push(field(Tag::MakerNote, Value::Undefined(vec![0xAB; 2048], 0)));
    }
    if fixture.user_comment {
        let mut comment = b"ASCII\0\0\0".to_vec();
        comment.extend_from_slice(b"Holiday in the mountains");
        fields.push(field(Tag::UserComment, Value::Undefined(comment, 0)));
    }
    if fixture.gps {
        let latitude = match fixture.gps_fixture {
            GpsFixture::ZeroDenominator => Value::Rational(vec![
                Rational { num: 40, denom: 1 },
                Rational { num: 26, denom: 0 },
                Rational { num: 46, denom: 1 },
            ]),
            _ => dms(40, 26, 46),
        };
        fields.push(field(Tag::GPSLatitudeRef, ascii("N")));
        fields.push(field(Tag::GPSLatitude, latitude));
        if fixture.gps_fixture != GpsFixture::MissingLongitudeRef {
            fields.push(field(Tag::GPSLongitudeRef, ascii("W")));
        }
        fields.push(field(Tag::GPSLongitude, dms(79, 58, 56)));
    }

    let thumbnail_field;
    let thumbnail_jpeg;
    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    if fixture.thumbnail {
        thumbnail_field = Field {
            tag: Tag::Compression,
            ifd_num: In::THUMBNAIL,
            value: Value::Short(vec![6]),
        };
        writer.push_field(&thumbnail_field);

        let mut jpeg = Vec::new();
        block_image(99, 16, 16)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageOutputFormat::Jpeg(80))
            .unwrap();
        thumbnail_jpeg = jpeg;
        writer.set_jpeg(&thumbnail_jpeg, In::THUMBNAIL);
    }

    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, false).unwrap();
    out.into_inner()
}

/// Splice a TIFF payload into a JPEG as an APP1 `Exif` segment
pub fn splice_exif(jpeg: &[u8], tiff: &[u8]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let length = (2 + 6 + tiff.len()) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// A block-image JPEG carrying `tiff` as its EXIF payload
pub fn jpeg_with_exif(seed: u64, width: u32, height: u32, tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = Vec::new();
    block_image(seed, width, height)
        .write_to(&mut Cursor::new(&mut jpeg), image::ImageOutputFormat::Jpeg(90))
        .unwrap();
    splice_exif(&jpeg, tiff)
}
