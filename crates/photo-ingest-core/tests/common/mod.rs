#![allow(dead_code)]

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use photo_ingest_core::Config;

/// Config rooted entirely inside a test directory
pub fn test_config(root: &Path) -> Config {
    Config {
        preview_root: root.join("large"),
        database_path: root.join("db").join("photos.db"),
        ..Config::default()
    }
}

/// Deterministic 8x8 grid of colour blocks, independent of output size
pub fn block_image(seed: u64, width: u32, height: u32) -> DynamicImage {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    let cells: Vec<Rgb<u8>> = (0..64)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let b = (state >> 33).to_le_bytes();
            Rgb([b[0], b[1], b[2]])
        })
        .collect();

    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let cx = (x * 8 / width).min(7);
        let cy = (y * 8 / height).min(7);
        cells[(cy * 8 + cx) as usize]
    }))
}

pub fn write_png(dir: &Path, name: &str, seed: u64, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    block_image(seed, width, height)
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"this is not an image at all").unwrap();
    path
}

fn primary(tag: Tag, value: Value) -> Field {
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

/// Camera-style EXIF: capture time, GPS 40°26'46"N 79°58'56"W, a bulky
/// maker note and a user comment
pub fn camera_exif() -> Vec<u8> {
    let fields = vec![
        primary(Tag::Make, ascii("Canon")),
        primary(Tag::DateTimeOriginal, ascii("2023:07:14 18:30:05")),
        primary(Tag::MakerNote, Value::Undefined(vec![0x5A; 4096], 0)),
        primary(
            Tag::UserComment,
            Value::Undefined(b"ASCII\0\0\0Beach day".to_vec(), 0),
        ),
        primary(Tag::GPSLatitudeRef, ascii("N")),
        primary(Tag::GPSLatitude, dms(40, 26, 46)),
        primary(Tag::GPSLongitudeRef, ascii("W")),
        primary(Tag::GPSLongitude, dms(79, 58, 56)),
    ];

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, false).unwrap();
    out.into_inner()
}

/// Write a JPEG carrying `tiff` in an APP1 `Exif` segment
pub fn write_jpeg_with_exif(dir: &Path, name: &str, seed: u64, tiff: &[u8]) -> PathBuf {
    let mut jpeg = Vec::new();
    block_image(seed, 160, 120)
        .write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(90))
        .unwrap();

    let length = (2 + 6 + tiff.len()) as u16;
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);

    let path = dir.join(name);
    fs::write(&path, out).unwrap();
    path
}
