//! End-to-end probe tests.
//!
//! These tests drive the public API over synthesized media:
//! - image detection and dimensions for GIF, PNG, and JPEG
//! - EXIF orientation and preview extraction from JPEG APP1 segments
//! - MP4 track rotation from the tkhd matrix
//! - truncation classification for partial files
//! - file-backed sources via `FileRangeReader`

use std::io::Write;

use media_probe::{
    parse_video_rotation, probe_image, FileRangeReader, FormatError, ImageKind,
    MemoryRangeReader, Rotation,
};

// =============================================================================
// Media builders
// =============================================================================

fn gif(width: u16, height: u16) -> Vec<u8> {
    let mut data = b"GIF89a".to_vec();
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&[0u8; 32]);
    data
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
    data.extend_from_slice(&[0, 0, 0, 13]);
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data
}

/// A SOF0 frame header segment.
fn sof0(width: u16, height: u16) -> Vec<u8> {
    let mut s = vec![0xFF, 0xC0, 0x00, 0x0B, 8];
    s.extend_from_slice(&height.to_be_bytes());
    s.extend_from_slice(&width.to_be_bytes());
    s.extend_from_slice(&[3, 0, 0, 0]);
    s
}

/// An EXIF APP1 segment (big-endian TIFF) with the orientation tag and
/// optionally the IFD1 thumbnail offset/length tags.
fn app1_exif(orientation: u16, thumbnail: Option<(u32, u32)>) -> Vec<u8> {
    let mut tiff: Vec<u8> = vec![0x4D, 0x4D, 0x00, 42];
    tiff.extend_from_slice(&8u32.to_be_bytes());

    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&274u16.to_be_bytes());
    tiff.extend_from_slice(&3u16.to_be_bytes());
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);

    let ifd1_offset = if thumbnail.is_some() {
        (tiff.len() + 4) as u32
    } else {
        0
    };
    tiff.extend_from_slice(&ifd1_offset.to_be_bytes());

    if let Some((offset, length)) = thumbnail {
        tiff.extend_from_slice(&2u16.to_be_bytes());
        for (tag, value) in [(513u16, offset), (514u16, length)] {
            tiff.extend_from_slice(&tag.to_be_bytes());
            tiff.extend_from_slice(&4u16.to_be_bytes());
            tiff.extend_from_slice(&1u32.to_be_bytes());
            tiff.extend_from_slice(&value.to_be_bytes());
        }
        tiff.extend_from_slice(&0u32.to_be_bytes());
    }

    let mut s = vec![0xFF, 0xE1];
    s.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    s.extend_from_slice(b"Exif\0\0");
    s.extend_from_slice(&tiff);
    s
}

fn jpeg(width: u16, height: u16, app1: Option<Vec<u8>>) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    if let Some(app1) = app1 {
        data.extend(app1);
    }
    data.extend(sof0(width, height));
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn mp4_atom(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut a = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    a.extend_from_slice(kind);
    a.extend_from_slice(payload);
    a
}

fn mp4(matrix: [u32; 4]) -> Vec<u8> {
    let mut tkhd = vec![0u8; 40];
    let [a, b, c, d] = matrix;
    for cell in [a, b, 0, c, d, 0, 0, 0, 0x4000_0000] {
        tkhd.extend_from_slice(&cell.to_be_bytes());
    }
    tkhd.extend_from_slice(&[0u8; 20]);

    let mut data = mp4_atom(b"ftyp", b"isom\0\0\0\x01isommp42");
    data.extend(mp4_atom(b"mdat", &[0u8; 512]));
    let trak = mp4_atom(b"trak", &mp4_atom(b"tkhd", &tkhd));
    data.extend(mp4_atom(b"moov", &trak));
    data
}

const ONE: u32 = 0x0001_0000;
const NEG_ONE: u32 = 0xFFFF_0000;

// =============================================================================
// Image probing
// =============================================================================

#[tokio::test]
async fn test_gif_probe() {
    let source = MemoryRangeReader::new(gif(320, 240));
    let meta = probe_image(&source).await.unwrap();
    assert_eq!(meta.kind, ImageKind::Gif);
    assert_eq!((meta.width, meta.height), (320, 240));
}

#[tokio::test]
async fn test_png_probe() {
    let source = MemoryRangeReader::new(png(1920, 1080));
    let meta = probe_image(&source).await.unwrap();
    assert_eq!(meta.kind, ImageKind::Png);
    assert_eq!((meta.width, meta.height), (1920, 1080));
}

#[tokio::test]
async fn test_jpeg_with_orientation() {
    let source = MemoryRangeReader::new(jpeg(640, 480, Some(app1_exif(6, None))));
    let meta = probe_image(&source).await.unwrap();
    assert_eq!(meta.kind, ImageKind::Jpeg);
    assert_eq!((meta.width, meta.height), (640, 480));
    assert_eq!(meta.rotation, Rotation::Deg90);
    assert!(!meta.mirrored);
    assert!(meta.preview.is_none());
}

#[tokio::test]
async fn test_jpeg_preview_range_points_into_file() {
    let app1 = app1_exif(1, Some((300, 120)));
    let source = MemoryRangeReader::new(jpeg(64, 64, Some(app1)));
    let meta = probe_image(&source).await.unwrap();

    let preview = meta.preview.unwrap();
    // APP1 starts at byte 2 (right after SOI); the thumbnail offset is
    // relative to the TIFF header 10 bytes into the segment.
    assert_eq!(preview.start, 2 + 10 + 300);
    assert_eq!(preview.len(), 120);
}

#[tokio::test]
async fn test_soi_only_jpeg_is_truncation() {
    let source = MemoryRangeReader::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49]);
    let err = probe_image(&source).await.unwrap_err();
    assert!(err.is_truncation(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_unknown_format() {
    let source = MemoryRangeReader::new(b"RIFF\x10\x00\x00\x00WEBPVP8 ".to_vec());
    let err = probe_image(&source).await.unwrap_err();
    assert!(matches!(err, FormatError::UnknownImageType));
    assert!(!err.is_truncation());
}

// =============================================================================
// Video probing
// =============================================================================

#[tokio::test]
async fn test_mp4_identity_rotation() {
    let source = MemoryRangeReader::new(mp4([ONE, 0, 0, ONE]));
    assert_eq!(
        parse_video_rotation(&source).await.unwrap(),
        Some(Rotation::Deg0)
    );
}

#[tokio::test]
async fn test_mp4_portrait_rotation() {
    let source = MemoryRangeReader::new(mp4([0, ONE, NEG_ONE, 0]));
    assert_eq!(
        parse_video_rotation(&source).await.unwrap(),
        Some(Rotation::Deg90)
    );
}

#[tokio::test]
async fn test_mp4_without_moov() {
    let mut data = mp4_atom(b"ftyp", b"isom\0\0\0\x01isommp42");
    data.extend(mp4_atom(b"mdat", &[0u8; 256]));
    let source = MemoryRangeReader::new(data);
    assert_eq!(parse_video_rotation(&source).await.unwrap(), None);
}

#[tokio::test]
async fn test_image_probe_rejects_mp4() {
    let source = MemoryRangeReader::new(mp4([ONE, 0, 0, ONE]));
    let err = probe_image(&source).await.unwrap_err();
    assert!(matches!(err, FormatError::UnknownImageType));
}

// =============================================================================
// File-backed sources
// =============================================================================

#[tokio::test]
async fn test_probe_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&jpeg(800, 600, Some(app1_exif(3, None))))
        .unwrap();
    file.flush().unwrap();

    let reader = FileRangeReader::open(file.path()).await.unwrap();
    let meta = probe_image(&reader).await.unwrap();
    assert_eq!(meta.kind, ImageKind::Jpeg);
    assert_eq!((meta.width, meta.height), (800, 600));
    assert_eq!(meta.rotation, Rotation::Deg180);
}

#[tokio::test]
async fn test_video_rotation_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&mp4([NEG_ONE, 0, 0, NEG_ONE])).unwrap();
    file.flush().unwrap();

    let reader = FileRangeReader::open(file.path()).await.unwrap();
    assert_eq!(
        parse_video_rotation(&reader).await.unwrap(),
        Some(Rotation::Deg180)
    );
}

#[tokio::test]
async fn test_missing_file() {
    let err = FileRangeReader::open("/nonexistent/media.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, media_probe::IoError::NotFound(_)));
}
