//! Image format detection and dimension extraction.
//!
//! The probe reads one small leading window and decides the format from
//! magic bytes. GIF and PNG store their dimensions at fixed offsets in that
//! window; JPEG requires a segment walk and is delegated to
//! [`parse_jpeg`](super::parse_jpeg).
//!
//! An unrecognized format is reported as
//! [`FormatError::UnknownImageType`], which callers may treat as "try a
//! generic decoder" rather than as corruption.

use tracing::debug;

use crate::error::FormatError;
use crate::io::{ByteOrder, ByteWindow, RangeReader, DEFAULT_PROBE_WINDOW};
use crate::metadata::{ImageKind, ImageMetadata};

use super::jpeg::parse_jpeg;

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Detect the image format and extract its pixel dimensions.
///
/// Reads at most [`DEFAULT_PROBE_WINDOW`] bytes up front; GIF and PNG
/// resolve entirely within that window, JPEG continues with its own segment
/// walk over the same source.
///
/// # Errors
/// - [`FormatError::Truncated`] if fewer than 9 bytes are available
/// - [`FormatError::UnknownImageType`] if the magic bytes match no
///   supported format
/// - Any error from the JPEG segment walk
pub async fn probe_image<R: RangeReader + ?Sized>(
    source: &R,
) -> Result<ImageMetadata, FormatError> {
    let window = ByteWindow::open(
        source,
        0,
        DEFAULT_PROBE_WINDOW.min(source.size()),
        ByteOrder::BigEndian,
    )
    .await?;

    // The magic check needs the first 8 bytes plus at least one byte of
    // content behind them.
    if window.len() <= 8 {
        return Err(FormatError::Truncated("corrupt image file"));
    }

    let mut magic = [0u8; 8];
    magic.copy_from_slice(window.get_bytes(0, 8)?);

    if &magic[0..4] == b"GIF8" {
        debug!(source = %source.identifier(), "detected GIF");
        // GIF dimensions are little-endian
        return Ok(ImageMetadata::new(
            ImageKind::Gif,
            window.get_u16_with(6, ByteOrder::LittleEndian)? as u32,
            window.get_u16_with(8, ByteOrder::LittleEndian)? as u32,
        ));
    }

    if magic == PNG_SIGNATURE {
        debug!(source = %source.identifier(), "detected PNG");
        // Width and height sit in the IHDR chunk, big-endian
        return Ok(ImageMetadata::new(
            ImageKind::Png,
            window.get_u32_with(16, ByteOrder::BigEndian)?,
            window.get_u32_with(20, ByteOrder::BigEndian)?,
        ));
    }

    if magic[0..2] == [0xFF, 0xD8] {
        debug!(source = %source.identifier(), "detected JPEG");
        return parse_jpeg(source).await;
    }

    Err(FormatError::UnknownImageType)
}
