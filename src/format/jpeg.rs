//! JPEG segment walk.
//!
//! A JPEG stream is a flat sequence of marker segments. The walk hops from
//! segment header to segment header, fetching each segment's bytes on
//! demand, until it reaches a start-of-frame segment carrying the pixel
//! dimensions. Along the way it decodes any EXIF APP1 segment for the
//! display orientation and the byte range of the embedded preview image.

use tracing::{debug, trace};

use crate::error::FormatError;
use crate::io::{ByteOrder, ByteWindow, RangeReader, DEFAULT_PROBE_WINDOW};
use crate::metadata::{orientation_to_rotation, ImageKind, ImageMetadata, PreviewRange, Rotation};

use super::exif::{parse_exif_segment, TIFF_BASE};

/// Start-of-image marker, `FF D8`.
const SOI: u16 = 0xFFD8;

/// `"Exif"` as a big-endian u32, identifying an EXIF APP1 payload.
const EXIF_SIGNATURE: u32 = 0x4578_6966;

/// EXIF state accumulated across APP1 segments before the frame header is
/// reached.
#[derive(Default)]
struct ExifState {
    rotation: Option<(Rotation, bool)>,
    preview: Option<PreviewRange>,
}

/// Walk the segments of a JPEG stream and extract its metadata.
///
/// Stops at the first start-of-frame segment (SOF0 through SOF3), which
/// holds the dimensions. An EXIF APP1 segment seen before the frame header
/// contributes the rotation, mirroring, and preview range; without one the
/// result is upright and previewless.
///
/// # Errors
/// - [`FormatError::NotJpeg`] if the stream does not start with `FF D8`
/// - [`FormatError::BadSegmentHeader`] if a segment does not start with the
///   `FF` marker byte
/// - [`FormatError::Truncated`] if the stream ends before a frame header
/// - Any EXIF decoding error from an APP1 segment
pub async fn parse_jpeg<R: RangeReader + ?Sized>(source: &R) -> Result<ImageMetadata, FormatError> {
    let mut window = ByteWindow::open(
        source,
        0,
        DEFAULT_PROBE_WINDOW.min(source.size()),
        ByteOrder::BigEndian,
    )
    .await?;

    if window.len() < 2 || window.get_u16(0)? != SOI {
        return Err(FormatError::NotJpeg);
    }

    let mut exif = ExifState::default();
    // Window-relative offset of the next segment header. After the first
    // iteration the window is re-anchored at each segment's marker byte.
    let mut offset = 2usize;

    loop {
        let marker = window.get_u8(offset)?;
        if marker != 0xFF {
            return Err(FormatError::BadSegmentHeader(marker));
        }
        let segment_type = window.get_u8(offset + 1)?;
        // Declared payload length plus the 2 marker bytes
        let size = window.get_u16(offset + 2)? as usize + 2;

        let start = window.absolute_offset() + offset as u64;
        let is_last = start + size as u64 >= source.size();

        // Re-anchor at the segment start. Unless this is the final segment,
        // over-fetch 4 bytes so the next header is already resident.
        let fetch_len = if is_last { size } else { size + 4 };
        window = window.fetch(start, fetch_len as u64).await?;

        trace!(
            source = %source.identifier(),
            segment = segment_type,
            start,
            size,
            "JPEG segment"
        );

        match segment_type {
            // SOF0-SOF3: baseline/extended/progressive/lossless frame header
            0xC0..=0xC3 => {
                let height = window.get_u16(5)? as u32;
                let width = window.get_u16(7)? as u32;
                let (rotation, mirrored) = exif.rotation.unwrap_or((Rotation::Deg0, false));
                debug!(
                    source = %source.identifier(),
                    width,
                    height,
                    rotation = %rotation,
                    "JPEG frame header"
                );
                return Ok(ImageMetadata {
                    kind: ImageKind::Jpeg,
                    width,
                    height,
                    rotation,
                    mirrored,
                    preview: exif.preview,
                });
            }
            _ => {
                if segment_type == 0xE1
                    && size >= 8
                    && window.get_u32(4)? == EXIF_SIGNATURE
                {
                    apply_exif_segment(&window, &mut exif)?;
                }
                if is_last {
                    return Err(FormatError::Truncated("unexpected end of JPEG file"));
                }
                offset = size;
            }
        }
    }
}

/// Decode an EXIF APP1 segment and fold it into the accumulated state.
///
/// The window must be anchored at the segment's marker byte. The preview
/// range is translated from TIFF-relative to absolute source offsets here,
/// while the window still knows where the segment sits.
fn apply_exif_segment<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
    exif: &mut ExifState,
) -> Result<(), FormatError> {
    let summary = parse_exif_segment(window)?;

    let (rotation, mirrored) = orientation_to_rotation(summary.orientation_code()?)?;
    exif.rotation = Some((rotation, mirrored));

    if let Some((offset, length)) = summary.thumbnail() {
        if length > 0 {
            let start = window.absolute_offset() + TIFF_BASE as u64 + offset as u64;
            exif.preview = Some(PreviewRange {
                start,
                end: start + length as u64,
            });
        }
    }
    Ok(())
}
