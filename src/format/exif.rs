//! EXIF/TIFF IFD parsing for JPEG APP1 segments.
//!
//! An APP1 segment carries a complete TIFF structure: a byte order mark, a
//! magic number, and a chain of image file directories (IFDs) whose entries
//! are typed tag/value pairs. This parser extracts only the tags the probe
//! cares about - orientation, and the offset/length of the embedded
//! thumbnail - and skips everything else without error.
//!
//! All offsets inside the TIFF structure are relative to the TIFF header,
//! which sits [`TIFF_BASE`] bytes into the segment window (2 marker bytes,
//! 2 size bytes, and the 6-byte `Exif\0\0` signature).

use crate::error::FormatError;
use crate::io::{ByteOrder, ByteWindow, RangeReader};

/// Offset of the TIFF header within an APP1 segment window.
pub(crate) const TIFF_BASE: usize = 10;

/// TIFF magic number, right after the byte order mark.
const TIFF_MAGIC: u16 = 42;

/// Size of one IFD entry in bytes (tag + type + count + value/offset).
const IFD_ENTRY_LEN: usize = 12;

// Tags worth keeping. Everything else is skipped.
const TAG_ORIENTATION: u16 = 274;
const TAG_THUMBNAIL_OFFSET: u16 = 513;
const TAG_THUMBNAIL_LENGTH: u16 = 514;

/// Byte size of one value for each TIFF field type (1..=12).
/// Index 0 is unused.
const TYPE_SIZES: [usize; 13] = [0, 1, 1, 2, 4, 8, 1, 1, 2, 4, 8, 4, 8];

// =============================================================================
// ExifValue
// =============================================================================

/// A decoded EXIF tag value.
///
/// Numeric TIFF types all collapse into `f64` (RATIONAL and SRATIONAL are
/// returned as the numerator/denominator quotient, a floating-point
/// approximation). ASCII values are decoded byte-per-char with no multi-byte
/// awareness, matching the legacy EXIF convention.
#[derive(Debug, Clone, PartialEq)]
pub enum ExifValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

impl ExifValue {
    /// The value as a u16, if it is a whole number in range.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            ExifValue::Number(n) if n.fract() == 0.0 && (0.0..=65535.0).contains(n) => {
                Some(*n as u16)
            }
            _ => None,
        }
    }

    /// The value as a u32, if it is a whole number in range.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ExifValue::Number(n) if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(n) => {
                Some(*n as u32)
            }
            _ => None,
        }
    }
}

// =============================================================================
// ExifSummary
// =============================================================================

/// The tags extracted from an EXIF segment.
///
/// The first occurrence of each tag wins; IFD1 cannot override a tag that
/// IFD0 already supplied.
#[derive(Debug, Default)]
pub struct ExifSummary {
    pub orientation: Option<ExifValue>,
    pub thumbnail_offset: Option<ExifValue>,
    pub thumbnail_length: Option<ExifValue>,
}

impl ExifSummary {
    /// The orientation code, if present.
    ///
    /// A value that is not a whole number in u16 range cannot match any
    /// defined orientation; the error carries the offending value.
    pub fn orientation_code(&self) -> Result<Option<u16>, FormatError> {
        match &self.orientation {
            None => Ok(None),
            Some(v) => match v.as_u16() {
                Some(code) => Ok(Some(code)),
                None => Err(FormatError::InvalidOrientationValue(format!("{:?}", v))),
            },
        }
    }

    /// TIFF-relative offset and byte length of the embedded thumbnail.
    ///
    /// Present only when both tags were found; a dangling offset without a
    /// length (or vice versa) yields `None`.
    pub fn thumbnail(&self) -> Option<(u32, u32)> {
        let offset = self.thumbnail_offset.as_ref()?.as_u32()?;
        let length = self.thumbnail_length.as_ref()?.as_u32()?;
        Some((offset, length))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse the EXIF data in an APP1 segment window.
///
/// The window must be anchored at the segment's 0xFF marker byte with all
/// segment bytes resident. Parses IFD0, then IFD1 if its pointer is
/// non-zero (the thumbnail tags commonly live in IFD1).
pub(crate) fn parse_exif_segment<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
) -> Result<ExifSummary, FormatError> {
    let order = match window.get_u8(TIFF_BASE)? {
        0x4D => ByteOrder::BigEndian,
        0x49 => ByteOrder::LittleEndian,
        other => return Err(FormatError::InvalidByteOrder(other)),
    };

    let magic = window.get_u16_with(TIFF_BASE + 2, order)?;
    if magic != TIFF_MAGIC {
        return Err(FormatError::BadMagicNumber(magic));
    }

    let ifd0 = window.get_u32_with(TIFF_BASE + 4, order)? as usize;

    let mut summary = ExifSummary::default();
    parse_ifd(window, ifd0 + TIFF_BASE, order, &mut summary)?;

    // The IFD1 pointer sits right after IFD0's entry table.
    let ifd0_entries = window.get_u16_with(ifd0 + TIFF_BASE, order)? as usize;
    let ifd1_ptr = ifd0 + TIFF_BASE + 2 + IFD_ENTRY_LEN * ifd0_entries;
    let ifd1 = window.get_u32_with(ifd1_ptr, order)? as usize;
    if ifd1 != 0 {
        parse_ifd(window, ifd1 + TIFF_BASE, order, &mut summary)?;
    }

    Ok(summary)
}

/// Parse one IFD's entries into the summary.
fn parse_ifd<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
    offset: usize,
    order: ByteOrder,
    summary: &mut ExifSummary,
) -> Result<(), FormatError> {
    let num_entries = window.get_u16_with(offset, order)? as usize;
    for i in 0..num_entries {
        parse_entry(window, offset + 2 + IFD_ENTRY_LEN * i, order, summary)?;
    }
    Ok(())
}

/// Parse a single 12-byte IFD entry, keeping it only if its tag is wanted.
fn parse_entry<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
    offset: usize,
    order: ByteOrder,
    summary: &mut ExifSummary,
) -> Result<(), FormatError> {
    let tag = window.get_u16_with(offset, order)?;
    let slot = match tag {
        TAG_ORIENTATION => &mut summary.orientation,
        TAG_THUMBNAIL_OFFSET => &mut summary.thumbnail_offset,
        TAG_THUMBNAIL_LENGTH => &mut summary.thumbnail_length,
        _ => return Ok(()),
    };
    if slot.is_some() {
        return Ok(());
    }

    let field_type = window.get_u16_with(offset + 2, order)?;
    let type_size = match TYPE_SIZES.get(field_type as usize) {
        Some(&s) if s > 0 => s,
        _ => return Err(FormatError::UnknownFieldType(field_type)),
    };
    let count = window.get_u32_with(offset + 4, order)? as usize;

    let total = count
        .checked_mul(type_size)
        .ok_or(FormatError::UnknownFieldType(field_type))?;
    let value_offset = if total <= 4 {
        // Inline: the value lives in the entry's value field itself
        offset + 8
    } else {
        // Indirect: the value field holds a TIFF-relative offset
        window.get_u32_with(offset + 8, order)? as usize + TIFF_BASE
    };

    // The whole value must be resident in the segment window. Checking up
    // front bounds the allocation below by the window size; a forged count
    // must not size a buffer.
    window.get_bytes(value_offset, total)?;

    *slot = Some(parse_value(window, value_offset, field_type, count, order)?);
    Ok(())
}

/// Decode a tag value at the given window offset.
fn parse_value<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
    offset: usize,
    field_type: u16,
    count: usize,
    order: ByteOrder,
) -> Result<ExifValue, FormatError> {
    if field_type == 2 {
        // ASCII: count includes the null terminator, which is dropped
        return Ok(ExifValue::Text(
            window.get_ascii(offset, count.saturating_sub(1))?,
        ));
    }

    if count == 1 {
        return Ok(ExifValue::Number(parse_one(
            window, offset, field_type, order,
        )?));
    }

    let size = TYPE_SIZES[field_type as usize];
    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        values.push(parse_one(window, offset + size * i, field_type, order)?);
    }
    Ok(ExifValue::Numbers(values))
}

/// Decode a single scalar of the given TIFF type.
fn parse_one<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
    offset: usize,
    field_type: u16,
    order: ByteOrder,
) -> Result<f64, FormatError> {
    let value = match field_type {
        1 | 7 => window.get_u8(offset)? as f64, // BYTE, UNDEFINED
        3 => window.get_u16_with(offset, order)? as f64, // SHORT
        4 => window.get_u32_with(offset, order)? as f64, // LONG
        5 => {
            // RATIONAL: quotient, not an exact rational
            let num = window.get_u32_with(offset, order)? as f64;
            let den = window.get_u32_with(offset + 4, order)? as f64;
            num / den
        }
        6 => window.get_i8(offset)? as f64,              // SBYTE
        8 => window.get_i16_with(offset, order)? as f64, // SSHORT
        9 => window.get_i32_with(offset, order)? as f64, // SLONG
        10 => {
            // SRATIONAL
            let num = window.get_i32_with(offset, order)? as f64;
            let den = window.get_i32_with(offset + 4, order)? as f64;
            num / den
        }
        11 => window.get_f32_with(offset, order)? as f64, // FLOAT
        12 => window.get_f64_with(offset, order)?,        // DOUBLE
        other => return Err(FormatError::UnknownFieldType(other)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryRangeReader;

    /// Build an APP1 segment carrying a minimal EXIF block.
    ///
    /// `entries` are raw 12-byte IFD0 entries; `ifd1` optionally appends a
    /// second IFD with its own raw entries.
    pub(crate) fn build_app1(
        order: ByteOrder,
        entries: &[[u8; 12]],
        ifd1: Option<&[[u8; 12]]>,
    ) -> Vec<u8> {
        let mut tiff = Vec::new();
        match order {
            ByteOrder::BigEndian => tiff.extend_from_slice(&[0x4D, 0x4D]),
            ByteOrder::LittleEndian => tiff.extend_from_slice(&[0x49, 0x49]),
        }
        let u16_bytes = |v: u16| match order {
            ByteOrder::BigEndian => v.to_be_bytes(),
            ByteOrder::LittleEndian => v.to_le_bytes(),
        };
        let u32_bytes = |v: u32| match order {
            ByteOrder::BigEndian => v.to_be_bytes(),
            ByteOrder::LittleEndian => v.to_le_bytes(),
        };

        tiff.extend_from_slice(&u16_bytes(42));
        tiff.extend_from_slice(&u32_bytes(8)); // IFD0 right after the header

        // IFD0
        tiff.extend_from_slice(&u16_bytes(entries.len() as u16));
        for e in entries {
            tiff.extend_from_slice(e);
        }
        let ifd1_offset = if ifd1.is_some() {
            // IFD1 directly after IFD0's next-IFD pointer
            (tiff.len() + 4) as u32
        } else {
            0
        };
        tiff.extend_from_slice(&u32_bytes(ifd1_offset));

        if let Some(entries) = ifd1 {
            tiff.extend_from_slice(&u16_bytes(entries.len() as u16));
            for e in entries {
                tiff.extend_from_slice(e);
            }
            tiff.extend_from_slice(&u32_bytes(0));
        }

        // Wrap in the APP1 segment: marker, type, size, "Exif\0\0", TIFF
        let size = (2 + 6 + tiff.len()) as u16;
        let mut segment = vec![0xFF, 0xE1];
        segment.extend_from_slice(&size.to_be_bytes());
        segment.extend_from_slice(b"Exif\0\0");
        segment.extend_from_slice(&tiff);
        segment
    }

    /// A 12-byte SHORT entry with an inline value.
    pub(crate) fn short_entry(order: ByteOrder, tag: u16, value: u16) -> [u8; 12] {
        let mut e = [0u8; 12];
        let (tag_b, type_b, count_b, value_b) = match order {
            ByteOrder::BigEndian => (
                tag.to_be_bytes(),
                3u16.to_be_bytes(),
                1u32.to_be_bytes(),
                value.to_be_bytes(),
            ),
            ByteOrder::LittleEndian => (
                tag.to_le_bytes(),
                3u16.to_le_bytes(),
                1u32.to_le_bytes(),
                value.to_le_bytes(),
            ),
        };
        e[0..2].copy_from_slice(&tag_b);
        e[2..4].copy_from_slice(&type_b);
        e[4..8].copy_from_slice(&count_b);
        e[8..10].copy_from_slice(&value_b);
        e
    }

    /// A 12-byte LONG entry with an inline value.
    pub(crate) fn long_entry(order: ByteOrder, tag: u16, value: u32) -> [u8; 12] {
        let mut e = [0u8; 12];
        let (tag_b, type_b, count_b, value_b) = match order {
            ByteOrder::BigEndian => (
                tag.to_be_bytes(),
                4u16.to_be_bytes(),
                1u32.to_be_bytes(),
                value.to_be_bytes(),
            ),
            ByteOrder::LittleEndian => (
                tag.to_le_bytes(),
                4u16.to_le_bytes(),
                1u32.to_le_bytes(),
                value.to_le_bytes(),
            ),
        };
        e[0..2].copy_from_slice(&tag_b);
        e[2..4].copy_from_slice(&type_b);
        e[4..8].copy_from_slice(&count_b);
        e[8..12].copy_from_slice(&value_b);
        e
    }

    async fn parse(segment: Vec<u8>) -> Result<ExifSummary, FormatError> {
        let len = segment.len() as u64;
        let source = MemoryRangeReader::new(segment);
        let window = ByteWindow::open(&source, 0, len, ByteOrder::BigEndian)
            .await
            .unwrap();
        parse_exif_segment(&window)
    }

    #[tokio::test]
    async fn test_orientation_big_endian() {
        let order = ByteOrder::BigEndian;
        let segment = build_app1(order, &[short_entry(order, TAG_ORIENTATION, 6)], None);
        let summary = parse(segment).await.unwrap();
        assert_eq!(summary.orientation_code().unwrap(), Some(6));
        assert!(summary.thumbnail().is_none());
    }

    #[tokio::test]
    async fn test_orientation_little_endian() {
        let order = ByteOrder::LittleEndian;
        let segment = build_app1(order, &[short_entry(order, TAG_ORIENTATION, 3)], None);
        let summary = parse(segment).await.unwrap();
        assert_eq!(summary.orientation_code().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_byte_order() {
        let order = ByteOrder::BigEndian;
        let mut segment = build_app1(order, &[], None);
        segment[TIFF_BASE] = 0x00;
        let err = parse(segment).await.unwrap_err();
        assert!(matches!(err, FormatError::InvalidByteOrder(0x00)));
    }

    #[tokio::test]
    async fn test_bad_magic_number() {
        let order = ByteOrder::BigEndian;
        let mut segment = build_app1(order, &[], None);
        // Overwrite the magic 42 with 43
        segment[TIFF_BASE + 2] = 0x00;
        segment[TIFF_BASE + 3] = 43;
        let err = parse(segment).await.unwrap_err();
        assert!(matches!(err, FormatError::BadMagicNumber(43)));
    }

    #[tokio::test]
    async fn test_thumbnail_tags_in_ifd1() {
        let order = ByteOrder::BigEndian;
        let ifd1 = [
            long_entry(order, TAG_THUMBNAIL_OFFSET, 1000),
            long_entry(order, TAG_THUMBNAIL_LENGTH, 2500),
        ];
        let segment = build_app1(order, &[short_entry(order, TAG_ORIENTATION, 1)], Some(&ifd1));
        let summary = parse(segment).await.unwrap();
        assert_eq!(summary.thumbnail(), Some((1000, 2500)));
    }

    #[tokio::test]
    async fn test_thumbnail_requires_both_tags() {
        let order = ByteOrder::BigEndian;
        let ifd1 = [long_entry(order, TAG_THUMBNAIL_OFFSET, 1000)];
        let segment = build_app1(order, &[], Some(&ifd1));
        let summary = parse(segment).await.unwrap();
        assert!(summary.thumbnail().is_none());
    }

    #[tokio::test]
    async fn test_unknown_tags_skipped() {
        let order = ByteOrder::BigEndian;
        let segment = build_app1(
            order,
            &[
                short_entry(order, 256, 640), // ImageWidth: not in the table
                short_entry(order, TAG_ORIENTATION, 8),
            ],
            None,
        );
        let summary = parse(segment).await.unwrap();
        assert_eq!(summary.orientation_code().unwrap(), Some(8));
    }

    #[tokio::test]
    async fn test_first_tag_occurrence_wins() {
        let order = ByteOrder::BigEndian;
        let segment = build_app1(
            order,
            &[
                short_entry(order, TAG_ORIENTATION, 6),
                short_entry(order, TAG_ORIENTATION, 3),
            ],
            None,
        );
        let summary = parse(segment).await.unwrap();
        assert_eq!(summary.orientation_code().unwrap(), Some(6));
    }

    #[tokio::test]
    async fn test_non_integral_orientation_carries_value() {
        // FLOAT orientation 6.5 can match no defined code; the error must
        // name the value it saw
        let order = ByteOrder::BigEndian;
        let mut entry = [0u8; 12];
        entry[0..2].copy_from_slice(&TAG_ORIENTATION.to_be_bytes());
        entry[2..4].copy_from_slice(&11u16.to_be_bytes()); // FLOAT
        entry[4..8].copy_from_slice(&1u32.to_be_bytes());
        entry[8..12].copy_from_slice(&6.5f32.to_be_bytes());
        let segment = build_app1(order, &[entry], None);
        let summary = parse(segment).await.unwrap();
        let err = summary.orientation_code().unwrap_err();
        assert!(
            matches!(&err, FormatError::InvalidOrientationValue(v) if v.contains("6.5")),
            "unexpected error: {}",
            err
        );
    }

    #[tokio::test]
    async fn test_forged_value_count_rejected() {
        // count * type_size far beyond the segment; decoding must fail on
        // the bounds check, not attempt a 34 GB buffer
        let order = ByteOrder::BigEndian;
        let mut entry = [0u8; 12];
        entry[0..2].copy_from_slice(&TAG_ORIENTATION.to_be_bytes());
        entry[2..4].copy_from_slice(&12u16.to_be_bytes()); // DOUBLE
        entry[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        // bytes 8..12: indirect offset 0
        let segment = build_app1(order, &[entry], None);
        let err = parse(segment).await.unwrap_err();
        assert!(err.is_truncation(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_unknown_field_type_fails() {
        let order = ByteOrder::BigEndian;
        let mut entry = short_entry(order, TAG_ORIENTATION, 1);
        entry[2..4].copy_from_slice(&13u16.to_be_bytes()); // type 13 is undefined
        let segment = build_app1(order, &[entry], None);
        let err = parse(segment).await.unwrap_err();
        assert!(matches!(err, FormatError::UnknownFieldType(13)));
    }

    #[test]
    fn test_exif_value_conversions() {
        assert_eq!(ExifValue::Number(6.0).as_u16(), Some(6));
        assert_eq!(ExifValue::Number(6.5).as_u16(), None);
        assert_eq!(ExifValue::Number(-1.0).as_u16(), None);
        assert_eq!(ExifValue::Number(70000.0).as_u16(), None);
        assert_eq!(ExifValue::Number(70000.0).as_u32(), Some(70000));
        assert_eq!(ExifValue::Text("x".into()).as_u16(), None);
    }
}
