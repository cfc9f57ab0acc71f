//! Windowed, cursor-based reading over a [`RangeReader`].
//!
//! A [`ByteWindow`] materializes one contiguous byte range of a source and
//! offers synchronous, bounds-checked reads within it. When a parser needs
//! bytes outside the current window it calls [`ByteWindow::fetch`], which is
//! a zero-copy reslice if the range is already resident and an async range
//! request otherwise. Parsers therefore suspend only when bytes genuinely
//! have to come from the source.

use bytes::Bytes;

use crate::error::WindowError;

use super::{ByteOrder, RangeReader};

/// Default initial window for format probing (16 KiB).
///
/// Large enough that typical JPEG headers (including the EXIF APP1 segment)
/// resolve without a second range request.
pub const DEFAULT_PROBE_WINDOW: u64 = 16 * 1024;

/// A materialized byte range of a [`RangeReader`] with a read cursor.
///
/// The window tracks three layers:
/// - the *slice*: the bytes actually fetched from the source,
/// - the *view*: the sub-range of the slice that reads are bounded to,
/// - the *cursor*: the position the `read_*` methods advance through.
///
/// A cursor sitting exactly at the end of the view is valid (it means the
/// view is fully consumed); reading or seeking past the end is an error.
pub struct ByteWindow<'a, R: RangeReader + ?Sized> {
    source: &'a R,
    /// Absolute offset of the slice within the source.
    slice_offset: u64,
    slice: Bytes,
    /// Start of the view within the slice.
    view_offset: usize,
    view_len: usize,
    byte_order: ByteOrder,
    index: usize,
}

impl<R: RangeReader + ?Sized> std::fmt::Debug for ByteWindow<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteWindow")
            .field("source", &self.source.identifier())
            .field("slice_offset", &self.slice_offset)
            .field("slice_len", &self.slice.len())
            .field("view_offset", &self.view_offset)
            .field("view_len", &self.view_len)
            .field("byte_order", &self.byte_order)
            .field("index", &self.index)
            .finish()
    }
}

impl<'a, R: RangeReader + ?Sized> ByteWindow<'a, R> {
    /// Materialize a window of `length` bytes at `offset`.
    ///
    /// Errors if `offset` lies past the end of the source. A `length` that
    /// overruns the source is clamped down, not rejected, so callers can ask
    /// for a fixed-size header without checking the file size first.
    pub async fn open(
        source: &'a R,
        offset: u64,
        mut length: u64,
        byte_order: ByteOrder,
    ) -> Result<ByteWindow<'a, R>, WindowError> {
        let size = source.size();
        if offset > size {
            return Err(WindowError::OffsetPastEnd { offset, size });
        }
        // min, not subtraction on the sum: `offset + length` may overflow
        // for attacker-controlled lengths
        length = length.min(size - offset);

        let slice = source.read_exact_at(offset, length as usize).await?;

        Ok(ByteWindow {
            source,
            slice_offset: offset,
            slice,
            view_offset: 0,
            view_len: length as usize,
            byte_order,
            index: 0,
        })
    }

    /// Get a window over `[offset, offset + length)` of the source.
    ///
    /// If the range is already resident in the current slice this is a
    /// zero-copy reslice and completes without I/O. Otherwise it falls back
    /// to [`ByteWindow::open`] against the source. The returned window
    /// supersedes `self` for the current parse step.
    pub async fn fetch(
        &self,
        offset: u64,
        length: u64,
    ) -> Result<ByteWindow<'a, R>, WindowError> {
        let slice_end = self.slice_offset + self.slice.len() as u64;
        let resident = offset >= self.slice_offset
            && offset
                .checked_add(length)
                .is_some_and(|end| end <= slice_end);
        if resident {
            return Ok(ByteWindow {
                source: self.source,
                slice_offset: self.slice_offset,
                slice: self.slice.clone(),
                view_offset: (offset - self.slice_offset) as usize,
                view_len: length as usize,
                byte_order: self.byte_order,
                index: 0,
            });
        }
        ByteWindow::open(self.source, offset, length, self.byte_order).await
    }

    /// Number of bytes in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.view_len
    }

    /// True if the view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.view_len == 0
    }

    /// Absolute offset of the view's first byte within the source.
    #[inline]
    pub fn absolute_offset(&self) -> u64 {
        self.slice_offset + self.view_offset as u64
    }

    /// Default byte order for multi-byte reads.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Change the default byte order for subsequent reads.
    #[inline]
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = order;
    }

    // =========================================================================
    // Bounds checking
    // =========================================================================

    /// Map a view-relative range to a slice range, or fail.
    fn checked(&self, at: usize, len: usize, op: &'static str) -> Result<usize, WindowError> {
        match at.checked_add(len) {
            Some(end) if end <= self.view_len => Ok(self.view_offset + at),
            _ => Err(WindowError::OutOfBounds {
                op,
                offset: at as i64,
                len,
                window_len: self.view_len,
            }),
        }
    }

    /// Borrow `len` bytes of the view starting at `at`.
    pub fn get_bytes(&self, at: usize, len: usize) -> Result<&[u8], WindowError> {
        let start = self.checked(at, len, "byte read")?;
        Ok(&self.slice[start..start + len])
    }

    // =========================================================================
    // Absolute-offset readers
    // =========================================================================

    pub fn get_u8(&self, at: usize) -> Result<u8, WindowError> {
        Ok(self.get_bytes(at, 1)?[0])
    }

    pub fn get_i8(&self, at: usize) -> Result<i8, WindowError> {
        Ok(self.get_u8(at)? as i8)
    }

    /// Test a single bit of the byte at `at`.
    pub fn get_bit(&self, at: usize, bit: u8) -> Result<bool, WindowError> {
        Ok(self.get_u8(at)? & (1 << bit) != 0)
    }

    pub fn get_u16(&self, at: usize) -> Result<u16, WindowError> {
        self.get_u16_with(at, self.byte_order)
    }

    pub fn get_u16_with(&self, at: usize, order: ByteOrder) -> Result<u16, WindowError> {
        Ok(order.read_u16(self.get_bytes(at, 2)?))
    }

    pub fn get_i16(&self, at: usize) -> Result<i16, WindowError> {
        self.get_i16_with(at, self.byte_order)
    }

    pub fn get_i16_with(&self, at: usize, order: ByteOrder) -> Result<i16, WindowError> {
        Ok(order.read_i16(self.get_bytes(at, 2)?))
    }

    pub fn get_u32(&self, at: usize) -> Result<u32, WindowError> {
        self.get_u32_with(at, self.byte_order)
    }

    pub fn get_u32_with(&self, at: usize, order: ByteOrder) -> Result<u32, WindowError> {
        Ok(order.read_u32(self.get_bytes(at, 4)?))
    }

    pub fn get_i32(&self, at: usize) -> Result<i32, WindowError> {
        self.get_i32_with(at, self.byte_order)
    }

    pub fn get_i32_with(&self, at: usize, order: ByteOrder) -> Result<i32, WindowError> {
        Ok(order.read_i32(self.get_bytes(at, 4)?))
    }

    pub fn get_u64(&self, at: usize) -> Result<u64, WindowError> {
        self.get_u64_with(at, self.byte_order)
    }

    pub fn get_u64_with(&self, at: usize, order: ByteOrder) -> Result<u64, WindowError> {
        Ok(order.read_u64(self.get_bytes(at, 8)?))
    }

    pub fn get_f32(&self, at: usize) -> Result<f32, WindowError> {
        self.get_f32_with(at, self.byte_order)
    }

    pub fn get_f32_with(&self, at: usize, order: ByteOrder) -> Result<f32, WindowError> {
        Ok(order.read_f32(self.get_bytes(at, 4)?))
    }

    pub fn get_f64(&self, at: usize) -> Result<f64, WindowError> {
        self.get_f64_with(at, self.byte_order)
    }

    pub fn get_f64_with(&self, at: usize, order: ByteOrder) -> Result<f64, WindowError> {
        Ok(order.read_f64(self.get_bytes(at, 8)?))
    }

    /// Read a 24-bit unsigned integer.
    pub fn get_u24(&self, at: usize) -> Result<u32, WindowError> {
        self.get_u24_with(at, self.byte_order)
    }

    pub fn get_u24_with(&self, at: usize, order: ByteOrder) -> Result<u32, WindowError> {
        let b = self.get_bytes(at, 3)?;
        let (lo, mid, hi) = match order {
            ByteOrder::LittleEndian => (b[0], b[1], b[2]),
            ByteOrder::BigEndian => (b[2], b[1], b[0]),
        };
        Ok(((hi as u32) << 16) | ((mid as u32) << 8) | lo as u32)
    }

    /// Read an ID3v2 synchsafe integer: 4 bytes, the high bit of each byte
    /// ignored, combined into a 28-bit big-endian value.
    ///
    /// This masking is specific to the ID3v2 convention. It must not be used
    /// as a substitute for an ordinary 32-bit read.
    pub fn get_id3_u28(&self, at: usize) -> Result<u32, WindowError> {
        let b = self.get_bytes(at, 4)?;
        Ok(((b[0] as u32 & 0x7F) << 21)
            | ((b[1] as u32 & 0x7F) << 14)
            | ((b[2] as u32 & 0x7F) << 7)
            | (b[3] as u32 & 0x7F))
    }

    // =========================================================================
    // Cursor control
    // =========================================================================

    /// Current cursor position within the view.
    #[inline]
    pub fn tell(&self) -> usize {
        self.index
    }

    /// Bytes remaining between the cursor and the end of the view.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.view_len - self.index
    }

    /// Move the cursor to an absolute view position.
    ///
    /// `seek(len())` is valid and marks the view as fully consumed.
    pub fn seek(&mut self, pos: usize) -> Result<(), WindowError> {
        if pos > self.view_len {
            return Err(WindowError::OutOfBounds {
                op: "seek",
                offset: pos as i64,
                len: 0,
                window_len: self.view_len,
            });
        }
        self.index = pos;
        Ok(())
    }

    /// Move the cursor by a signed delta.
    pub fn advance(&mut self, n: i64) -> Result<(), WindowError> {
        let target = self.index as i64 + n;
        if target < 0 || target > self.view_len as i64 {
            return Err(WindowError::OutOfBounds {
                op: "advance",
                offset: target,
                len: 0,
                window_len: self.view_len,
            });
        }
        self.index = target as usize;
        Ok(())
    }

    // =========================================================================
    // Cursor-relative readers
    // =========================================================================

    pub fn read_u8(&mut self) -> Result<u8, WindowError> {
        let v = self.get_u8(self.index)?;
        self.index += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8, WindowError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, WindowError> {
        self.read_u16_with(self.byte_order)
    }

    pub fn read_u16_with(&mut self, order: ByteOrder) -> Result<u16, WindowError> {
        let v = self.get_u16_with(self.index, order)?;
        self.index += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16, WindowError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, WindowError> {
        self.read_u32_with(self.byte_order)
    }

    pub fn read_u32_with(&mut self, order: ByteOrder) -> Result<u32, WindowError> {
        let v = self.get_u32_with(self.index, order)?;
        self.index += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32, WindowError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, WindowError> {
        let v = self.get_u64(self.index)?;
        self.index += 8;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32, WindowError> {
        let v = self.get_f32(self.index)?;
        self.index += 4;
        Ok(v)
    }

    pub fn read_f64(&mut self) -> Result<f64, WindowError> {
        let v = self.get_f64(self.index)?;
        self.index += 8;
        Ok(v)
    }

    pub fn read_u24(&mut self) -> Result<u32, WindowError> {
        let v = self.get_u24(self.index)?;
        self.index += 3;
        Ok(v)
    }

    pub fn read_id3_u28(&mut self) -> Result<u32, WindowError> {
        let v = self.get_id3_u28(self.index)?;
        self.index += 4;
        Ok(v)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], WindowError> {
        let start = self.checked(self.index, len, "byte read")?;
        self.index += len;
        Ok(&self.slice[start..start + len])
    }

    // =========================================================================
    // String readers
    // =========================================================================

    /// Read `len` bytes as ASCII/Latin-1, one char per byte.
    pub fn get_ascii(&self, at: usize, len: usize) -> Result<String, WindowError> {
        let bytes = self.get_bytes(at, len)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    pub fn read_ascii(&mut self, len: usize) -> Result<String, WindowError> {
        let s = self.get_ascii(self.index, len)?;
        self.index += len;
        Ok(s)
    }

    /// Decode `len` bytes as UTF-8 with a strict validator.
    ///
    /// Rejects continuation bytes where a lead byte is expected, overlong and
    /// out-of-range lead bytes (0x80..0xC2, 0xF5..), and truncated sequences.
    /// Handles 1-4 byte sequences including supplementary-plane characters.
    pub fn get_utf8(&self, at: usize, len: usize) -> Result<String, WindowError> {
        let bytes = self.get_bytes(at, len)?;
        let bad = |i: usize, b: u8| WindowError::InvalidUtf8 {
            offset: at + i,
            byte: b,
        };
        let cont = |i: usize| -> Result<u32, WindowError> {
            let b = bytes[i];
            if !(0x80..=0xBF).contains(&b) {
                return Err(bad(i, b));
            }
            Ok(b as u32 & 0x3F)
        };

        let mut s = String::new();
        let mut pos = 0;
        while pos < len {
            let b1 = bytes[pos];
            let (code, width) = if b1 < 0x80 {
                (b1 as u32, 1)
            } else if b1 < 0xC2 {
                // continuation byte or overlong lead where a lead is expected
                return Err(bad(pos, b1));
            } else if b1 < 0xE0 {
                if pos + 1 >= len {
                    return Err(bad(pos, b1));
                }
                (((b1 as u32 & 0x1F) << 6) | cont(pos + 1)?, 2)
            } else if b1 < 0xF0 {
                if pos + 2 >= len {
                    return Err(bad(pos, b1));
                }
                (
                    ((b1 as u32 & 0x0F) << 12) | (cont(pos + 1)? << 6) | cont(pos + 2)?,
                    3,
                )
            } else if b1 < 0xF5 {
                if pos + 3 >= len {
                    return Err(bad(pos, b1));
                }
                (
                    ((b1 as u32 & 0x07) << 18)
                        | (cont(pos + 1)? << 12)
                        | (cont(pos + 2)? << 6)
                        | cont(pos + 3)?,
                    4,
                )
            } else {
                return Err(bad(pos, b1));
            };

            // Surrogate code points and values past U+10FFFF have no char
            // representation and are rejected rather than substituted.
            s.push(char::from_u32(code).ok_or_else(|| bad(pos, b1))?);
            pos += width;
        }
        Ok(s)
    }

    /// Cursor-relative [`get_utf8`](Self::get_utf8).
    ///
    /// The cursor moves past the field even when decoding fails, so a caller
    /// that tolerates one bad string field can keep parsing the rest.
    pub fn read_utf8(&mut self, len: usize) -> Result<String, WindowError> {
        let result = self.get_utf8(self.index, len);
        self.index = (self.index + len).min(self.view_len);
        result
    }

    /// Read Latin-1 bytes up to and including a null terminator, but never
    /// more than `max` bytes.
    pub fn read_null_terminated_latin1(&mut self, max: usize) -> Result<String, WindowError> {
        let mut s = String::new();
        let mut i = 0;
        while i < max {
            let b = self.get_u8(self.index + i)?;
            i += 1;
            if b == 0 {
                break;
            }
            s.push(b as char);
        }
        self.index += i;
        Ok(s)
    }

    /// Read UTF-8 bytes up to a null terminator, but never more than `max`
    /// bytes. The terminator, if found, is consumed but not returned.
    pub fn read_null_terminated_utf8(&mut self, max: usize) -> Result<String, WindowError> {
        let mut len = 0;
        while len < max {
            if self.get_u8(self.index + len)? == 0 {
                break;
            }
            len += 1;
        }
        let s = self.read_utf8(len)?;
        if len < max {
            self.advance(1)?;
        }
        Ok(s)
    }

    /// Read UTF-16 text up to a null terminator, but never more than `max`
    /// bytes. If `order` is `None`, a leading BOM decides the endianness
    /// (0xFEFF read in the window's default order means big-endian).
    pub fn read_null_terminated_utf16(
        &mut self,
        mut max: usize,
        order: Option<ByteOrder>,
    ) -> Result<String, WindowError> {
        let order = match order {
            Some(o) => o,
            None => {
                let bom = self.read_u16()?;
                max = max.saturating_sub(2);
                if bom == 0xFEFF {
                    ByteOrder::BigEndian
                } else {
                    ByteOrder::LittleEndian
                }
            }
        };

        let mut units = Vec::new();
        let mut i = 0;
        while i + 2 <= max {
            let unit = self.get_u16_with(self.index + i, order)?;
            i += 2;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        self.index += i;
        Ok(String::from_utf16_lossy(&units))
    }
}
