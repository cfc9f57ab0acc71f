use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a media resource.
///
/// This abstraction lets the metadata parsers work with files without
/// downloading them entirely. Implementations must be thread-safe; the
/// parsers only ever hold shared references to a reader.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging).
    ///
    /// For S3, this would typically be `s3://bucket/key`.
    fn identifier(&self) -> &str;
}

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// EXIF/TIFF data can be either little-endian or big-endian, determined by
// the byte order mark inside the segment. JPEG segment headers and MP4 atom
// headers are always big-endian. These helpers are used extensively by the
// ByteWindow readers.

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a big-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a little-endian f32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_f32_le(bytes: &[u8]) -> f32 {
    f32::from_bits(read_u32_le(bytes))
}

/// Read a big-endian f32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_f32_be(bytes: &[u8]) -> f32 {
    f32::from_bits(read_u32_be(bytes))
}

/// Read a little-endian f64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_f64_le(bytes: &[u8]) -> f64 {
    f64::from_bits(read_u64_le(bytes))
}

/// Read a big-endian f64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_f64_be(bytes: &[u8]) -> f64 {
    f64::from_bits(read_u64_be(bytes))
}

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) for multi-byte reads.
///
/// EXIF segments declare their byte order in the TIFF header; all multi-byte
/// values in that segment must be read respecting it. JPEG and MP4 container
/// structures are always big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read an i16 from a byte slice using this byte order.
    #[inline]
    pub fn read_i16(self, bytes: &[u8]) -> i16 {
        self.read_u16(bytes) as i16
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read an i32 from a byte slice using this byte order.
    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        self.read_u32(bytes) as i32
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    /// Read an f32 from a byte slice using this byte order.
    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        match self {
            ByteOrder::LittleEndian => read_f32_le(bytes),
            ByteOrder::BigEndian => read_f32_be(bytes),
        }
    }

    /// Read an f64 from a byte slice using this byte order.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        match self {
            ByteOrder::LittleEndian => read_f64_le(bytes),
            ByteOrder::BigEndian => read_f64_be(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_le() {
        // 0x0102 in little-endian is stored as [0x02, 0x01]
        assert_eq!(read_u16_le(&[0x02, 0x01]), 0x0102);
        assert_eq!(read_u16_le(&[0x00, 0x00]), 0x0000);
        assert_eq!(read_u16_le(&[0xFF, 0xFF]), 0xFFFF);
    }

    #[test]
    fn test_read_u16_be() {
        // 0x0102 in big-endian is stored as [0x01, 0x02]
        assert_eq!(read_u16_be(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_u16_be(&[0x00, 0x00]), 0x0000);
        assert_eq!(read_u16_be(&[0xFF, 0xFF]), 0xFFFF);
    }

    #[test]
    fn test_read_u32_le() {
        assert_eq!(read_u32_le(&[0x04, 0x03, 0x02, 0x01]), 0x01020304);
        assert_eq!(read_u32_le(&[0xFF, 0xFF, 0xFF, 0xFF]), 0xFFFFFFFF);
    }

    #[test]
    fn test_read_u32_be() {
        assert_eq!(read_u32_be(&[0x01, 0x02, 0x03, 0x04]), 0x01020304);
        assert_eq!(read_u32_be(&[0xFF, 0xFF, 0xFF, 0xFF]), 0xFFFFFFFF);
    }

    #[test]
    fn test_read_u64() {
        assert_eq!(
            read_u64_le(&[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]),
            0x0102030405060708
        );
        assert_eq!(
            read_u64_be(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
            0x0102030405060708
        );
    }

    #[test]
    fn test_byte_order_u16() {
        let bytes = [0x01, 0x02];
        assert_eq!(ByteOrder::LittleEndian.read_u16(&bytes), 0x0201);
        assert_eq!(ByteOrder::BigEndian.read_u16(&bytes), 0x0102);
    }

    #[test]
    fn test_byte_order_signed() {
        let bytes = [0xFF, 0xFF];
        assert_eq!(ByteOrder::BigEndian.read_i16(&bytes), -1);
        let bytes = [0xFF, 0xFF, 0xFF, 0xFE];
        assert_eq!(ByteOrder::BigEndian.read_i32(&bytes), -2);
    }

    #[test]
    fn test_byte_order_floats() {
        let bytes = 1.5f32.to_be_bytes();
        assert_eq!(ByteOrder::BigEndian.read_f32(&bytes), 1.5);
        let bytes = (-2.25f64).to_le_bytes();
        assert_eq!(ByteOrder::LittleEndian.read_f64(&bytes), -2.25);
    }
}
