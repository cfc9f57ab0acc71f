use thiserror::Error;

/// I/O errors that can occur when reading from a byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Error reading from the local filesystem
    #[error("File error: {0}")]
    File(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Errors raised by ByteWindow reads and cursor moves
#[derive(Debug, Clone, Error)]
pub enum WindowError {
    /// I/O error while materializing a window
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Read, seek, or advance past the bounds of the window
    #[error("{op} out of bounds: offset {offset}, length {len}, window size {window_len}")]
    OutOfBounds {
        op: &'static str,
        offset: i64,
        len: usize,
        window_len: usize,
    },

    /// Malformed UTF-8 byte sequence in a string read
    #[error("Illegal UTF-8 byte 0x{byte:02X} at window offset {offset}")]
    InvalidUtf8 { offset: usize, byte: u8 },

    /// A window open was attempted past the end of the source
    #[error("Window offset {offset} larger than source size {size}")]
    OffsetPastEnd { offset: u64, size: u64 },
}

impl WindowError {
    /// True if the error means the source simply had fewer bytes than the
    /// parse needed, as opposed to carrying corrupt data.
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            WindowError::OutOfBounds { .. }
                | WindowError::OffsetPastEnd { .. }
                | WindowError::Io(IoError::RangeOutOfBounds { .. })
        )
    }
}

/// Errors related to parsing image and video containers
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Window-level read failure (out of bounds, bad UTF-8)
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Fewer bytes available than needed; may be a partial download
    #[error("Truncated file: {0}")]
    Truncated(&'static str),

    /// The leading bytes match none of the supported image formats
    #[error("Unknown image type")]
    UnknownImageType,

    /// Missing SOI marker at the start of a JPEG stream
    #[error("Not a JPEG file")]
    NotJpeg,

    /// JPEG segment does not begin with the 0xFF marker byte
    #[error("Malformed JPEG file: bad segment header 0x{0:02X}")]
    BadSegmentHeader(u8),

    /// Invalid byte order mark in an EXIF segment (not 'I' or 'M')
    #[error("Invalid byteorder in EXIF segment: 0x{0:02X}")]
    InvalidByteOrder(u8),

    /// TIFF magic number inside the EXIF segment is not 42
    #[error("Bad magic number in EXIF segment: {0}")]
    BadMagicNumber(u16),

    /// TIFF field type outside the defined 1-12 range
    #[error("Unknown EXIF field type: {0}")]
    UnknownFieldType(u16),

    /// EXIF orientation code outside the defined 1-8 range
    #[error("Unknown EXIF orientation code: {0}")]
    UnknownOrientation(u16),

    /// EXIF orientation tag holds something other than a small whole number
    #[error("Invalid EXIF orientation value: {0}")]
    InvalidOrientationValue(String),

    /// Missing 'ftyp' box at the start of an MP4 stream
    #[error("Not an MP4 file")]
    NotMp4,

    /// Atom declares a size smaller than its own header
    #[error("Atom '{kind}' declares invalid size {size}")]
    BadAtomSize { kind: String, size: u64 },

    /// tkhd matrix is not one of the four recognized rotations
    #[error("Unexpected rotation matrix")]
    UnexpectedRotationMatrix,
}

impl FormatError {
    /// True if the failure indicates a partially-available file rather than a
    /// corrupt one. Callers may retry once more bytes exist.
    pub fn is_truncation(&self) -> bool {
        match self {
            FormatError::Truncated(_) => true,
            FormatError::Window(e) => e.is_truncation(),
            FormatError::Io(IoError::RangeOutOfBounds { .. }) => true,
            _ => false,
        }
    }
}
