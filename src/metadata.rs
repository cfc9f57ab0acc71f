//! Parse result records.
//!
//! These are the plain values the parsers hand back to callers: which format
//! the file is, its pixel dimensions, how the decoded pixels must be rotated
//! and mirrored for display, and where an embedded EXIF preview lives.

use serde::Serialize;

use crate::error::FormatError;

// =============================================================================
// ImageKind
// =============================================================================

/// Detected image container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
}

impl ImageKind {
    /// Stable lowercase name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            ImageKind::Gif => "gif",
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
        }
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Display rotation in degrees, clockwise.
///
/// This is a closed set: any value derived from a file that does not map to
/// one of these four is a parse error, never silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rotation {
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// Rotation as degrees.
    pub const fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

// =============================================================================
// Orientation mapping
// =============================================================================

/// Map an EXIF orientation code (tag 274) to a rotation/mirror pair.
///
/// `None` (tag absent) defaults to upright and unmirrored. Codes outside
/// 1..=8 are a fatal error for the parse.
pub fn orientation_to_rotation(
    code: Option<u16>,
) -> Result<(Rotation, bool), FormatError> {
    match code {
        None | Some(1) => Ok((Rotation::Deg0, false)),
        Some(2) => Ok((Rotation::Deg0, true)),
        Some(3) => Ok((Rotation::Deg180, false)),
        Some(4) => Ok((Rotation::Deg180, true)),
        Some(5) => Ok((Rotation::Deg90, true)),
        Some(6) => Ok((Rotation::Deg90, false)),
        Some(7) => Ok((Rotation::Deg270, true)),
        Some(8) => Ok((Rotation::Deg270, false)),
        Some(other) => Err(FormatError::UnknownOrientation(other)),
    }
}

// =============================================================================
// Metadata records
// =============================================================================

/// Absolute byte range of an embedded preview image within the source.
///
/// The caller can slice this range out of the original object and feed it
/// back through the JPEG parser, or hand it to a decoder directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreviewRange {
    pub start: u64,
    pub end: u64,
}

impl PreviewRange {
    /// Length of the preview in bytes.
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Metadata extracted from an image file without decoding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    /// Detected container format.
    #[serde(rename = "type")]
    pub kind: ImageKind,

    /// Image width in pixels, as stored (before orientation is applied).
    pub width: u32,

    /// Image height in pixels, as stored.
    pub height: u32,

    /// Display rotation from EXIF orientation; `Deg0` for formats without
    /// orientation data.
    pub rotation: Rotation,

    /// Whether the image is mirrored horizontally before rotation.
    pub mirrored: bool,

    /// Byte range of the embedded EXIF preview image, if both the thumbnail
    /// offset and length tags were present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewRange>,
}

impl ImageMetadata {
    /// Upright, unmirrored metadata with no preview.
    pub fn new(kind: ImageKind, width: u32, height: u32) -> Self {
        Self {
            kind,
            width,
            height,
            rotation: Rotation::Deg0,
            mirrored: false,
            preview: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_table_complete() {
        let expected = [
            (1u16, Rotation::Deg0, false),
            (2, Rotation::Deg0, true),
            (3, Rotation::Deg180, false),
            (4, Rotation::Deg180, true),
            (5, Rotation::Deg90, true),
            (6, Rotation::Deg90, false),
            (7, Rotation::Deg270, true),
            (8, Rotation::Deg270, false),
        ];
        for (code, rotation, mirrored) in expected {
            assert_eq!(
                orientation_to_rotation(Some(code)).unwrap(),
                (rotation, mirrored),
                "orientation code {}",
                code
            );
        }
    }

    #[test]
    fn test_orientation_absent_defaults_upright() {
        assert_eq!(
            orientation_to_rotation(None).unwrap(),
            (Rotation::Deg0, false)
        );
    }

    #[test]
    fn test_orientation_out_of_range_fails() {
        for code in [0u16, 9, 100] {
            assert!(matches!(
                orientation_to_rotation(Some(code)),
                Err(FormatError::UnknownOrientation(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_rotation_degrees() {
        assert_eq!(Rotation::Deg0.degrees(), 0);
        assert_eq!(Rotation::Deg90.degrees(), 90);
        assert_eq!(Rotation::Deg180.degrees(), 180);
        assert_eq!(Rotation::Deg270.degrees(), 270);
    }

    #[test]
    fn test_preview_range_len() {
        let range = PreviewRange { start: 100, end: 350 };
        assert_eq!(range.len(), 250);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_metadata_serializes_kind_as_type() {
        let meta = ImageMetadata::new(ImageKind::Jpeg, 640, 480);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "jpeg");
        assert_eq!(json["width"], 640);
        assert!(json.get("preview").is_none());
    }
}
