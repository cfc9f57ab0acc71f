//! Format parsers for media metadata.
//!
//! Each parser drives a [`ByteWindow`](crate::io::ByteWindow) over a
//! [`RangeReader`](crate::io::RangeReader), fetching only the byte ranges it
//! needs. Entry points:
//!
//! - [`probe_image`] - detect GIF/PNG/JPEG and extract dimensions
//! - [`parse_jpeg`] - walk JPEG segments for dimensions, EXIF orientation,
//!   and the embedded preview range
//! - [`parse_video_rotation`] - walk MP4 atoms for the track rotation

mod exif;
mod jpeg;
mod mp4;
mod probe;

pub use exif::{ExifSummary, ExifValue};
pub use jpeg::parse_jpeg;
pub use mp4::{
    parse_video_rotation, walk_atoms, Atom, AtomAction, AtomVisitor, FourCc, Walk, WalkOutcome,
};
pub use probe::probe_image;
