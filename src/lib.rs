//! # media-probe
//!
//! Extract image and video metadata from media in S3-compatible object
//! storage or on the local filesystem.
//!
//! This library parses media format headers over byte-range reads. It never
//! downloads a whole file: a probe fetches a small leading window and then
//! hops directly to the byte ranges the headers occupy, which makes it cheap
//! to inspect large uploads (camera videos, full-resolution photos) in
//! place.
//!
//! ## Features
//!
//! - **Range-based parsing**: Fetches only the bytes the format headers
//!   occupy, via HTTP range requests for S3 sources
//! - **Format support**: GIF and PNG dimensions; JPEG dimensions, EXIF
//!   orientation, and embedded preview location; MP4 track rotation
//! - **Pluggable sources**: S3/MinIO, local files, and in-memory buffers
//!   behind one async trait
//! - **Truncation-aware errors**: A probe over a partial upload fails with
//!   an error that says "too few bytes", distinct from corruption, so
//!   callers can retry once more bytes exist
//!
//! ## Architecture
//!
//! - [`io`] - range readers and the windowed byte reader
//! - [`mod@format`] - GIF/PNG/JPEG/EXIF/MP4 parsers
//! - [`metadata`] - parse result records
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust
//! use media_probe::{probe_image, MemoryRangeReader};
//!
//! #[tokio::main]
//! async fn main() {
//!     let data: Vec<u8> = std::fs::read("photo.jpg").unwrap_or_default();
//!     let source = MemoryRangeReader::new(data);
//!
//!     match probe_image(&source).await {
//!         Ok(meta) => println!(
//!             "{} {}x{}, rotated {}",
//!             meta.kind.name(),
//!             meta.width,
//!             meta.height,
//!             meta.rotation
//!         ),
//!         Err(e) => eprintln!("probe failed: {}", e),
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod metadata;

// Re-export commonly used types
pub use config::{Cli, Command, MediaType, OutputFormat, ProbeConfig};
pub use error::{FormatError, IoError, WindowError};
pub use format::{
    parse_jpeg, parse_video_rotation, probe_image, walk_atoms, Atom, AtomAction, AtomVisitor,
    ExifSummary, ExifValue, FourCc, Walk, WalkOutcome,
};
pub use io::{
    create_s3_client, ByteOrder, ByteWindow, FileRangeReader, MemoryRangeReader, RangeReader,
    S3RangeReader, DEFAULT_PROBE_WINDOW,
};
pub use metadata::{
    orientation_to_rotation, ImageKind, ImageMetadata, PreviewRange, Rotation,
};
