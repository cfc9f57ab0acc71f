//! MP4/QuickTime atom walk.
//!
//! An MP4 file is a tree of atoms (also called boxes). Each atom starts
//! with a 32-bit size and a four-character code; container atoms hold child
//! atoms in their payload. The walker visits atoms in file order, descending
//! into a container only when the visitor asks, so a probe touches just the
//! handful of byte ranges it actually needs.

use std::fmt;

use tracing::{debug, trace};

use crate::error::FormatError;
use crate::io::{ByteOrder, ByteWindow, RangeReader, DEFAULT_PROBE_WINDOW};
use crate::metadata::Rotation;

/// Window for the leading `ftyp` check.
const FTYP_PROBE_WINDOW: u64 = 1024;

// =============================================================================
// FourCc
// =============================================================================

/// A four-character atom code such as `moov` or `tkhd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const FTYP: FourCc = FourCc(*b"ftyp");
    pub const MOOV: FourCc = FourCc(*b"moov");
    pub const TRAK: FourCc = FourCc(*b"trak");
    pub const TKHD: FourCc = FourCc(*b"tkhd");
    pub const META: FourCc = FourCc(*b"meta");
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            // Non-printable bytes do occur in malformed files; keep the
            // rendering unambiguous for error messages.
            if (0x20..0x7F).contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Walk machinery
// =============================================================================

/// One atom encountered during a walk.
#[derive(Debug, Clone, Copy)]
pub struct Atom {
    /// Four-character code.
    pub kind: FourCc,
    /// Absolute offset of the atom's size field within the source.
    pub offset: u64,
    /// Total atom size in bytes, header included. Resolved: a declared size
    /// of 0 (to end of file) and the 64-bit extended form are already
    /// accounted for.
    pub size: u64,
    /// Offset of the payload relative to the atom start (8, or 16 with an
    /// extended size).
    pub header_len: u64,
}

/// What the walker should do with an atom, decided from its code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomAction {
    /// Descend into the atom's payload and visit its children.
    Children,
    /// Move on to the next sibling.
    Skip,
    /// Stop the walk immediately.
    Done,
    /// Fetch the atom's bytes and pass them to
    /// [`AtomVisitor::handle`].
    Handle,
}

/// Whether to keep walking after a handled atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Continue with the next sibling.
    Continue,
    /// Stop the walk; the visitor has everything it needs.
    Done,
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every atom was visited (or skipped) to the end of the file.
    Completed,
    /// The visitor stopped the walk early.
    Stopped,
}

/// Drives a walk: classifies atoms by code and handles the ones it wants.
pub trait AtomVisitor {
    /// Decide what to do with an atom, from its code alone.
    fn classify(&self, kind: FourCc) -> AtomAction;

    /// Process an atom classified as [`AtomAction::Handle`].
    ///
    /// `window` is anchored at the atom's size field with the whole atom
    /// resident, so fields can be read at fixed offsets without further I/O.
    fn handle<R: RangeReader + ?Sized>(
        &mut self,
        atom: &Atom,
        window: &ByteWindow<'_, R>,
    ) -> Result<Walk, FormatError> {
        let _ = (atom, window);
        Ok(Walk::Continue)
    }
}

/// Walk the atom tree of `source`, visiting atoms in file order.
///
/// Containers are entered only for [`AtomAction::Children`]; everything
/// else advances by the atom's declared size, so unrelated media data is
/// never fetched. Reaching the end of the file is the
/// [`WalkOutcome::Completed`] outcome, not an error.
///
/// # Errors
/// - [`FormatError::BadAtomSize`] if an atom declares a size smaller than
///   its own header, which would stall the walk
/// - Window errors if a header lies beyond the available bytes
/// - Anything the visitor's `handle` returns
pub async fn walk_atoms<R, V>(source: &R, visitor: &mut V) -> Result<WalkOutcome, FormatError>
where
    R: RangeReader + ?Sized,
    V: AtomVisitor,
{
    let file_size = source.size();
    let mut window = ByteWindow::open(
        source,
        0,
        DEFAULT_PROBE_WINDOW.min(file_size),
        ByteOrder::BigEndian,
    )
    .await?;

    let mut offset = 0u64;
    // End offsets of the containers currently being scanned, outermost
    // first. The file itself is the outermost container.
    let mut ends: Vec<u64> = vec![file_size];

    loop {
        while let Some(&end) = ends.last() {
            if offset >= end {
                ends.pop();
            } else {
                break;
            }
        }
        if ends.is_empty() {
            return Ok(WalkOutcome::Completed);
        }

        window = window.fetch(offset, 8).await?;
        let declared = window.get_u32(0)? as u64;
        let kind = {
            let mut b = [0u8; 4];
            b.copy_from_slice(window.get_bytes(4, 4)?);
            FourCc(b)
        };

        let (size, header_len) = match declared {
            // Size 0: the atom runs to the end of the file
            0 => (file_size - offset, 8),
            // Size 1: 64-bit extended size follows the code
            1 => {
                window = window.fetch(offset, 16).await?;
                (window.get_u64(8)?, 16)
            }
            n => (n, 8),
        };

        if size < header_len {
            return Err(FormatError::BadAtomSize {
                kind: kind.to_string(),
                size,
            });
        }
        // Bound the size before any offset arithmetic uses it; a 64-bit
        // size field can hold values that overflow `offset + size`
        if size > file_size - offset {
            return Err(FormatError::Truncated("atom extends past end of file"));
        }

        let atom = Atom {
            kind,
            offset,
            size,
            header_len,
        };
        trace!(source = %source.identifier(), atom = %kind, offset, size, "atom");

        match visitor.classify(kind) {
            AtomAction::Children => {
                ends.push(offset + size);
                offset += header_len;
                // 'meta' is a full box: 4 bytes of version/flags sit between
                // its header and its first child
                if kind == FourCc::META {
                    offset += 4;
                }
            }
            AtomAction::Skip => offset += size,
            AtomAction::Done => return Ok(WalkOutcome::Stopped),
            AtomAction::Handle => {
                window = window.fetch(offset, size).await?;
                match visitor.handle(&atom, &window)? {
                    Walk::Continue => offset += size,
                    Walk::Done => return Ok(WalkOutcome::Stopped),
                }
            }
        }
    }
}

// =============================================================================
// Track rotation
// =============================================================================

/// Visitor that descends `moov`/`trak` looking for the first track header.
#[derive(Default)]
struct RotationVisitor {
    rotation: Option<Rotation>,
}

impl AtomVisitor for RotationVisitor {
    fn classify(&self, kind: FourCc) -> AtomAction {
        match kind {
            FourCc::MOOV | FourCc::TRAK => AtomAction::Children,
            FourCc::TKHD => AtomAction::Handle,
            _ => AtomAction::Skip,
        }
    }

    fn handle<R: RangeReader + ?Sized>(
        &mut self,
        _atom: &Atom,
        window: &ByteWindow<'_, R>,
    ) -> Result<Walk, FormatError> {
        self.rotation = Some(read_tkhd_rotation(window)?);
        Ok(Walk::Done)
    }
}

/// Decode the display rotation from a version-0 `tkhd` atom.
///
/// The 3x3 transformation matrix starts at byte 48 of the atom. Only the
/// four cardinal rotations are produced by real camera firmware; anything
/// else is rejected rather than approximated.
fn read_tkhd_rotation<R: RangeReader + ?Sized>(
    window: &ByteWindow<'_, R>,
) -> Result<Rotation, FormatError> {
    let a = window.get_u32(48)?;
    let b = window.get_u32(52)?;
    // Skip the u/x fixed-point column entry at 56
    let c = window.get_u32(60)?;
    let d = window.get_u32(64)?;
    classify_matrix(a, b, c, d)
}

/// Map the four matrix cells that encode rotation to a [`Rotation`].
///
/// 16.16 fixed point: 0x00010000 is 1.0, 0xFFFF0000 is -1.0.
fn classify_matrix(a: u32, b: u32, c: u32, d: u32) -> Result<Rotation, FormatError> {
    const ONE: u32 = 0x0001_0000;
    const NEG_ONE: u32 = 0xFFFF_0000;

    match (a, b, c, d) {
        (ONE, 0, 0, ONE) => Ok(Rotation::Deg0),
        (0, ONE, NEG_ONE, 0) => Ok(Rotation::Deg90),
        (NEG_ONE, 0, 0, NEG_ONE) => Ok(Rotation::Deg180),
        (0, NEG_ONE, ONE, 0) => Ok(Rotation::Deg270),
        _ => Err(FormatError::UnexpectedRotationMatrix),
    }
}

/// Extract the display rotation of the first track of an MP4 file.
///
/// Returns `Ok(None)` when the file carries no `moov`/`trak`/`tkhd` chain,
/// which happens with streaming-oriented files whose movie atom trails the
/// media data beyond what was uploaded so far.
///
/// # Errors
/// - [`FormatError::NotMp4`] if the file does not start with an `ftyp` atom
/// - [`FormatError::UnexpectedRotationMatrix`] for a non-cardinal matrix
pub async fn parse_video_rotation<R: RangeReader + ?Sized>(
    source: &R,
) -> Result<Option<Rotation>, FormatError> {
    let window = ByteWindow::open(
        source,
        0,
        FTYP_PROBE_WINDOW.min(source.size()),
        ByteOrder::BigEndian,
    )
    .await?;

    if window.len() <= 8 || window.get_bytes(4, 4)? != FourCc::FTYP.0 {
        return Err(FormatError::NotMp4);
    }

    let mut visitor = RotationVisitor::default();
    let outcome = walk_atoms(source, &mut visitor).await?;
    debug!(
        source = %source.identifier(),
        ?outcome,
        rotation = visitor.rotation.map(|r| r.degrees()),
        "video rotation probe"
    );
    Ok(visitor.rotation)
}
