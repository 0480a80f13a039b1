//! The closed error vocabulary shared by every layer of the engine.
//!
//! Pure evaluators never panic on malformed input; they return one of the
//! kinds below and leave caller-visible state unchanged, per the
//! propagation rule: errors are surfaced, never silently recovered.

use thiserror::Error;

/// A bare, `Copy` discriminant for the closed error set.
///
/// Kept separate from [`ShowError`] so callers that only care about the
/// kind (not the message) can match on it without pulling in the full
/// enum, mirroring how `bms-rs` separates `LexError`/`ParseError` from the
/// umbrella `BmsError`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Out-of-range argument or malformed out-of-band request.
    InvalidArgument,
    /// Unknown or inconsistent byte in the binary stream.
    Parse,
    /// CRC mismatch, unknown opcode, unterminated loop, out-of-file jump.
    Corrupted,
    /// An encoded duration or offset does not fit its representation.
    Overflow,
    /// The input buffer ends inside a structured region.
    Read,
    /// Allocator returned null; the affected collection is unchanged.
    OutOfMemory,
    /// A requested block tag is absent from the file.
    NotFound,
    /// Polynomial degree is too high for the closed-form solver.
    Unimplemented,
    /// The operation is not supported in this configuration.
    Unsupported,
    /// The requested collection or range was empty.
    Empty,
    /// The operation timed out (reserved; the engine is fully synchronous).
    Timeout,
    /// The operation would need to block (reserved; never returned today).
    WouldBlock,
    /// The caller lacks permission for this operation (reserved).
    PermissionDenied,
    /// A fixed-capacity collection is full.
    Full,
    /// Anything not covered above.
    Other,
}

/// An error raised by any layer of the playback engine.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShowError {
    /// See [`ErrorKind::InvalidArgument`].
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// See [`ErrorKind::Parse`].
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// See [`ErrorKind::Corrupted`].
    #[error("corrupted data: {0}")]
    Corrupted(&'static str),
    /// See [`ErrorKind::Overflow`].
    #[error("value does not fit its encoded representation: {0}")]
    Overflow(&'static str),
    /// See [`ErrorKind::Read`].
    #[error("buffer ended inside a structured region: {0}")]
    Read(&'static str),
    /// See [`ErrorKind::OutOfMemory`].
    #[error("allocation failed")]
    OutOfMemory,
    /// See [`ErrorKind::NotFound`].
    #[error("block not found: {0}")]
    NotFound(&'static str),
    /// See [`ErrorKind::Unimplemented`].
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),
    /// See [`ErrorKind::Unsupported`].
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// See [`ErrorKind::Empty`].
    #[error("empty: {0}")]
    Empty(&'static str),
    /// See [`ErrorKind::Full`].
    #[error("collection is full")]
    Full,
    /// Anything not covered by the named variants.
    #[error("{0}")]
    Other(&'static str),
}

impl ShowError {
    /// Maps this error onto its [`ErrorKind`] discriminant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Corrupted(_) => ErrorKind::Corrupted,
            Self::Overflow(_) => ErrorKind::Overflow,
            Self::Read(_) => ErrorKind::Read,
            Self::OutOfMemory => ErrorKind::OutOfMemory,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unimplemented(_) => ErrorKind::Unimplemented,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Empty(_) => ErrorKind::Empty,
            Self::Full => ErrorKind::Full,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

/// The crate-wide result alias.
pub type Result<T> = core::result::Result<T, ShowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_named_variants() {
        assert_eq!(
            ShowError::Corrupted("bad opcode").kind(),
            ErrorKind::Corrupted
        );
        assert_eq!(ShowError::OutOfMemory.kind(), ErrorKind::OutOfMemory);
        assert_eq!(ShowError::Full.kind(), ErrorKind::Full);
    }
}
