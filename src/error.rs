use trackable::error::{ErrorKind as TrackableErrorKind, TrackableError};

/// This crate specific `Error` type.
#[derive(Debug, Clone, trackable::TrackableError)]
pub struct Error(TrackableError<ErrorKind>);

/// Possible error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or non-conformant input (sync byte, table id, start code, marker bits, ...).
    InvalidInput,

    /// Well-formed input that uses a feature this crate does not handle.
    Unsupported,

    /// A payload does not fit in, or does not exactly fill, the space available for it.
    InvalidSize,

    /// The CRC-32 of a PSI section does not match its content.
    Crc32Mismatch,

    /// The output byte stream refused a write.
    WriteFailed,

    /// Other errors (e.g., I/O failures of the underlaying byte stream).
    Other,
}
impl TrackableErrorKind for ErrorKind {}
