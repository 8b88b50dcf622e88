//! Error types for the cipher layer.

use thiserror::Error;

/// Errors reported by cipher contexts and registry operations.
///
/// The variants are deliberately coarse: callers branch on the *kind* of
/// failure, not on which primitive produced it. `MacInvalid` is kept separate
/// from every other failure because it signals a possible active attack and
/// must never be retried or downgraded to a decode error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    /// Malformed length, unsupported tag length for the mode, or a key/IV
    /// shorter than the descriptor requires.
    #[error("invalid argument")]
    InvalidArgument,

    /// Resource exhaustion while sizing an output buffer.
    #[error("allocation failed")]
    AllocFail,

    /// The underlying cipher engine reported a failure unrelated to
    /// authentication.
    #[error("cipher engine failure")]
    Primitive,

    /// Authentication tag mismatch on decrypt. Unrecoverable for the packet;
    /// the session must be torn down, not resynchronized.
    #[error("message authentication code incorrect")]
    MacInvalid,

    /// Not enough bytes available to determine the packet length. The caller
    /// should wait for more input; this is not fatal.
    #[error("incomplete message")]
    MessageIncomplete,

    /// Invariant violation inside the cipher layer.
    #[error("internal error")]
    Internal,
}

/// Result type for cipher operations.
pub type Result<T> = core::result::Result<T, CipherError>;
