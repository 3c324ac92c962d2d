//! Provides the error type used throughout this crate.

use thiserror::Error;

/// The error type used throughout this crate.
///
/// Errors are local to the failing call and are never retried internally;
/// the caller's state is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoppiceError {
    /// A precondition on an argument was violated (foreign cursor, nil
    /// handle push, out-of-range shift or chunk width).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Positional access outside the collection.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// Pop on an empty vector.
    #[error("pop on an empty vector")]
    Underflow,
    /// A nil or vacant handle was dereferenced.
    #[error("dereferenced a nil or vacant handle")]
    InvalidHandle,
    /// The operation is declared but not implemented.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// A cursor path would exceed [`crate::tree::MAX_DEPTH`].
    #[error("cursor path would exceed the maximum depth")]
    DepthExceeded,
    /// The arena ran out of 16-bit handle space.
    #[error("arena handle space exhausted")]
    ArenaExhausted,
}
