//! Error types for operation algebra failures.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by applying, composing, transforming or decoding operations.
///
/// All of these are local validation failures. Nothing here is retryable:
/// an error means the caller paired operations or documents that could not
/// have come from a common history.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OtError {
    /// The input document (or the other operand) has the wrong length.
    #[error("length mismatch: expected {expected} chars, got {actual}")]
    #[diagnostic(
        code(tandem::length_mismatch),
        help("an operation can only be applied to a document of exactly its base length")
    )]
    LengthMismatch { expected: usize, actual: usize },

    /// A step walked past the end of the input, or left part of it unconsumed.
    #[error("operation out of range at char {position} of {len}")]
    #[diagnostic(code(tandem::out_of_range))]
    OutOfRange { position: usize, len: usize },

    /// `compose` was handed operations whose lengths do not chain.
    #[error(
        "cannot compose: first operation produces {first_target} chars, second expects {second_base}"
    )]
    #[diagnostic(code(tandem::incompatible_lengths))]
    IncompatibleLengths {
        first_target: usize,
        second_base: usize,
    },

    /// The step walk reached a pairing with no defined outcome.
    #[error("incompatible operations: {0}")]
    #[diagnostic(code(tandem::incompatible_operations))]
    IncompatibleOperations(String),

    /// A wire payload contained an element that is not a step.
    #[error("malformed step: {0}")]
    #[diagnostic(
        code(tandem::malformed_step),
        help("steps are positive integers (retain), negative integers (delete) or strings (insert)")
    )]
    MalformedStep(String),

    /// A decoration color was not in `#RRGGBB` form.
    #[error("invalid color {0:?}: only six-digit hex colors are allowed")]
    #[diagnostic(code(tandem::invalid_color))]
    InvalidColor(String),
}
