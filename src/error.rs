//! Error types for the OT engine
//!
//! All algebra errors are fail-fast: the engine raises instead of guessing
//! or clamping. A `LengthMismatch` means the local snapshot has drifted from
//! what the algebra expects; the compose/transform variants mean the client's
//! outstanding/buffer bookkeeping has desynchronized from the server's
//! revision stream. In either case the owning host must discard the client
//! and resynchronize from the authoritative server snapshot.

use thiserror::Error;

/// Result type alias for OT operations
pub type Result<T> = std::result::Result<T, OtError>;

/// Errors raised by the operation algebra, the client state machine, and
/// the wire (de)serialization layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtError {
    /// Operation base length does not match the document it is applied to
    #[error("operation base length {base_length} does not match document length {doc_length}")]
    LengthMismatch {
        base_length: usize,
        doc_length: usize,
    },

    /// `compose(a, b)` requires `a.target_length == b.base_length`
    #[error(
        "cannot compose: first operation's target length {target_length} \
         does not match second operation's base length {base_length}"
    )]
    ComposeLengthMismatch {
        target_length: usize,
        base_length: usize,
    },

    /// `transform(a, b)` requires both operations share the same base length
    #[error("cannot transform: base lengths differ ({left} vs {right})")]
    TransformBaseLengthMismatch { left: usize, right: usize },

    /// Malformed serialized operation or selection (unknown token, bad shape).
    /// Fatal to the single inbound message only; the client is not reset.
    #[error("malformed wire data: {0}")]
    Structural(String),

    /// Editor change records do not reconstruct to the previous snapshot
    /// (overlapping or out-of-bounds ranges). Defect signal, never tolerated.
    #[error("editor change records are inconsistent: {0}")]
    InconsistentChanges(String),
}
