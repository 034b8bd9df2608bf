//! OTSync Core - Operational transformation engine
//!
//! This is the synchronization core for real-time collaborative text
//! editing. It implements:
//! - The operation algebra (apply/invert/compose/transform) over
//!   retain/insert/delete token sequences
//! - Selection transformation so cursors survive concurrent edits
//! - The per-document client state machine coordinating optimistic local
//!   edits against server acknowledgements
//! - The adapter contract a host editing surface must implement
//!
//! Rendering, transport, and persistence are host concerns; the core is
//! pure and single-threaded, driven entirely by editor-change and
//! network-message callbacks.
//!
//! # Examples
//!
//! ```rust
//! use otsync_core::TextOperation;
//!
//! let a = TextOperation::new().retain(5).insert("A");
//! let b = TextOperation::new().retain(5).insert("B");
//!
//! let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();
//!
//! // Both application orders converge.
//! let via_a = b_prime.apply(&a.apply("hello").unwrap()).unwrap();
//! let via_b = a_prime.apply(&b.apply("hello").unwrap()).unwrap();
//! assert_eq!(via_a, "helloAB");
//! assert_eq!(via_a, via_b);
//! ```

pub mod client;
pub mod editor;
pub mod error;
pub mod operation;
pub mod selection;

// Re-exports for convenience
pub use client::{Client, ClientCallbacks, ClientState};
pub use editor::{
    operation_from_changes, operation_to_edits, ContentChange, Edit, EditorAdapter, Position,
};
pub use error::{OtError, Result};
pub use operation::{Op, TextOperation};
pub use selection::{Range, Selection};

/// Participant identifier type
pub type UserId = String;

/// Document identifier type
pub type DocumentId = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_import() {
        // Smoke test that modules compile
        let _user_id: UserId = "test-user".to_string();
        let _op = TextOperation::new();
    }
}
