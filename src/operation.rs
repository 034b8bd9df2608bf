//! Text operation algebra: apply, invert, compose, transform
//!
//! A [`TextOperation`] is an ordered sequence of retain/insert/delete tokens
//! describing one edit to a document. The algebra over operations is what
//! makes optimistic concurrent editing converge:
//!
//! - **apply** replays an operation against a document snapshot
//! - **invert** produces the undo operation
//! - **compose** merges two sequential operations into one
//! - **transform** reconciles two concurrent operations against the same base
//!
//! All lengths are counted in Unicode scalar values (`char`s), matching the
//! offsets used by the selection model and the adapter contract.
//!
//! # Properties
//!
//! - **Convergence (diamond):** for concurrent `a`, `b` with equal base
//!   length and `(a', b') = transform(a, b)`, applying `a` then `b'` equals
//!   applying `b` then `a'` on every base document
//! - **Invertibility:** `apply(invert(a, s), apply(a, s)) == s`
//! - **Compose equivalence:** `apply(compose(a, b), s) == apply(b, apply(a, s))`
//!
//! # Example
//!
//! ```rust
//! use otsync_core::TextOperation;
//!
//! let op = TextOperation::new().retain(5).insert(" world");
//! assert_eq!(op.apply("hello").unwrap(), "hello world");
//! ```

use crate::error::{OtError, Result};
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize};

/// A single token of a text operation.
///
/// The wire form is a bare JSON value: a positive integer is a retain count,
/// a negative integer is a delete count, a string is inserted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Copy the next `n` characters unchanged
    Retain(usize),

    /// Insert the given text at the current position
    Insert(String),

    /// Remove the next `n` characters
    Delete(usize),
}

/// An edit to a text document, expressed as a token sequence.
///
/// Invariants maintained by the builders:
///
/// - no token is empty (`retain(0)`, `insert("")`, `delete(0)` emit nothing)
/// - adjacent tokens of the same kind are merged
/// - an insert arriving while a delete is pending is placed before the
///   delete, so composed/transformed operations stay comparable
/// - `base_length` = sum of retain and delete counts;
///   `target_length` = sum of retain counts and inserted lengths
///
/// Operations are immutable once built; every algebra function returns a
/// new operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextOperation {
    ops: Vec<Op>,
    base_length: usize,
    target_length: usize,
}

/// Split a string after `n` characters (not bytes).
fn char_split(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextOperation {
    /// Create an empty operation (the identity on the empty document)
    pub fn new() -> Self {
        Self::default()
    }

    /// The token sequence
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Length of the document this operation applies to
    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Length of the document after applying this operation
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// Skip `n` characters unchanged. `retain(0)` emits no token.
    pub fn retain(mut self, n: usize) -> Self {
        if n == 0 {
            return self;
        }
        self.base_length += n;
        self.target_length += n;
        if let Some(Op::Retain(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(Op::Retain(n));
        }
        self
    }

    /// Insert `s` at the current position. `insert("")` emits no token.
    pub fn insert(mut self, s: &str) -> Self {
        if s.is_empty() {
            return self;
        }
        self.target_length += char_len(s);
        if let Some(Op::Insert(last)) = self.ops.last_mut() {
            last.push_str(s);
            return self;
        }
        if matches!(self.ops.last(), Some(Op::Delete(_))) {
            // Inserts and deletes at the same point commute; canonical
            // placement is insert before delete.
            let del_idx = self.ops.len() - 1;
            let mut merged = false;
            if del_idx > 0 {
                if let Op::Insert(prev) = &mut self.ops[del_idx - 1] {
                    prev.push_str(s);
                    merged = true;
                }
            }
            if !merged {
                self.ops.insert(del_idx, Op::Insert(s.to_string()));
            }
            return self;
        }
        self.ops.push(Op::Insert(s.to_string()));
        self
    }

    /// Remove the next `n` characters. `delete(0)` emits no token.
    pub fn delete(mut self, n: usize) -> Self {
        if n == 0 {
            return self;
        }
        self.base_length += n;
        if let Some(Op::Delete(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(Op::Delete(n));
        }
        self
    }

    /// Remove text equal in length to `s` (convenience over [`delete`](Self::delete))
    pub fn delete_str(self, s: &str) -> Self {
        self.delete(char_len(s))
    }

    /// True iff the operation changes nothing: no tokens, or a single retain
    /// spanning the whole base.
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty() || (self.ops.len() == 1 && matches!(self.ops[0], Op::Retain(_)))
    }

    /// Apply the operation to a document, producing the edited document.
    ///
    /// # Errors
    ///
    /// [`OtError::LengthMismatch`] if the document's length differs from the
    /// operation's base length.
    pub fn apply(&self, doc: &str) -> Result<String> {
        let doc_len = char_len(doc);
        if self.base_length != doc_len {
            return Err(OtError::LengthMismatch {
                base_length: self.base_length,
                doc_length: doc_len,
            });
        }
        let mut out = String::with_capacity(doc.len());
        let mut chars = doc.chars();
        for op in &self.ops {
            match op {
                Op::Retain(n) => out.extend(chars.by_ref().take(*n)),
                Op::Insert(s) => out.push_str(s),
                Op::Delete(n) => {
                    chars.by_ref().take(*n).for_each(drop);
                }
            }
        }
        Ok(out)
    }

    /// Compute the operation that undoes this one.
    ///
    /// Requires the document as it was *before* this operation was applied,
    /// so deleted text can be reconstructed.
    ///
    /// # Errors
    ///
    /// [`OtError::LengthMismatch`] if the operation's base length exceeds the
    /// document's length.
    pub fn invert(&self, doc: &str) -> Result<TextOperation> {
        let doc_len = char_len(doc);
        if self.base_length > doc_len {
            return Err(OtError::LengthMismatch {
                base_length: self.base_length,
                doc_length: doc_len,
            });
        }
        let mut inverse = TextOperation::new();
        let mut chars = doc.chars();
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    inverse = inverse.retain(*n);
                    chars.by_ref().take(*n).for_each(drop);
                }
                Op::Insert(s) => {
                    inverse = inverse.delete(char_len(s));
                }
                Op::Delete(n) => {
                    let deleted: String = chars.by_ref().take(*n).collect();
                    inverse = inverse.insert(&deleted);
                }
            }
        }
        Ok(inverse)
    }

    /// Merge two sequential operations into one.
    ///
    /// `a.compose(&b)` is equivalent to applying `a` then `b`:
    /// `compose(a, b).apply(s) == b.apply(&a.apply(s))`.
    ///
    /// # Errors
    ///
    /// [`OtError::ComposeLengthMismatch`] unless
    /// `self.target_length == other.base_length`.
    pub fn compose(&self, other: &TextOperation) -> Result<TextOperation> {
        if self.target_length != other.base_length {
            return Err(OtError::ComposeLengthMismatch {
                target_length: self.target_length,
                base_length: other.base_length,
            });
        }

        let mut result = TextOperation::new();
        let mut iter1 = self.ops.iter().cloned();
        let mut iter2 = other.ops.iter().cloned();
        let mut cur1 = iter1.next();
        let mut cur2 = iter2.next();

        loop {
            // Deletes of the first operand and inserts of the second pass
            // straight through: neither is affected by the other operand.
            if let Some(Op::Delete(n)) = cur1 {
                result = result.delete(n);
                cur1 = iter1.next();
                continue;
            }
            if let Some(Op::Insert(ref s)) = cur2 {
                result = result.insert(s);
                cur2 = iter2.next();
                continue;
            }

            let (op1, op2) = match (cur1.take(), cur2.take()) {
                (None, None) => break,
                // Unreachable when both operations satisfy their length
                // invariants; surfaced as the precondition error rather
                // than a panic.
                (None, Some(_)) | (Some(_), None) => {
                    return Err(OtError::ComposeLengthMismatch {
                        target_length: self.target_length,
                        base_length: other.base_length,
                    });
                }
                (Some(a), Some(b)) => (a, b),
            };

            match (op1, op2) {
                (Op::Retain(a), Op::Retain(b)) => {
                    if a > b {
                        result = result.retain(b);
                        cur1 = Some(Op::Retain(a - b));
                        cur2 = iter2.next();
                    } else if a == b {
                        result = result.retain(a);
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                    } else {
                        result = result.retain(a);
                        cur1 = iter1.next();
                        cur2 = Some(Op::Retain(b - a));
                    }
                }
                (Op::Insert(s), Op::Delete(d)) => {
                    // The second operation deletes freshly inserted text;
                    // the two cancel out character for character.
                    let inserted = char_len(&s);
                    if inserted > d {
                        let (_, rest) = char_split(&s, d);
                        cur1 = Some(Op::Insert(rest.to_string()));
                        cur2 = iter2.next();
                    } else if inserted == d {
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                    } else {
                        cur1 = iter1.next();
                        cur2 = Some(Op::Delete(d - inserted));
                    }
                }
                (Op::Insert(s), Op::Retain(r)) => {
                    let inserted = char_len(&s);
                    if inserted > r {
                        let (head, rest) = char_split(&s, r);
                        result = result.insert(head);
                        cur1 = Some(Op::Insert(rest.to_string()));
                        cur2 = iter2.next();
                    } else {
                        result = result.insert(&s);
                        cur1 = iter1.next();
                        cur2 = if inserted == r {
                            iter2.next()
                        } else {
                            Some(Op::Retain(r - inserted))
                        };
                    }
                }
                (Op::Retain(a), Op::Delete(d)) => {
                    if a > d {
                        result = result.delete(d);
                        cur1 = Some(Op::Retain(a - d));
                        cur2 = iter2.next();
                    } else if a == d {
                        result = result.delete(d);
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                    } else {
                        result = result.delete(a);
                        cur1 = iter1.next();
                        cur2 = Some(Op::Delete(d - a));
                    }
                }
                (Op::Delete(_), _) | (_, Op::Insert(_)) => {
                    unreachable!("pass-through tokens consumed before the match")
                }
            }
        }

        Ok(result)
    }

    /// Transform two concurrent operations against each other.
    ///
    /// Given `a` and `b` computed against the same base document, returns
    /// `(a', b')` such that `b'.apply(&a.apply(s)) == a'.apply(&b.apply(s))`
    /// for every `s` of that base length.
    ///
    /// Tie-break: when both operands insert at the same logical cursor, the
    /// first operand's insert is placed first. Both peers compute both primes
    /// from the same inputs, so the ordering is consistent cluster-wide.
    /// Deletes overlapping the same characters collapse; neither prime
    /// re-deletes already-deleted content.
    ///
    /// # Errors
    ///
    /// [`OtError::TransformBaseLengthMismatch`] unless both operations share
    /// the same base length.
    pub fn transform(a: &TextOperation, b: &TextOperation) -> Result<(TextOperation, TextOperation)> {
        if a.base_length != b.base_length {
            return Err(OtError::TransformBaseLengthMismatch {
                left: a.base_length,
                right: b.base_length,
            });
        }

        let mut a_prime = TextOperation::new();
        let mut b_prime = TextOperation::new();
        let mut iter1 = a.ops.iter().cloned();
        let mut iter2 = b.ops.iter().cloned();
        let mut cur1 = iter1.next();
        let mut cur2 = iter2.next();

        loop {
            // Both walks share one imaginary cursor in the base document.
            // Inserts are fitted in first; a's insert wins a position tie.
            if let Some(Op::Insert(ref s)) = cur1 {
                a_prime = a_prime.insert(s);
                b_prime = b_prime.retain(char_len(s));
                cur1 = iter1.next();
                continue;
            }
            if let Some(Op::Insert(ref s)) = cur2 {
                a_prime = a_prime.retain(char_len(s));
                b_prime = b_prime.insert(s);
                cur2 = iter2.next();
                continue;
            }

            let (op1, op2) = match (cur1.take(), cur2.take()) {
                (None, None) => break,
                // Unreachable for well-formed operations of equal base length.
                (None, Some(_)) | (Some(_), None) => {
                    return Err(OtError::TransformBaseLengthMismatch {
                        left: a.base_length,
                        right: b.base_length,
                    });
                }
                (Some(x), Some(y)) => (x, y),
            };

            match (op1, op2) {
                (Op::Retain(r1), Op::Retain(r2)) => {
                    let min = if r1 > r2 {
                        cur1 = Some(Op::Retain(r1 - r2));
                        cur2 = iter2.next();
                        r2
                    } else if r1 == r2 {
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                        r1
                    } else {
                        cur1 = iter1.next();
                        cur2 = Some(Op::Retain(r2 - r1));
                        r1
                    };
                    a_prime = a_prime.retain(min);
                    b_prime = b_prime.retain(min);
                }
                (Op::Delete(d1), Op::Delete(d2)) => {
                    // Both deleted the same span; neither prime repeats it.
                    if d1 > d2 {
                        cur1 = Some(Op::Delete(d1 - d2));
                        cur2 = iter2.next();
                    } else if d1 == d2 {
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                    } else {
                        cur1 = iter1.next();
                        cur2 = Some(Op::Delete(d2 - d1));
                    }
                }
                (Op::Delete(d), Op::Retain(r)) => {
                    let min = if d > r {
                        cur1 = Some(Op::Delete(d - r));
                        cur2 = iter2.next();
                        r
                    } else if d == r {
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                        d
                    } else {
                        cur1 = iter1.next();
                        cur2 = Some(Op::Retain(r - d));
                        d
                    };
                    a_prime = a_prime.delete(min);
                }
                (Op::Retain(r), Op::Delete(d)) => {
                    let min = if r > d {
                        cur1 = Some(Op::Retain(r - d));
                        cur2 = iter2.next();
                        d
                    } else if r == d {
                        cur1 = iter1.next();
                        cur2 = iter2.next();
                        r
                    } else {
                        cur1 = iter1.next();
                        cur2 = Some(Op::Delete(d - r));
                        r
                    };
                    b_prime = b_prime.delete(min);
                }
                (Op::Insert(_), _) | (_, Op::Insert(_)) => {
                    unreachable!("insert tokens consumed before the match")
                }
            }
        }

        Ok((a_prime, b_prime))
    }
}

impl std::fmt::Display for TextOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for op in &self.ops {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match op {
                Op::Retain(n) => write!(f, "retain {}", n)?,
                Op::Insert(s) => write!(f, "insert '{}'", s)?,
                Op::Delete(n) => write!(f, "delete {}", n)?,
            }
        }
        Ok(())
    }
}

/// Wire token: bare integer or string, per the JSON-compatible format.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireToken {
    Count(i64),
    Text(String),
}

impl TextOperation {
    fn from_wire_tokens(tokens: Vec<WireToken>) -> Result<TextOperation> {
        let mut op = TextOperation::new();
        for token in tokens {
            match token {
                WireToken::Count(n) if n > 0 => op = op.retain(n as usize),
                WireToken::Count(n) if n < 0 => op = op.delete(n.unsigned_abs() as usize),
                WireToken::Count(_) => {
                    return Err(OtError::Structural(
                        "zero-length token in operation".to_string(),
                    ));
                }
                WireToken::Text(s) => op = op.insert(&s),
            }
        }
        Ok(op)
    }

    /// Parse an operation from its wire form (a JSON token array).
    ///
    /// # Errors
    ///
    /// [`OtError::Structural`] for unknown or zero-length tokens; the caller
    /// drops the message without resetting the client.
    pub fn from_wire(value: &serde_json::Value) -> Result<TextOperation> {
        let tokens: Vec<WireToken> = serde_json::from_value(value.clone())
            .map_err(|e| OtError::Structural(format!("bad operation payload: {}", e)))?;
        Self::from_wire_tokens(tokens)
    }

    /// The operation's wire form
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("token array serialization cannot fail")
    }
}

impl Serialize for TextOperation {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.ops.len()))?;
        for op in &self.ops {
            match op {
                Op::Retain(n) => seq.serialize_element(&(*n as i64))?,
                Op::Insert(s) => seq.serialize_element(s)?,
                Op::Delete(n) => seq.serialize_element(&-(*n as i64))?,
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tokens = Vec::<WireToken>::deserialize(deserializer)?;
        TextOperation::from_wire_tokens(tokens).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_operation_is_noop() {
        let op = TextOperation::new();
        assert!(op.ops().is_empty());
        assert_eq!(op.base_length(), 0);
        assert_eq!(op.target_length(), 0);
        assert!(op.is_noop());
    }

    #[test]
    fn test_retain_lengths() {
        let op = TextOperation::new().retain(5);
        assert_eq!(op.ops(), &[Op::Retain(5)]);
        assert_eq!(op.base_length(), 5);
        assert_eq!(op.target_length(), 5);
        assert!(op.is_noop());
    }

    #[test]
    fn test_insert_lengths() {
        let op = TextOperation::new().insert("hello");
        assert_eq!(op.ops(), &[Op::Insert("hello".to_string())]);
        assert_eq!(op.base_length(), 0);
        assert_eq!(op.target_length(), 5);
        assert!(!op.is_noop());
    }

    #[test]
    fn test_delete_lengths() {
        let op = TextOperation::new().delete(5);
        assert_eq!(op.ops(), &[Op::Delete(5)]);
        assert_eq!(op.base_length(), 5);
        assert_eq!(op.target_length(), 0);
    }

    #[test]
    fn test_zero_builders_emit_nothing() {
        let op = TextOperation::new().retain(0).insert("").delete(0);
        assert!(op.ops().is_empty());
    }

    #[test]
    fn test_adjacent_tokens_merge() {
        let op = TextOperation::new().retain(2).retain(3);
        assert_eq!(op.ops(), &[Op::Retain(5)]);

        let op = TextOperation::new().insert("hello").insert(" world");
        assert_eq!(op.ops(), &[Op::Insert("hello world".to_string())]);

        let op = TextOperation::new().delete(2).delete(3);
        assert_eq!(op.ops(), &[Op::Delete(5)]);
    }

    #[test]
    fn test_insert_canonically_precedes_pending_delete() {
        let op = TextOperation::new().retain(1).delete(2).insert("ab");
        assert_eq!(
            op.ops(),
            &[
                Op::Retain(1),
                Op::Insert("ab".to_string()),
                Op::Delete(2),
            ]
        );

        // With an insert already before the delete, the text merges into it.
        let op = TextOperation::new().insert("x").delete(2).insert("y");
        assert_eq!(op.ops(), &[Op::Insert("xy".to_string()), Op::Delete(2)]);
    }

    #[test]
    fn test_apply_insert_into_empty() {
        let op = TextOperation::new().insert("hello");
        assert_eq!(op.apply("").unwrap(), "hello");
    }

    #[test]
    fn test_apply_retain_insert() {
        let op = TextOperation::new().retain(5).insert(" world");
        assert_eq!(op.apply("hello").unwrap(), "hello world");
    }

    #[test]
    fn test_apply_delete() {
        let op = TextOperation::new().retain(5).delete(6);
        assert_eq!(op.apply("hello world").unwrap(), "hello");
    }

    #[test]
    fn test_apply_mixed() {
        let op = TextOperation::new().retain(5).delete(1).insert("!").retain(5);
        assert_eq!(op.apply("hello world").unwrap(), "hello!world");
    }

    #[test]
    fn test_apply_multibyte() {
        let op = TextOperation::new().retain(2).insert("é").delete(1);
        assert_eq!(op.apply("añc").unwrap(), "añé");
    }

    #[test]
    fn test_apply_length_mismatch() {
        let op = TextOperation::new().retain(10);
        assert_eq!(
            op.apply("short"),
            Err(OtError::LengthMismatch {
                base_length: 10,
                doc_length: 5,
            })
        );
    }

    #[test]
    fn test_noop_identity() {
        let doc = "hello world";
        let op = TextOperation::new().retain(doc.chars().count());
        assert!(op.is_noop());
        assert_eq!(op.apply(doc).unwrap(), doc);
    }

    #[test]
    fn test_invert_insert() {
        let op = TextOperation::new().insert("hello");
        let inverse = op.invert("").unwrap();
        assert_eq!(inverse.ops(), &[Op::Delete(5)]);
        assert_eq!(inverse.apply("hello").unwrap(), "");
    }

    #[test]
    fn test_invert_delete_reconstructs_text() {
        let op = TextOperation::new().delete_str("hello");
        let inverse = op.invert("hello").unwrap();
        assert_eq!(inverse.ops(), &[Op::Insert("hello".to_string())]);
        assert_eq!(inverse.apply("").unwrap(), "hello");
    }

    #[test]
    fn test_invert_round_trip() {
        let original = "hello world";
        let op = TextOperation::new().retain(5).delete(1).insert("!").retain(5);
        let modified = op.apply(original).unwrap();
        let inverse = op.invert(original).unwrap();
        assert_eq!(inverse.apply(&modified).unwrap(), original);
    }

    #[test]
    fn test_invert_base_exceeds_document() {
        let op = TextOperation::new().retain(10);
        assert!(matches!(
            op.invert("short"),
            Err(OtError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_compose_inserts() {
        let op1 = TextOperation::new().insert("hello");
        let op2 = TextOperation::new().retain(5).insert(" world");
        let composed = op1.compose(&op2).unwrap();
        assert_eq!(composed.ops(), &[Op::Insert("hello world".to_string())]);
        assert_eq!(composed.apply("").unwrap(), "hello world");
    }

    #[test]
    fn test_compose_deletes() {
        let op1 = TextOperation::new().retain(5).delete(1);
        let op2 = TextOperation::new().retain(4).delete(1);
        let composed = op1.compose(&op2).unwrap();
        assert_eq!(composed.ops(), &[Op::Retain(4), Op::Delete(2)]);
        assert_eq!(composed.apply("hello!").unwrap(), "hell");
    }

    #[test]
    fn test_compose_insert_then_delete_cancels() {
        let op1 = TextOperation::new().retain(5).insert("temp");
        let op2 = TextOperation::new().retain(5).delete(4);
        let composed = op1.compose(&op2).unwrap();
        assert_eq!(composed.ops(), &[Op::Retain(5)]);
        assert_eq!(composed.apply("hello").unwrap(), "hello");
    }

    #[test]
    fn test_compose_length_mismatch() {
        let op1 = TextOperation::new().retain(5);
        let op2 = TextOperation::new().retain(10);
        assert_eq!(
            op1.compose(&op2),
            Err(OtError::ComposeLengthMismatch {
                target_length: 5,
                base_length: 10,
            })
        );
    }

    #[test]
    fn test_compose_equivalence() {
        let doc = "abcdefghij";
        let op1 = TextOperation::new().retain(3).delete(2).insert("XYZ").retain(5);
        let step1 = op1.apply(doc).unwrap();
        let op2 = TextOperation::new().retain(7).insert("ABC").retain(4);
        let sequential = op2.apply(&step1).unwrap();
        let composed = op1.compose(&op2).unwrap();
        assert_eq!(composed.apply(doc).unwrap(), sequential);
    }

    #[test]
    fn test_transform_concurrent_inserts_tie_break() {
        // Both insert at offset 5 of "hello"; a's insert is placed first.
        let a = TextOperation::new().retain(5).insert("A");
        let b = TextOperation::new().retain(5).insert("B");
        let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

        let doc = "hello";
        let via_a = b_prime.apply(&a.apply(doc).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(doc).unwrap()).unwrap();
        assert_eq!(via_a, via_b);
        assert_eq!(via_a, "helloAB");
    }

    #[test]
    fn test_transform_insert_vs_delete() {
        let a = TextOperation::new().retain(3).insert("XXX").retain(5);
        let b = TextOperation::new().retain(7).delete(1);
        let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

        let doc = "abcdefgh";
        let via_a = b_prime.apply(&a.apply(doc).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(doc).unwrap()).unwrap();
        assert_eq!(via_a, via_b);
    }

    #[test]
    fn test_transform_overlapping_deletes_collapse() {
        let doc = "abcdefghijk";
        let a = TextOperation::new().retain(3).delete(3).retain(5);
        let b = TextOperation::new().retain(5).delete(3).retain(3);
        let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

        let via_a = b_prime.apply(&a.apply(doc).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(doc).unwrap()).unwrap();
        assert_eq!(via_a, via_b);
        assert_eq!(via_a, "abcijk");
    }

    #[test]
    fn test_transform_base_length_mismatch() {
        let a = TextOperation::new().retain(5);
        let b = TextOperation::new().retain(6);
        assert_eq!(
            TextOperation::transform(&a, &b),
            Err(OtError::TransformBaseLengthMismatch { left: 5, right: 6 })
        );
    }

    #[test]
    fn test_display() {
        let op = TextOperation::new().retain(5).insert(" world").delete(2);
        assert_eq!(op.to_string(), "retain 5, insert ' world', delete 2");
    }

    #[test]
    fn test_wire_round_trip() {
        let op = TextOperation::new().retain(5).insert(" world").delete(2);
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, r#"[5," world",-2]"#);
        assert_eq!(op.to_wire(), serde_json::json!([5, " world", -2]));
        let back: TextOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert_eq!(TextOperation::from_wire(&op.to_wire()).unwrap(), op);
    }

    #[test]
    fn test_wire_rejects_zero_token() {
        let err = TextOperation::from_wire(&serde_json::json!([5, 0, "x"])).unwrap_err();
        assert!(matches!(err, OtError::Structural(_)));
    }

    #[test]
    fn test_wire_rejects_non_token_values() {
        let err = TextOperation::from_wire(&serde_json::json!([5, {"bad": true}])).unwrap_err();
        assert!(matches!(err, OtError::Structural(_)));

        let err = TextOperation::from_wire(&serde_json::json!({"ops": []})).unwrap_err();
        assert!(matches!(err, OtError::Structural(_)));
    }

    #[test]
    fn test_wire_normalizes_adjacent_tokens() {
        let op = TextOperation::from_wire(&serde_json::json!([2, 3, "ab", "cd", -1, -4])).unwrap();
        assert_eq!(
            op.ops(),
            &[
                Op::Retain(5),
                Op::Insert("abcd".to_string()),
                Op::Delete(5),
            ]
        );
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    /// Build an operation consuming exactly the document's length, driven by
    /// a seed list of (kind, span, text) choices.
    fn build_op(doc: &str, seeds: &[(u8, usize, String)]) -> TextOperation {
        let total = doc.chars().count();
        let mut remaining = total;
        let mut op = TextOperation::new();
        for (kind, span, text) in seeds {
            match kind % 3 {
                0 => {
                    let n = (*span).min(remaining);
                    op = op.retain(n);
                    remaining -= n;
                }
                1 => {
                    let n = (*span).min(remaining);
                    op = op.delete(n);
                    remaining -= n;
                }
                _ => op = op.insert(text),
            }
        }
        op.retain(remaining)
    }

    fn seeds() -> impl Strategy<Value = Vec<(u8, usize, String)>> {
        proptest::collection::vec((0u8..=2, 1usize..6, "[a-zé]{1,4}"), 0..8)
    }

    proptest! {
        #[test]
        fn prop_diamond(
            doc in ".{0,30}",
            seeds_a in seeds(),
            seeds_b in seeds(),
        ) {
            let a = build_op(&doc, &seeds_a);
            let b = build_op(&doc, &seeds_b);
            let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();

            let via_a = b_prime.apply(&a.apply(&doc).unwrap()).unwrap();
            let via_b = a_prime.apply(&b.apply(&doc).unwrap()).unwrap();
            prop_assert_eq!(via_a, via_b);
        }

        #[test]
        fn prop_invert_round_trip(doc in ".{0,30}", seeds in seeds()) {
            let op = build_op(&doc, &seeds);
            let modified = op.apply(&doc).unwrap();
            let inverse = op.invert(&doc).unwrap();
            prop_assert_eq!(inverse.apply(&modified).unwrap(), doc);
        }

        #[test]
        fn prop_compose_equivalence(
            doc in ".{0,30}",
            seeds_a in seeds(),
            seeds_b in seeds(),
        ) {
            let a = build_op(&doc, &seeds_a);
            let mid = a.apply(&doc).unwrap();
            let b = build_op(&mid, &seeds_b);

            let sequential = b.apply(&mid).unwrap();
            let composed = a.compose(&b).unwrap();
            prop_assert_eq!(composed.apply(&doc).unwrap(), sequential);
        }

        #[test]
        fn prop_noop_identity(doc in ".{0,30}") {
            let op = TextOperation::new().retain(doc.chars().count());
            prop_assert!(op.is_noop());
            prop_assert_eq!(op.apply(&doc).unwrap(), doc);
        }

        #[test]
        fn prop_length_bookkeeping(doc in ".{0,30}", seeds in seeds()) {
            let op = build_op(&doc, &seeds);
            prop_assert_eq!(op.base_length(), doc.chars().count());
            prop_assert_eq!(op.apply(&doc).unwrap().chars().count(), op.target_length());
        }
    }
}
