//! Selection model: cursor and range tracking across edits
//!
//! A [`Selection`] is a set of [`Range`]s, each an (anchor, head) pair of
//! character offsets. Anchor and head are deliberately not normalized: a
//! head before its anchor encodes a backwards (right-to-left) selection.
//!
//! Selections are transformed through a [`TextOperation`] so a participant's
//! cursor stays attached to the text it was next to while remote edits land.
//!
//! # Example
//!
//! ```rust
//! use otsync_core::{Selection, TextOperation};
//!
//! let selection = Selection::cursor(5);
//! let op = TextOperation::new().insert("abc").retain(10);
//! assert_eq!(selection.transform(&op).ranges[0].head, 8);
//! ```

use crate::operation::{Op, TextOperation};
use serde::{Deserialize, Serialize};

/// An anchor/head offset pair describing a cursor or text selection.
///
/// `anchor == head` is a cursor; otherwise a range selection whose direction
/// is encoded by the order of the two offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// Fixed end of the selection
    pub anchor: usize,

    /// Moving end of the selection (where the caret is)
    pub head: usize,
}

impl Range {
    /// Create a range from anchor and head offsets
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// True iff the range selects no text
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map this range through an operation.
    ///
    /// A cursor (anchor == head) transforms both ends with a single index
    /// mapping so boundary rounding can never split it into a range.
    pub fn transform(&self, operation: &TextOperation) -> Range {
        let anchor = transform_index(self.anchor, operation);
        let head = if self.anchor == self.head {
            anchor
        } else {
            transform_index(self.head, operation)
        };
        Range { anchor, head }
    }
}

/// Map a character offset through an operation.
///
/// Walks the token sequence with a running source-offset cursor: indices
/// inside a retained span pass through unchanged, indices at or after an
/// insertion point shift forward by the inserted length, indices strictly
/// inside a deleted span collapse to the span's start, and indices past a
/// deleted span shift backward by the deleted length.
fn transform_index(index: usize, operation: &TextOperation) -> usize {
    let mut new_index = index;
    let mut offset = 0;
    for op in operation.ops() {
        match op {
            Op::Retain(n) => {
                if index <= offset + n {
                    return new_index;
                }
                offset += n;
            }
            Op::Insert(s) => {
                if offset <= index {
                    new_index += s.chars().count();
                }
            }
            Op::Delete(n) => {
                if index <= offset {
                    // Before the deleted span; unaffected.
                } else if index <= offset + n {
                    return offset;
                } else {
                    new_index -= n;
                }
                offset += n;
            }
        }
    }
    new_index
}

/// One or more selection ranges, valid against a specific document state.
///
/// A selection always has at least one range; constructing or deserializing
/// an empty range list yields a zero-width range at offset 0.
///
/// Wire form: `{ "ranges": [{ "anchor": 0, "head": 4 }, ...] }`. An absent
/// selection (editor blur) is represented by `Option::None` at the call
/// sites that broadcast it, not by an empty range list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub ranges: Vec<Range>,
}

impl Selection {
    /// Create a selection, substituting a zero-width range at offset 0 when
    /// `ranges` is empty
    pub fn new(ranges: Vec<Range>) -> Self {
        if ranges.is_empty() {
            Self {
                ranges: vec![Range::new(0, 0)],
            }
        } else {
            Self { ranges }
        }
    }

    /// A single zero-width range at `offset`
    pub fn cursor(offset: usize) -> Self {
        Self {
            ranges: vec![Range::new(offset, offset)],
        }
    }

    /// True iff any range selects text
    pub fn something_selected(&self) -> bool {
        self.ranges.iter().any(|r| !r.is_empty())
    }

    /// Map every range through an operation
    pub fn transform(&self, operation: &TextOperation) -> Selection {
        Selection {
            ranges: self.ranges.iter().map(|r| r.transform(operation)).collect(),
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::cursor(0)
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SelectionHelper {
            #[serde(default)]
            ranges: Vec<Range>,
        }

        let helper = SelectionHelper::deserialize(deserializer)?;
        Ok(Selection::new(helper.ranges))
    }
}
