//! Editor adapter contract and change translation
//!
//! The core never manipulates a concrete editing surface. A host integrates
//! by implementing [`EditorAdapter`] over its editor and translating the
//! editor's raw change records into operations with
//! [`operation_from_changes`].
//!
//! Suppression is scoped by design: [`EditorAdapter::apply_suppressed`]
//! applies an operation as one atomic batch without emitting the adapter's
//! own change notification for it, so the core never re-derives an
//! operation from an edit it just applied. There is no shared flag to
//! toggle and clear later.
//!
//! All offsets are character offsets (Unicode scalar values), matching the
//! operation algebra and selection model.

use crate::error::{OtError, Result};
use crate::operation::{Op, TextOperation};
use crate::selection::Selection;

/// A (line, column) pair in the host editor's coordinate space, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// One raw change record as reported by the host editor: `range_length`
/// characters starting at `range_offset` (in the pre-change document) were
/// replaced by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub range_offset: usize,
    pub range_length: usize,
    pub text: String,
}

/// One splice against the document an operation applies to: replace the
/// characters in `start..end` with `text`. Produced by
/// [`operation_to_edits`]; all offsets reference the pre-edit document, so
/// an adapter must apply the batch atomically (or back to front).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// The boundary interface the core requires from a concrete editing surface.
pub trait EditorAdapter {
    /// Current document content
    fn snapshot(&self) -> String;

    /// Convert a character offset to an editor position, clamped to the
    /// document bounds
    fn offset_to_position(&self, offset: usize) -> Position;

    /// Convert an editor position to a character offset, clamped to the
    /// document bounds
    fn position_to_offset(&self, position: Position) -> usize;

    /// Apply an operation's edits to the live editor as a single atomic
    /// batch, suppressing the adapter's own change notification for exactly
    /// that batch
    fn apply_suppressed(&mut self, operation: &TextOperation) -> Result<()>;

    /// Read the editor's native multi-range selection; `None` when the
    /// editor has no selection (e.g. it is blurred)
    fn get_selection(&self) -> Option<Selection>;

    /// Write the editor's selection; `None` collapses it to a bare cursor
    fn set_selection(&mut self, selection: Option<&Selection>);
}

/// Reconstruct the forward operation and its inverse from the host editor's
/// raw change records and the snapshot taken immediately *before* those
/// changes.
///
/// Change records are sorted by offset before folding; each record's offsets
/// reference the pre-change document.
///
/// # Errors
///
/// [`OtError::InconsistentChanges`] when the records overlap or run past the
/// end of the previous snapshot. That is a defect in the host's event
/// plumbing, never silently tolerated.
pub fn operation_from_changes(
    changes: &[ContentChange],
    previous: &str,
) -> Result<(TextOperation, TextOperation)> {
    let old_len = previous.chars().count();

    let mut sorted: Vec<&ContentChange> = changes.iter().collect();
    sorted.sort_by_key(|c| c.range_offset);

    let mut forward = TextOperation::new();
    let mut running_offset = 0;
    for change in sorted {
        let retain = change
            .range_offset
            .checked_sub(running_offset)
            .ok_or_else(|| {
                OtError::InconsistentChanges(format!(
                    "change at offset {} overlaps the previous change (cursor {})",
                    change.range_offset, running_offset
                ))
            })?;
        forward = forward
            .retain(retain)
            .delete(change.range_length)
            .insert(&change.text);
        running_offset += retain + change.range_length;
    }

    let final_retain = old_len.checked_sub(running_offset).ok_or_else(|| {
        OtError::InconsistentChanges(format!(
            "changes consumed {} characters but the snapshot holds {}",
            running_offset, old_len
        ))
    })?;
    forward = forward.retain(final_retain);

    if forward.base_length() != old_len {
        return Err(OtError::InconsistentChanges(format!(
            "reconstructed base length {} does not match snapshot length {}",
            forward.base_length(),
            old_len
        )));
    }

    let inverse = forward.invert(previous)?;
    Ok((forward, inverse))
}

/// Expand an operation into the splice list an adapter executes against the
/// live editor. Inserts become zero-width replacements, deletes become
/// replacements with empty text; retained spans only advance the offset.
pub fn operation_to_edits(operation: &TextOperation) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut index = 0;
    for op in operation.ops() {
        match op {
            Op::Retain(n) => index += n,
            Op::Insert(s) => edits.push(Edit {
                start: index,
                end: index,
                text: s.clone(),
            }),
            Op::Delete(n) => {
                edits.push(Edit {
                    start: index,
                    end: index + n,
                    text: String::new(),
                });
                index += n;
            }
        }
    }
    edits
}
