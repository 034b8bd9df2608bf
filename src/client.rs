//! Per-document client synchronization state machine
//!
//! One [`Client`] exists per open document. Local edits are sent
//! optimistically: at most one operation is in flight to the server (the
//! `outstanding` slot), and edits typed while waiting are coalesced into a
//! single `buffer` operation via compose. Inbound server operations are
//! transformed against both before touching the local document.
//!
//! The server is the sole arbiter of global operation order; this machine
//! only transforms its own in-flight work against what the server broadcasts.
//!
//! # States
//!
//! - **Synchronized:** nothing in flight
//! - **AwaitingConfirm:** one operation sent, not yet acknowledged
//! - **AwaitingWithBuffer:** one in flight plus composed local edits queued
//!
//! Any algebra error raised during a transition propagates to the caller,
//! which must discard the client and rebuild it from the authoritative
//! server snapshot and revision; the machine never repairs itself.

use crate::error::Result;
use crate::operation::TextOperation;
use crate::selection::Selection;

/// Callbacks the client requires from its host.
///
/// `send_operation` and `send_selection` are fire-and-forget outbound calls
/// into the transport layer; `apply_operation` hands a transformed remote
/// operation to the editor adapter; `get_selection` reads the editor's
/// current selection for re-announcement after an acknowledgement.
pub trait ClientCallbacks {
    /// Send a local operation to the server at the given revision
    fn send_operation(&mut self, revision: u64, operation: &TextOperation);

    /// Apply a (transformed) remote operation to the local editor
    fn apply_operation(&mut self, operation: &TextOperation);

    /// Broadcast the local selection; `None` signals "no selection" (blur)
    fn send_selection(&mut self, selection: Option<&Selection>);

    /// Read the editor's current selection
    fn get_selection(&self) -> Option<Selection>;
}

/// Synchronization state, carrying only the payload each state needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// All local edits acknowledged by the server
    Synchronized,

    /// `outstanding` has been sent and awaits acknowledgement
    AwaitingConfirm { outstanding: TextOperation },

    /// `outstanding` is in flight; later local edits are composed into `buffer`
    AwaitingWithBuffer {
        outstanding: TextOperation,
        buffer: TextOperation,
    },
}

impl ClientState {
    fn name(&self) -> &'static str {
        match self {
            ClientState::Synchronized => "Synchronized",
            ClientState::AwaitingConfirm { .. } => "AwaitingConfirm",
            ClientState::AwaitingWithBuffer { .. } => "AwaitingWithBuffer",
        }
    }
}

/// Per-document synchronization client.
///
/// `revision` is the document version number as known to this client; it
/// only increases. Exactly one live client exists per document, and all
/// calls into it must be serialized by the host; the machine itself does
/// no locking.
///
/// If any method returns an error the client must be treated as corrupted:
/// drop it, re-fetch the authoritative document text and revision from the
/// server, and construct a fresh client. Outstanding and buffered edits are
/// intentionally not replayed from client memory.
#[derive(Debug)]
pub struct Client<C: ClientCallbacks> {
    revision: u64,
    user_id: String,
    state: ClientState,
    callbacks: C,
}

impl<C: ClientCallbacks> Client<C> {
    /// Create a client at the given server revision, in `Synchronized`
    pub fn new(revision: u64, user_id: impl Into<String>, callbacks: C) -> Self {
        Self {
            revision,
            user_id: user_id.into(),
            state: ClientState::Synchronized,
            callbacks,
        }
    }

    /// Current revision as known to this client
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The local participant's identifier
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current synchronization state
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Access the host callbacks
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    fn set_state(&mut self, new_state: ClientState) {
        log::debug!(
            "[{}] state transition: {} -> {} (rev {})",
            self.user_id,
            self.state.name(),
            new_state.name(),
            self.revision
        );
        self.state = new_state;
    }

    /// Register a local edit.
    ///
    /// In `Synchronized` the operation is sent immediately; in
    /// `AwaitingConfirm` it opens the buffer; in `AwaitingWithBuffer` it is
    /// composed into the existing buffer. No-ops are ignored.
    pub fn apply_client(&mut self, operation: TextOperation) -> Result<()> {
        if operation.is_noop() {
            return Ok(());
        }
        let state = std::mem::replace(&mut self.state, ClientState::Synchronized);
        let next = match state {
            ClientState::Synchronized => {
                self.callbacks.send_operation(self.revision, &operation);
                ClientState::AwaitingConfirm {
                    outstanding: operation,
                }
            }
            ClientState::AwaitingConfirm { outstanding } => ClientState::AwaitingWithBuffer {
                outstanding,
                buffer: operation,
            },
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => ClientState::AwaitingWithBuffer {
                outstanding,
                buffer: buffer.compose(&operation)?,
            },
        };
        self.set_state(next);
        Ok(())
    }

    /// Handle a remote operation broadcast by the server.
    ///
    /// Pending local work (`outstanding`, then `buffer`) is transformed
    /// against the remote operation, and the fully transformed remote
    /// operation is handed to `apply_operation` for the editor. No-ops are
    /// ignored without advancing the revision.
    pub fn apply_server(&mut self, operation: TextOperation) -> Result<()> {
        if operation.is_noop() {
            return Ok(());
        }
        self.revision += 1;
        let state = std::mem::replace(&mut self.state, ClientState::Synchronized);
        let next = match state {
            ClientState::Synchronized => {
                self.callbacks.apply_operation(&operation);
                ClientState::Synchronized
            }
            ClientState::AwaitingConfirm { outstanding } => {
                let (outstanding, transformed) =
                    TextOperation::transform(&outstanding, &operation)?;
                self.callbacks.apply_operation(&transformed);
                ClientState::AwaitingConfirm { outstanding }
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => {
                let (outstanding, transformed) =
                    TextOperation::transform(&outstanding, &operation)?;
                let (buffer, transformed) = TextOperation::transform(&buffer, &transformed)?;
                self.callbacks.apply_operation(&transformed);
                ClientState::AwaitingWithBuffer {
                    outstanding,
                    buffer,
                }
            }
        };
        self.set_state(next);
        Ok(())
    }

    /// Handle the server acknowledging this client's last sent operation.
    ///
    /// In `AwaitingWithBuffer` the buffer becomes the next outstanding
    /// operation and is sent at the new revision. Afterwards the local
    /// selection is re-announced, since transforms applied while un-acked
    /// may have silently moved the cursor.
    pub fn server_ack(&mut self) -> Result<()> {
        self.revision += 1;
        let state = std::mem::replace(&mut self.state, ClientState::Synchronized);
        let next = match state {
            // Should not occur; the server only acks operations we sent.
            ClientState::Synchronized => ClientState::Synchronized,
            ClientState::AwaitingConfirm { .. } => ClientState::Synchronized,
            ClientState::AwaitingWithBuffer { buffer, .. } => {
                self.callbacks.send_operation(self.revision, &buffer);
                ClientState::AwaitingConfirm {
                    outstanding: buffer,
                }
            }
        };
        self.set_state(next);
        self.announce_selection();
        Ok(())
    }

    /// Re-send the outstanding operation after a transport reconnect.
    ///
    /// Guards against a send lost in the old connection; never re-sends the
    /// buffer. A no-op in `Synchronized`.
    pub fn server_reconnect(&mut self) {
        match &self.state {
            ClientState::AwaitingConfirm { outstanding }
            | ClientState::AwaitingWithBuffer { outstanding, .. } => {
                log::debug!(
                    "[{}] resending outstanding operation at rev {}",
                    self.user_id,
                    self.revision
                );
                self.callbacks.send_operation(self.revision, outstanding);
            }
            ClientState::Synchronized => {}
        }
    }

    /// Map a foreign selection through whatever local edits are not yet
    /// acknowledged, so it lands at the right offsets in the local document.
    pub fn transform_selection(&self, selection: &Selection) -> Selection {
        match &self.state {
            ClientState::Synchronized => selection.clone(),
            ClientState::AwaitingConfirm { outstanding } => selection.transform(outstanding),
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => selection.transform(outstanding).transform(buffer),
        }
    }

    /// Notify the client that the local selection changed
    pub fn selection_changed(&mut self) {
        let selection = self.callbacks.get_selection();
        self.send_selection(selection);
    }

    /// Notify the client that the editor lost focus
    pub fn blur(&mut self) {
        self.send_selection(None);
    }

    fn announce_selection(&mut self) {
        if matches!(
            self.state,
            ClientState::Synchronized | ClientState::AwaitingConfirm { .. }
        ) {
            let selection = self.callbacks.get_selection();
            self.callbacks.send_selection(selection.as_ref());
        }
    }

    /// Broadcast a selection, suppressed while a buffer is open: the remote
    /// peers could not place it correctly against un-sent local edits.
    fn send_selection(&mut self, selection: Option<Selection>) {
        if matches!(
            self.state,
            ClientState::Synchronized | ClientState::AwaitingConfirm { .. }
        ) {
            self.callbacks.send_selection(selection.as_ref());
        }
    }
}
