//! Delete-confirmation workflow
//!
//! Every destructive action passes through exactly one confirmation:
//! `Idle -> Pending(target) -> busy -> Idle`. Confirming dispatches to
//! the matching collection controller and does not return to idle until
//! that delete settles; a second confirm while one is running is ignored.

use super::chats::ChatService;
use super::documents::DocumentService;
use super::messages::MessageService;
use super::state::SharedState;

/// Which collection a pending delete belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    Chat,
    Message,
    Document,
}

/// A destructive action awaiting user confirmation
#[derive(Debug, Clone)]
pub struct DeleteTarget {
    pub kind: DeleteKind,
    pub id: String,
    /// Human-readable label shown in the confirmation prompt
    pub name: String,
}

impl DeleteTarget {
    pub fn new(kind: DeleteKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Result of a `confirm` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Nothing was pending, or a confirmation was already running
    Ignored,
    /// The delete went through (collections already reloaded)
    Deleted,
    /// The delete failed; the owning service has announced the error
    Failed,
}

#[derive(Clone)]
pub struct ConfirmService {
    state: SharedState,
    chats: ChatService,
    messages: MessageService,
    documents: DocumentService,
}

impl ConfirmService {
    pub fn new(
        state: SharedState,
        chats: ChatService,
        messages: MessageService,
        documents: DocumentService,
    ) -> Self {
        Self {
            state,
            chats,
            messages,
            documents,
        }
    }

    /// Ask for confirmation of a destructive action.
    ///
    /// Returns false when another confirmation is already open or running.
    pub fn request(&self, target: DeleteTarget) -> bool {
        self.state.request_delete(target)
    }

    /// Abandon the pending action; ignored while a delete is in flight
    pub fn cancel(&self) -> bool {
        self.state.cancel_delete()
    }

    pub fn pending(&self) -> Option<DeleteTarget> {
        self.state.pending_delete()
    }

    /// True while a confirmed delete has not yet settled
    pub fn busy(&self) -> bool {
        self.state.confirm_busy()
    }

    /// Dispatch the pending delete to its collection controller.
    ///
    /// The workflow stays busy until the network call settles either way,
    /// then returns to idle.
    pub async fn confirm(&self) -> ConfirmOutcome {
        let Some(target) = self.state.take_pending_delete() else {
            return ConfirmOutcome::Ignored;
        };

        tracing::debug!(kind = ?target.kind, id = %target.id, "confirmed delete");
        let result = match target.kind {
            DeleteKind::Chat => self.chats.delete(&target.id).await.map_err(|_| ()),
            DeleteKind::Message => self.messages.delete(&target.id).await.map_err(|_| ()),
            DeleteKind::Document => self.documents.delete(&target.id).await.map_err(|_| ()),
        };
        self.state.finish_delete();

        match result {
            Ok(()) => ConfirmOutcome::Deleted,
            Err(()) => ConfirmOutcome::Failed,
        }
    }
}
