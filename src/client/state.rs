//! Shared client state
//!
//! Thread-safe view-model state shared between the resource controllers
//! and whatever front end renders it. All mutation goes through accessor
//! methods; collections are always replaced wholesale from an
//! authoritative fetch, never patched in place.

use std::sync::{Arc, RwLock};

use crate::api::{Chat, Document, Message};

use super::confirm::DeleteTarget;
use super::notify::{Notice, NoticeKind};

/// Cloneable handle over the interior state
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<StateInner>>,
}

#[derive(Default)]
struct StateInner {
    // ========== Chats ==========
    chats: Vec<Chat>,
    selected_chat: Option<String>,
    /// Bumped on every selection change; fetches capture it at issue time
    /// and their results are discarded if it has moved since.
    selection_gen: u64,

    // ========== Messages ==========
    messages: Vec<Message>,
    draft: String,
    sending: bool,
    editing_message: Option<String>,
    edit_buffer: String,

    // ========== Search overlay ==========
    /// While `Some`, the overlay replaces the normal message view; the
    /// per-chat cache above stays untouched.
    search_results: Option<Vec<Message>>,
    search_query: String,

    // ========== Documents ==========
    documents: Vec<Document>,

    // ========== Delete confirmation ==========
    pending_delete: Option<DeleteTarget>,
    confirm_busy: bool,

    // ========== Notifications ==========
    error_notice: Option<Notice>,
    success_notice: Option<Notice>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, StateInner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("SharedState read lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, StateInner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("SharedState write lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // ========== Chats ==========

    pub fn chats(&self) -> Vec<Chat> {
        self.read_inner().chats.clone()
    }

    /// Replace the chat collection atomically
    pub fn set_chats(&self, chats: Vec<Chat>) {
        self.write_inner().chats = chats;
    }

    pub fn selected_chat(&self) -> Option<String> {
        self.read_inner().selected_chat.clone()
    }

    pub fn chat_title(&self, chat_id: &str) -> Option<String> {
        self.read_inner()
            .chats
            .iter()
            .find(|c| c.chat_id == chat_id)
            .map(|c| c.title.clone())
    }

    /// Select a chat, invalidating the previous message list.
    ///
    /// Returns the new selection generation. Re-selecting the current
    /// chat is a no-op that keeps the existing list and generation.
    pub fn select_chat(&self, chat_id: &str) -> u64 {
        let mut inner = self.write_inner();
        if inner.selected_chat.as_deref() == Some(chat_id) {
            return inner.selection_gen;
        }
        inner.selected_chat = Some(chat_id.to_string());
        inner.selection_gen += 1;
        inner.messages.clear();
        inner.editing_message = None;
        inner.edit_buffer.clear();
        inner.selection_gen
    }

    /// Clear selection and the message list (after deleting the selected chat)
    pub fn clear_selection(&self) {
        let mut inner = self.write_inner();
        inner.selected_chat = None;
        inner.selection_gen += 1;
        inner.messages.clear();
        inner.editing_message = None;
        inner.edit_buffer.clear();
    }

    pub fn selection_generation(&self) -> u64 {
        self.read_inner().selection_gen
    }

    // ========== Messages ==========

    pub fn messages(&self) -> Vec<Message> {
        self.read_inner().messages.clone()
    }

    pub fn find_message(&self, message_id: &str) -> Option<Message> {
        self.read_inner()
            .messages
            .iter()
            .find(|m| m.message_id == message_id)
            .cloned()
    }

    /// Install a fetched message list, unless the selection has moved on
    /// since the fetch was issued. Returns false when the response was
    /// stale and discarded.
    pub fn install_messages(&self, generation: u64, messages: Vec<Message>) -> bool {
        let mut inner = self.write_inner();
        if inner.selection_gen != generation {
            tracing::debug!(
                generation,
                current = inner.selection_gen,
                "discarding stale message fetch"
            );
            return false;
        }
        inner.messages = messages;
        true
    }

    pub fn draft(&self) -> String {
        self.read_inner().draft.clone()
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        self.write_inner().draft = draft.into();
    }

    /// Claim the single-flight send slot; false if a send is outstanding
    pub fn try_begin_send(&self) -> bool {
        let mut inner = self.write_inner();
        if inner.sending {
            return false;
        }
        inner.sending = true;
        true
    }

    pub fn end_send(&self) {
        self.write_inner().sending = false;
    }

    pub fn is_sending(&self) -> bool {
        self.read_inner().sending
    }

    // ========== Edit ==========

    pub fn editing_message(&self) -> Option<String> {
        self.read_inner().editing_message.clone()
    }

    pub fn edit_buffer(&self) -> String {
        self.read_inner().edit_buffer.clone()
    }

    pub fn begin_editing(&self, message_id: &str, content: &str) {
        let mut inner = self.write_inner();
        inner.editing_message = Some(message_id.to_string());
        inner.edit_buffer = content.to_string();
    }

    pub fn set_edit_buffer(&self, content: impl Into<String>) {
        self.write_inner().edit_buffer = content.into();
    }

    pub fn clear_editing(&self) {
        let mut inner = self.write_inner();
        inner.editing_message = None;
        inner.edit_buffer.clear();
    }

    // ========== Search overlay ==========

    /// The message set the UI should render: search results while the
    /// overlay is active, the per-chat list otherwise.
    pub fn visible_messages(&self) -> Vec<Message> {
        let inner = self.read_inner();
        match &inner.search_results {
            Some(results) => results.clone(),
            None => inner.messages.clone(),
        }
    }

    pub fn in_search(&self) -> bool {
        self.read_inner().search_results.is_some()
    }

    pub fn search_query(&self) -> String {
        self.read_inner().search_query.clone()
    }

    pub fn enter_search(&self, query: &str, results: Vec<Message>) {
        let mut inner = self.write_inner();
        inner.search_query = query.to_string();
        inner.search_results = Some(results);
    }

    /// Leave the overlay; the per-chat cache is restored untouched and no
    /// re-fetch happens.
    pub fn clear_search(&self) {
        let mut inner = self.write_inner();
        inner.search_results = None;
        inner.search_query.clear();
    }

    // ========== Documents ==========

    pub fn documents(&self) -> Vec<Document> {
        self.read_inner().documents.clone()
    }

    pub fn set_documents(&self, documents: Vec<Document>) {
        self.write_inner().documents = documents;
    }

    pub fn document_name(&self, document_id: &str) -> Option<String> {
        self.read_inner()
            .documents
            .iter()
            .find(|d| d.document_id == document_id)
            .map(|d| d.filename.clone())
    }

    // ========== Delete confirmation ==========

    pub fn pending_delete(&self) -> Option<DeleteTarget> {
        self.read_inner().pending_delete.clone()
    }

    pub fn confirm_busy(&self) -> bool {
        self.read_inner().confirm_busy
    }

    /// Enter Pending; refused while another confirmation is open or running
    pub fn request_delete(&self, target: DeleteTarget) -> bool {
        let mut inner = self.write_inner();
        if inner.pending_delete.is_some() || inner.confirm_busy {
            return false;
        }
        inner.pending_delete = Some(target);
        true
    }

    /// Pending -> Idle; refused while the dispatched delete is in flight
    pub fn cancel_delete(&self) -> bool {
        let mut inner = self.write_inner();
        if inner.confirm_busy {
            return false;
        }
        inner.pending_delete.take().is_some()
    }

    /// Pending -> busy, handing the target to the dispatcher
    pub fn take_pending_delete(&self) -> Option<DeleteTarget> {
        let mut inner = self.write_inner();
        if inner.confirm_busy {
            return None;
        }
        let target = inner.pending_delete.take();
        if target.is_some() {
            inner.confirm_busy = true;
        }
        target
    }

    /// Busy -> Idle, once the underlying delete has settled
    pub fn finish_delete(&self) {
        self.write_inner().confirm_busy = false;
    }

    // ========== Notifications ==========

    /// Post a notification, replacing any previous one of the same kind
    pub fn announce(&self, kind: NoticeKind, message: impl Into<String>) {
        let notice = Notice::new(kind, message);
        let mut inner = self.write_inner();
        match kind {
            NoticeKind::Success => inner.success_notice = Some(notice),
            NoticeKind::Error => inner.error_notice = Some(notice),
        }
    }

    /// Currently visible notifications; expired ones are dropped here
    pub fn active_notices(&self) -> Vec<Notice> {
        let mut inner = self.write_inner();
        if inner.error_notice.as_ref().is_some_and(Notice::is_expired) {
            inner.error_notice = None;
        }
        if inner.success_notice.as_ref().is_some_and(Notice::is_expired) {
            inner.success_notice = None;
        }
        inner
            .error_notice
            .iter()
            .chain(inner.success_notice.iter())
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn with_notice_mut(&self, kind: NoticeKind, f: impl FnOnce(&mut Notice)) {
        let mut inner = self.write_inner();
        let slot = match kind {
            NoticeKind::Success => &mut inner.success_notice,
            NoticeKind::Error => &mut inner.error_notice,
        };
        if let Some(notice) = slot.as_mut() {
            f(notice);
        }
    }
}
