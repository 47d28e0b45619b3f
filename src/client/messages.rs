//! Message collection controller
//!
//! Owns the message list of the selected chat: load, optimistic send with
//! draft rollback, in-place edit, delete, and the cross-chat search
//! overlay. Mutations never patch the list locally; they re-fetch both
//! the messages and the chat summary so the server stays authoritative.

use std::sync::Arc;

use crate::api::{
    ApiClient, EditMessageRequest, Message, SearchRequest, SearchResponse, SendMessageRequest,
};
use crate::session::SessionStore;

use super::chats::ChatService;
use super::errors::MessageError;
use super::notify::NoticeKind;
use super::report_api_failure;
use super::state::SharedState;

#[derive(Clone)]
pub struct MessageService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: SharedState,
    chats: ChatService,
    search_limit: usize,
}

impl MessageService {
    pub fn new(
        api: Arc<ApiClient>,
        session: Arc<SessionStore>,
        state: SharedState,
        chats: ChatService,
        search_limit: usize,
    ) -> Self {
        Self {
            api,
            session,
            state,
            chats,
            search_limit,
        }
    }

    fn token(&self) -> Result<String, MessageError> {
        self.session.token().ok_or(MessageError::NotAuthenticated)
    }

    /// Load the message history for a chat, selecting it if needed.
    ///
    /// Selecting a different chat clears the previous list before the
    /// fetch; the fetch captures the selection generation so a slow
    /// response arriving after another switch is discarded.
    pub async fn load(&self, chat_id: &str) -> Result<(), MessageError> {
        let token = self.token()?;
        let generation = self.state.select_chat(chat_id);

        match self
            .api
            .get::<Vec<Message>>(&format!("/api/chat/{chat_id}/messages"), Some(&token))
            .await
        {
            Ok(messages) => {
                self.state.install_messages(generation, messages);
                Ok(())
            }
            Err(err) => {
                report_api_failure(&self.session, &self.state, &err, "Failed to load messages.");
                Err(err.into())
            }
        }
    }

    /// Send the current draft to the selected chat.
    ///
    /// Single-flight: returns `Ok(false)` without doing anything when a
    /// send is already outstanding. The draft is cleared optimistically
    /// and restored on failure; the message itself is never appended
    /// locally - it appears through the authoritative reload.
    pub async fn send(&self, use_rag: bool) -> Result<bool, MessageError> {
        let token = self.token()?;
        let chat_id = self
            .state
            .selected_chat()
            .ok_or(MessageError::NoChatSelected)?;
        let generation = self.state.selection_generation();

        if !self.state.try_begin_send() {
            return Ok(false);
        }

        let draft = self.state.draft();
        if draft.trim().is_empty() {
            self.state.end_send();
            return Err(MessageError::Validation(
                "Message cannot be empty".to_string(),
            ));
        }
        self.state.set_draft("");

        let result = self
            .api
            .post_unit(
                "/api/chat/message",
                &SendMessageRequest {
                    chat_id: &chat_id,
                    content: draft.trim(),
                    use_rag,
                },
                Some(&token),
            )
            .await;

        match result {
            Ok(()) => {
                let reload = self.reload_after_mutation(&chat_id, generation).await;
                self.state.end_send();
                reload?;
                Ok(true)
            }
            Err(err) => {
                // Give the user their text back
                self.state.set_draft(draft);
                report_api_failure(
                    &self.session,
                    &self.state,
                    &err,
                    "Failed to send message. Please try again.",
                );
                self.state.end_send();
                Err(err.into())
            }
        }
    }

    /// Edit a user-authored message; assistant messages are rejected
    /// locally before any network call.
    pub async fn edit(&self, message_id: &str, content: &str) -> Result<(), MessageError> {
        let token = self.token()?;
        let chat_id = self
            .state
            .selected_chat()
            .ok_or(MessageError::NoChatSelected)?;
        let generation = self.state.selection_generation();

        let message = self
            .state
            .find_message(message_id)
            .ok_or_else(|| MessageError::Validation("Message not found".to_string()))?;
        if !message.is_user_message {
            return Err(MessageError::Validation(
                "Only your own messages can be edited".to_string(),
            ));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(MessageError::Validation(
                "Message cannot be empty".to_string(),
            ));
        }

        if let Err(err) = self
            .api
            .put_unit(
                &format!("/api/chat/message/{message_id}"),
                &EditMessageRequest { content },
                Some(&token),
            )
            .await
        {
            report_api_failure(&self.session, &self.state, &err, "Failed to edit message.");
            return Err(err.into());
        }

        // Reload so isEdited/editedAt come from the server
        self.fetch_into(&chat_id, generation).await
    }

    /// Submit the open edit buffer. On failure the buffer and editing
    /// state stay as they were so the user can retry.
    pub async fn submit_edit(&self) -> Result<(), MessageError> {
        let message_id = self
            .state
            .editing_message()
            .ok_or_else(|| MessageError::Validation("No edit in progress".to_string()))?;
        let buffer = self.state.edit_buffer();

        self.edit(&message_id, &buffer).await?;
        self.state.clear_editing();
        Ok(())
    }

    /// Delete a message, then re-fetch both the list and the chat summary
    /// (the message count changed). Callers route through the
    /// delete-confirmation workflow first.
    pub async fn delete(&self, message_id: &str) -> Result<(), MessageError> {
        let token = self.token()?;
        let chat_id = self
            .state
            .selected_chat()
            .ok_or(MessageError::NoChatSelected)?;
        let generation = self.state.selection_generation();

        if let Err(err) = self
            .api
            .delete(&format!("/api/chat/message/{message_id}"), Some(&token))
            .await
        {
            report_api_failure(&self.session, &self.state, &err, "Failed to delete message.");
            return Err(err.into());
        }

        self.reload_after_mutation(&chat_id, generation).await?;
        self.state.announce(NoticeKind::Success, "Message deleted.");
        Ok(())
    }

    /// Full-text search across all the user's chats. The results replace
    /// the visible message set until the overlay is cleared; the per-chat
    /// cache is not touched. An empty query leaves search.
    pub async fn search(&self, query: &str) -> Result<(), MessageError> {
        let query = query.trim();
        if query.is_empty() {
            self.state.clear_search();
            return Ok(());
        }
        let token = self.token()?;

        match self
            .api
            .post::<SearchResponse>(
                "/api/chat/search",
                &SearchRequest {
                    query,
                    limit: self.search_limit,
                },
                Some(&token),
            )
            .await
        {
            Ok(response) => {
                self.state.enter_search(query, response.results);
                Ok(())
            }
            Err(err) => {
                report_api_failure(
                    &self.session,
                    &self.state,
                    &err,
                    "Search failed. Please try again.",
                );
                Err(err.into())
            }
        }
    }

    /// Leave the search overlay; the previous per-chat view comes back
    /// without a re-fetch.
    pub fn clear_search(&self) {
        self.state.clear_search();
    }

    /// Re-fetch a chat's messages without touching the selection.
    ///
    /// The result is installed only while `generation` is still current,
    /// so a mutation that settles after the user switched chats changes
    /// nothing. Going through `load` here would re-select the originating
    /// chat and let a late completion steal the view.
    async fn fetch_into(&self, chat_id: &str, generation: u64) -> Result<(), MessageError> {
        let token = self.token()?;
        match self
            .api
            .get::<Vec<Message>>(&format!("/api/chat/{chat_id}/messages"), Some(&token))
            .await
        {
            Ok(messages) => {
                self.state.install_messages(generation, messages);
                Ok(())
            }
            Err(err) => {
                report_api_failure(&self.session, &self.state, &err, "Failed to load messages.");
                Err(err.into())
            }
        }
    }

    /// After a server-side mutation: refresh the message list (stale
    /// results discarded) and the chat summaries (always, the counts
    /// changed regardless of what is selected now).
    async fn reload_after_mutation(
        &self,
        chat_id: &str,
        generation: u64,
    ) -> Result<(), MessageError> {
        self.fetch_into(chat_id, generation).await?;
        self.chats.refresh().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use std::time::Duration;
    use tempfile::TempDir;

    fn authed_service() -> (TempDir, SharedState, MessageService) {
        let dir = TempDir::new().unwrap();
        let api =
            Arc::new(ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap());
        let session = Arc::new(SessionStore::new(Arc::clone(&api), dir.path()));

        let record = serde_json::to_string(&Session {
            user_id: "u1".to_string(),
            username: "ada".to_string(),
            session_token: "tok".to_string(),
        })
        .unwrap();
        std::fs::write(dir.path().join("session.json"), record).unwrap();
        session.restore();

        let state = SharedState::new();
        let chats = ChatService::new(Arc::clone(&api), Arc::clone(&session), state.clone());
        let service = MessageService::new(api, session, state.clone(), chats, 50);
        (dir, state, service)
    }

    fn assistant_msg(id: &str) -> Message {
        Message {
            message_id: id.to_string(),
            content: "assistant reply".to_string(),
            is_user_message: false,
            timestamp: 0,
            is_edited: false,
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn send_requires_selected_chat() {
        let (_dir, state, service) = authed_service();
        state.set_draft("hello");
        assert!(matches!(
            service.send(false).await,
            Err(MessageError::NoChatSelected)
        ));
        // Draft is untouched by a precondition failure
        assert_eq!(state.draft(), "hello");
    }

    #[tokio::test]
    async fn send_rejects_blank_draft() {
        let (_dir, state, service) = authed_service();
        state.select_chat("c1");
        state.set_draft("   ");
        assert!(matches!(
            service.send(false).await,
            Err(MessageError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn second_send_is_a_noop_while_one_is_in_flight() {
        let (_dir, state, service) = authed_service();
        state.select_chat("c1");
        state.set_draft("hello");

        // Simulate an outstanding send
        assert!(state.try_begin_send());
        let result = service.send(false).await.unwrap();
        assert!(!result);
        // The no-op did not consume the draft
        assert_eq!(state.draft(), "hello");
    }

    #[tokio::test]
    async fn failed_send_restores_draft() {
        let (_dir, state, service) = authed_service();
        state.select_chat("c1");
        state.set_draft("important words");

        // Unroutable server: the POST fails
        assert!(service.send(false).await.is_err());
        assert_eq!(state.draft(), "important words");
        assert!(!state.is_sending());
    }

    #[tokio::test]
    async fn editing_an_assistant_message_is_rejected_locally() {
        let (_dir, state, service) = authed_service();
        let generation = state.select_chat("c1");
        state.install_messages(generation, vec![assistant_msg("m1")]);

        // An unroutable API would yield a network error; Validation
        // proves no call was attempted.
        let result = service.edit("m1", "new content").await;
        assert!(matches!(result, Err(MessageError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_search_clears_the_overlay() {
        let (_dir, state, service) = authed_service();
        state.enter_search("old", vec![assistant_msg("s1")]);

        service.search("   ").await.unwrap();
        assert!(!state.in_search());
    }
}
