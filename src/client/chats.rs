//! Chat collection controller
//!
//! Keeps the thread list ordered most-recently-active first. Counts and
//! recency are server-computed; every mutation is followed by a reload
//! rather than a local patch.

use std::sync::Arc;

use chrono::Local;

use crate::api::{ApiClient, Chat, CreateChatRequest, CreateChatResponse};
use crate::session::SessionStore;

use super::errors::ChatError;
use super::notify::NoticeKind;
use super::report_api_failure;
use super::state::SharedState;

#[derive(Clone)]
pub struct ChatService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: SharedState,
}

impl ChatService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>, state: SharedState) -> Self {
        Self {
            api,
            session,
            state,
        }
    }

    fn token(&self) -> Result<String, ChatError> {
        self.session.token().ok_or(ChatError::NotAuthenticated)
    }

    /// Fetch the chat list and replace the collection atomically.
    ///
    /// Sorted by `last_message_at` descending (stable, so server order
    /// breaks ties). Auto-selects the most recent chat when nothing is
    /// selected yet.
    pub async fn refresh(&self) -> Result<Vec<Chat>, ChatError> {
        let token = self.token()?;
        let mut chats: Vec<Chat> = match self.api.get("/api/chat/list", Some(&token)).await {
            Ok(chats) => chats,
            Err(err) => {
                report_api_failure(
                    &self.session,
                    &self.state,
                    &err,
                    "Failed to load chats. Please refresh the page.",
                );
                return Err(err.into());
            }
        };

        chats.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        self.state.set_chats(chats.clone());

        if self.state.selected_chat().is_none() {
            if let Some(first) = chats.first() {
                self.state.select_chat(&first.chat_id);
            }
        }
        Ok(chats)
    }

    /// Create a new chat and select it. The title defaults to the current
    /// local date when no hint is given.
    pub async fn create(&self, title_hint: Option<&str>) -> Result<String, ChatError> {
        let token = self.token()?;
        let title = match title_hint {
            Some(hint) if !hint.trim().is_empty() => hint.trim().to_string(),
            _ => format!("Chat {}", Local::now().format("%Y-%m-%d")),
        };

        let created: CreateChatResponse = match self
            .api
            .post(
                "/api/chat/create",
                &CreateChatRequest { title: &title },
                Some(&token),
            )
            .await
        {
            Ok(created) => created,
            Err(err) => {
                report_api_failure(&self.session, &self.state, &err, "Failed to create new chat.");
                return Err(err.into());
            }
        };

        self.refresh().await?;
        self.state.select_chat(&created.chat_id);
        Ok(created.chat_id)
    }

    /// Delete a chat. If it was the selected one, selection and the
    /// message list are cleared before the list reload. Callers route
    /// through the delete-confirmation workflow first.
    pub async fn delete(&self, chat_id: &str) -> Result<(), ChatError> {
        let token = self.token()?;
        if let Err(err) = self
            .api
            .delete(&format!("/api/chat/{chat_id}"), Some(&token))
            .await
        {
            report_api_failure(&self.session, &self.state, &err, "Failed to delete chat.");
            return Err(err.into());
        }

        if self.state.selected_chat().as_deref() == Some(chat_id) {
            self.state.clear_selection();
        }
        self.refresh().await?;
        self.state.announce(NoticeKind::Success, "Chat deleted.");
        Ok(())
    }
}
