//! Conversation-state controllers
//!
//! The resource controllers keep four loosely-coupled collections
//! (session, chats, messages, documents) consistent with the backend.
//! They share one [`SharedState`] view-model; every mutation reconciles
//! by re-fetching from the server rather than patching locally.

pub mod chats;
pub mod confirm;
pub mod documents;
pub mod errors;
pub mod messages;
pub mod notify;
pub mod profile;
pub mod state;

pub use chats::ChatService;
pub use confirm::{ConfirmOutcome, ConfirmService, DeleteKind, DeleteTarget};
pub use documents::DocumentService;
pub use errors::{ChatError, DocumentError, MessageError, ProfileError};
pub use messages::MessageService;
pub use notify::{Notice, NoticeKind};
pub use profile::ProfileService;
pub use state::SharedState;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::session::SessionStore;

/// Post the appropriate failure notice for an API error.
///
/// A 401 means the credential itself was rejected: the session is
/// dropped so the user is prompted to log in again instead of seeing
/// the same failure on every action. Anything else surfaces the
/// caller's message.
pub(crate) fn report_api_failure(
    session: &SessionStore,
    state: &SharedState,
    err: &ApiError,
    fallback: &str,
) {
    if err.is_unauthorized() {
        session.forget();
        state.announce(
            NoticeKind::Error,
            "Session expired. Please log in again.",
        );
    } else {
        state.announce(NoticeKind::Error, fallback);
    }
}

/// Fully wired client: session store plus all resource controllers over
/// one shared state.
pub struct Client {
    pub session: Arc<SessionStore>,
    pub state: SharedState,
    pub chats: ChatService,
    pub messages: MessageService,
    pub documents: DocumentService,
    pub confirm: ConfirmService,
    pub profile: ProfileService,
}

impl Client {
    /// Wire a client against the configured backend, persisting the
    /// session under `data_dir`. The persisted session is restored here,
    /// before any controller can issue a call.
    pub fn new(config: &Config, data_dir: &Path) -> anyhow::Result<Self> {
        let api = Arc::new(ApiClient::new(
            &config.server.base_url,
            Duration::from_secs(config.server.timeout_secs),
        )?);
        let session = Arc::new(SessionStore::new(Arc::clone(&api), data_dir));
        session.restore();

        let state = SharedState::new();
        let chats = ChatService::new(Arc::clone(&api), Arc::clone(&session), state.clone());
        let messages = MessageService::new(
            Arc::clone(&api),
            Arc::clone(&session),
            state.clone(),
            chats.clone(),
            config.search.result_limit,
        );
        let documents =
            DocumentService::new(Arc::clone(&api), Arc::clone(&session), state.clone());
        let confirm = ConfirmService::new(
            state.clone(),
            chats.clone(),
            messages.clone(),
            documents.clone(),
        );
        let profile = ProfileService::new(api, Arc::clone(&session), state.clone());

        Ok(Self {
            session,
            state,
            chats,
            messages,
            documents,
            confirm,
            profile,
        })
    }
}
