//! Wire types for the MemoryForge HTTP API
//!
//! The backend speaks camelCase JSON with unix-second timestamps.

use serde::{Deserialize, Serialize};

/// A chat thread summary as returned by `/api/chat/list`
///
/// `message_count` and `last_message_at` are server-computed; the client
/// never updates them locally, it re-fetches after any mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub chat_id: String,
    pub title: String,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub last_message_at: i64,
}

/// A single message within a chat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub content: String,
    pub is_user_message: bool,
    pub timestamp: i64,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<i64>,
}

/// An uploaded reference document used for retrieval grounding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    pub filename: String,
    /// Server-computed after chunking; never predicted client-side
    pub chunk_count: usize,
    #[serde(default)]
    pub uploaded_at: i64,
    #[serde(default)]
    pub file_size: u64,
}

/// The user's profile as returned by `/api/user/profile`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

// ---- Request bodies ----

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `email` is omitted entirely when absent, not sent as an empty string
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CreateChatRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub content: &'a str,
    #[serde(rename = "useRAG")]
    pub use_rag: bool,
}

#[derive(Debug, Serialize)]
pub struct EditMessageRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadRequest<'a> {
    pub content: &'a str,
    pub filename: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileRequest<'a> {
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

// ---- Response bodies ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatResponse {
    pub chat_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub document_id: String,
    pub chunk_count: usize,
}
