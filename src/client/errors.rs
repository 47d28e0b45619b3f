//! Typed errors for the resource controllers
//!
//! Each service has its own error type so the front end can react per
//! resource. `Validation` variants are raised before any network call.

use crate::api::ApiError;
use thiserror::Error;

/// Errors from ChatService
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Errors from MessageService
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No chat selected")]
    NoChatSelected,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Api(#[from] ApiError),
}

impl From<ChatError> for MessageError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotAuthenticated => MessageError::NotAuthenticated,
            ChatError::Api(api) => MessageError::Api(api),
        }
    }
}

/// Errors from DocumentService
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("Error reading file: {0}")]
    Read(String),

    #[error("{0}")]
    Api(#[from] ApiError),
}

/// Errors from ProfileService
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Api(#[from] ApiError),
}
