//! Document collection controller
//!
//! Reference documents ground RAG answers. Uploads are validated locally
//! (plain text or markdown, at most 5 MiB) before any network traffic;
//! the chunk count is server-computed and only ever observed via reload.

use std::path::Path;
use std::sync::Arc;

use crate::api::{ApiClient, Document, UploadRequest, UploadResponse};
use crate::session::SessionStore;

use super::errors::DocumentError;
use super::notify::NoticeKind;
use super::report_api_failure;
use super::state::SharedState;

/// Upload size ceiling
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Clone)]
pub struct DocumentService {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: SharedState,
}

impl DocumentService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>, state: SharedState) -> Self {
        Self {
            api,
            session,
            state,
        }
    }

    fn token(&self) -> Result<String, DocumentError> {
        self.session.token().ok_or(DocumentError::NotAuthenticated)
    }

    /// Fetch the document list and replace the collection atomically
    pub async fn refresh(&self) -> Result<Vec<Document>, DocumentError> {
        let token = self.token()?;
        match self.api.get("/api/documents/list", Some(&token)).await {
            Ok(documents) => {
                let documents: Vec<Document> = documents;
                self.state.set_documents(documents.clone());
                Ok(documents)
            }
            Err(err) => {
                report_api_failure(&self.session, &self.state, &err, "Failed to load documents.");
                Err(err.into())
            }
        }
    }

    /// Validate a file for upload without touching its contents
    pub fn validate(path: &Path, size: u64) -> Result<(), DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext) => {}
            _ => {
                return Err(DocumentError::Validation(
                    "Please upload only .txt or .md files".to_string(),
                ))
            }
        }
        if size > MAX_UPLOAD_BYTES {
            return Err(DocumentError::Validation(format!(
                "File is too large ({size} bytes); the limit is {MAX_UPLOAD_BYTES} bytes (5 MiB)"
            )));
        }
        Ok(())
    }

    /// Upload a text or markdown file.
    ///
    /// Validation happens before the file is read; read, network, and
    /// server failures each surface their own notification and leave the
    /// collection unchanged. On success the list is reloaded and the
    /// server-reported chunk count announced.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse, DocumentError> {
        let token = self.token()?;

        let size = std::fs::metadata(path)
            .map_err(|e| DocumentError::Read(e.to_string()))?
            .len();
        if let Err(err) = Self::validate(path, size) {
            self.state.announce(NoticeKind::Error, err.to_string());
            return Err(err);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                let err = DocumentError::Read(e.to_string());
                self.state.announce(NoticeKind::Error, err.to_string());
                return Err(err);
            }
        };
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.txt");

        let uploaded: UploadResponse = match self
            .api
            .post(
                "/api/documents/upload",
                &UploadRequest {
                    content: &content,
                    filename,
                },
                Some(&token),
            )
            .await
        {
            Ok(uploaded) => uploaded,
            Err(err) => {
                report_api_failure(
                    &self.session,
                    &self.state,
                    &err,
                    "Error uploading document. Please try again.",
                );
                return Err(err.into());
            }
        };

        self.refresh().await?;
        self.state.announce(
            NoticeKind::Success,
            format!(
                "Document uploaded successfully ({} chunks).",
                uploaded.chunk_count
            ),
        );
        Ok(uploaded)
    }

    /// Delete a document, then reload the list. Callers route through the
    /// delete-confirmation workflow first.
    pub async fn delete(&self, document_id: &str) -> Result<(), DocumentError> {
        let token = self.token()?;
        if let Err(err) = self
            .api
            .delete(&format!("/api/documents/{document_id}"), Some(&token))
            .await
        {
            report_api_failure(&self.session, &self.state, &err, "Failed to delete document.");
            return Err(err.into());
        }

        self.refresh().await?;
        self.state
            .announce(NoticeKind::Success, "Document deleted.");
        Ok(())
    }
}
