//! Short-lived user-facing announcements
//!
//! One active notification per kind; announcing a new one replaces the
//! previous rather than queuing. Expiry is a display concern evaluated on
//! read and never touches controller state.

use std::time::{Duration, Instant};

/// How long an error stays visible
pub const ERROR_TTL: Duration = Duration::from_secs(5);
/// How long a success stays visible
pub const SUCCESS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A single auto-expiring announcement
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        let ttl = match kind {
            NoticeKind::Success => SUCCESS_TTL,
            NoticeKind::Error => ERROR_TTL,
        };
        Self {
            kind,
            message: message.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
