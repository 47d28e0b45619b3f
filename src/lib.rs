//! forgechat: terminal client for the MemoryForge RAG chat service
//!
//! This library provides:
//! - A typed API gateway over the backend's JSON-over-HTTP interface
//! - A session store with persisted credentials across runs
//! - Resource controllers for chats, messages, and documents that keep
//!   local state reconciled against the server
//! - A delete-confirmation workflow and auto-expiring notifications

pub mod api;
pub mod client;
pub mod config;
pub mod session;

pub use client::Client;
pub use config::Config;
pub use session::{Session, SessionStore};
