//! HTTP request handlers.

pub mod chat;
pub mod history;
pub mod search;
