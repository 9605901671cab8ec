//! Chat history for Lorekeeper.
//!
//! `ChatRepository` is the storage port; `HistoryStore` layers role
//! validation and chronological ordering on top of it.

pub mod history;
pub mod repository;
