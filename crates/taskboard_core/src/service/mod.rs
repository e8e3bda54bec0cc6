//! Application-level store assembly.
//!
//! # Responsibility
//! - Wire the generic store with the task-board configuration.
//! - Keep view-state and CLI layers decoupled from store construction.

pub mod core_store;
