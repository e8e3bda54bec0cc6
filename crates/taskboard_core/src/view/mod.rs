//! View-state objects consumed by UI layers.
//!
//! # Responsibility
//! - Keep transient UI state in a local attribute bag.
//! - Reach the store only through `CoreStore` collection operations.
//!
//! # Invariants
//! - View-state never mutates store records except through
//!   `Collection::create` and `Model::save`.

pub mod data;
pub mod project_form;
pub mod task_card;
