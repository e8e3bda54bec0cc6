//! Project/task domain built on the generic store.
//!
//! # Responsibility
//! - Define project and task attributes and their wire enums.
//! - Provide the extensions that derive cross-entity values.
//!
//! # Invariants
//! - Tasks reference projects by `projectId`; there is no cascading delete.

pub mod project;
pub mod task;
