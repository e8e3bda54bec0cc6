//! Extension attachment for models and collections.
//!
//! Extensions add entity-specific derived values without changing the
//! generic `Model`/`Collection` types. They read other collections through
//! the store and write only through `create`/`save`/`update`.

pub mod memo;
pub mod registry;
pub mod relation;
