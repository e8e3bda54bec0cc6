//! Core domain logic for the task board.
//! This crate is the single source of truth for project/task state.

pub mod extension;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod view;

pub use extension::registry::{
    CollectionExtensionContext, ExtensionError, ExtensionRegistry, ModelExtensionContext,
};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogSetup, LogTarget,
    LoggingError,
};
pub use model::project::{
    ProjectAttributes, ProjectCollectionExtension, ProjectExtension, ProjectStatus,
};
pub use model::task::{TaskAttributes, TaskExtension, TaskPriority, TaskStatus};
pub use service::core_store::{core_extensions, core_store_config, CoreStore};
pub use store::config::{ConfigError, EntityConfig, RelationConfig, StoreConfig};
pub use store::context::{current_store, provide, StoreProvider};
pub use store::record::{record, Record};
pub use store::subscription::{CollectionEvent, SubscriptionId};
pub use store::{Collection, Model, Store, StoreError, StoreResult};
pub use view::data::{ViewData, ViewProps, ViewType};
pub use view::project_form::{FormAction, FormError, ProjectFormState, ProjectFormValues};
pub use view::task_card::{CardView, TaskCardState};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
