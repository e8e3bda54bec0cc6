//! Task domain model.
//!
//! # Invariants
//! - `projectId` is a foreign key into the `project` collection; deleting the
//!   project does not delete its tasks.
//! - Status strings on the wire are `todo | in-progress | done`.

use crate::extension::registry::ModelExtensionContext;
use crate::extension::relation::parent_model;
use crate::store::{Model, WeakModel, WeakStore};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Entity type name of tasks.
pub const TASK_ENTITY: &str = "task";
/// Foreign-key attribute pointing at the owning project.
pub const TASK_PROJECT_KEY: &str = "projectId";

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed.
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "todo" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Typed view over a task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAttributes {
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub created_at: String,
    pub updated_at: String,
}

/// Model extension for tasks.
pub struct TaskExtension {
    store: WeakStore,
    model: WeakModel,
}

impl TaskExtension {
    pub fn new(context: ModelExtensionContext) -> Self {
        Self {
            store: context.store,
            model: context.model,
        }
    }

    /// Owning project, resolved through the `projectId` key declaration.
    pub fn project(&self) -> Option<Model> {
        let store = self.store.upgrade()?;
        let model = self.model.upgrade()?;
        parent_model(&store, &model, TASK_PROJECT_KEY)
    }

    /// Status parsed from the record; `None` for missing or unknown values.
    pub fn status(&self) -> Option<TaskStatus> {
        self.model.upgrade()?.get_str("status")?.parse().ok()
    }
}
