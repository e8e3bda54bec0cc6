//! Project domain model and its derived values.
//!
//! # Responsibility
//! - Define project attributes and lifecycle status.
//! - Derive task membership, task count and completion progress.
//!
//! # Invariants
//! - `progress()` is an integer percentage in `0..=100`; a project without
//!   tasks has progress 0.
//! - Derived values are recomputed whenever the store revision changes, so a
//!   cached value always equals a fresh computation.

use crate::extension::memo::{Memo, MemoMap};
use crate::extension::registry::{CollectionExtensionContext, ModelExtensionContext};
use crate::extension::relation::related_models;
use crate::model::task::TaskStatus;
use crate::store::{Model, WeakCollection, WeakModel, WeakStore};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Entity type name of projects.
pub const PROJECT_ENTITY: &str = "project";
/// Relation from a project to its tasks.
pub const PROJECT_TASKS_RELATION: &str = "tasks";
/// Shown when a project has no name.
pub const UNTITLED_PROJECT: &str = "Untitled Project";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [Self::Active, Self::Completed, Self::Archived];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown project status `{value}`"))
    }
}

/// Typed view over a project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAttributes {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Model extension for projects.
pub struct ProjectExtension {
    store: WeakStore,
    model: WeakModel,
    tasks: Memo<Vec<Model>>,
}

impl ProjectExtension {
    pub fn new(context: ModelExtensionContext) -> Self {
        Self {
            store: context.store,
            model: context.model,
            tasks: Memo::new(),
        }
    }

    /// Project name, or `Untitled Project` when it is empty or unset.
    pub fn display_name(&self) -> String {
        self.model
            .upgrade()
            .and_then(|model| model.get_str("name"))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNTITLED_PROJECT.to_string())
    }

    /// Tasks whose `projectId` is this project's id.
    pub fn tasks(&self) -> Vec<Model> {
        let (Some(store), Some(model)) = (self.store.upgrade(), self.model.upgrade()) else {
            return Vec::new();
        };
        self.tasks.get_or_compute(store.revision(), || {
            related_models(&store, &model, PROJECT_TASKS_RELATION)
        })
    }

    pub fn task_count(&self) -> usize {
        self.tasks().len()
    }

    /// Number of related tasks with status `done`.
    pub fn completed_count(&self) -> usize {
        self.tasks()
            .iter()
            .filter(|task| task.get_str("status").as_deref() == Some(TaskStatus::Done.as_str()))
            .count()
    }

    /// Rounded percentage of related tasks that are done; 0 without tasks.
    pub fn progress(&self) -> u32 {
        completion_percentage(self.completed_count(), self.task_count())
    }
}

/// Collection extension for projects.
///
/// Caches matching ids only; handles are rebuilt on each read so the cache
/// never keeps the collection alive.
pub struct ProjectCollectionExtension {
    collection: WeakCollection,
    by_status: MemoMap<ProjectStatus, Vec<String>>,
}

impl ProjectCollectionExtension {
    pub fn new(context: CollectionExtensionContext) -> Self {
        Self {
            collection: context.collection,
            by_status: MemoMap::new(),
        }
    }

    pub fn active_projects(&self) -> Vec<Model> {
        self.by_status(ProjectStatus::Active)
    }

    pub fn completed_projects(&self) -> Vec<Model> {
        self.by_status(ProjectStatus::Completed)
    }

    pub fn by_status(&self, status: ProjectStatus) -> Vec<Model> {
        let Some(collection) = self.collection.upgrade() else {
            return Vec::new();
        };
        let ids = self
            .by_status
            .get_or_compute(&status, collection.version(), || {
                collection
                    .filter(|raw| {
                        raw.get("status").and_then(|value| value.as_str()) == Some(status.as_str())
                    })
                    .iter()
                    .map(|model| model.id().to_string())
                    .collect()
            });
        collection.get_models(ids)
    }
}

/// `done / total` as a rounded percentage; 0 when `total` is 0.
pub fn completion_percentage(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::{completion_percentage, ProjectStatus};

    #[test]
    fn completion_percentage_handles_empty_and_rounding() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(2, 4), 50);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(2, 2), 100);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>(), Ok(status));
        }
        assert!("paused".parse::<ProjectStatus>().is_err());
    }
}
