//! View state behind one task card.

use crate::service::core_store::CoreStore;
use crate::store::record::{record, Record};
use crate::store::{Model, StoreResult};
use crate::view::data::{ViewData, ViewProps, ViewType};
use serde_json::Value;
use std::fmt::{Display, Formatter};

pub const TASK_ID: &str = "taskId";
pub const PROJECT_ID: &str = "projectId";
pub const IS_LOADING: &str = "isLoading";
pub const IS_EDITING: &str = "isEditing";
pub const IS_EXPANDED: &str = "isExpanded";

/// Which variant of the card to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardView {
    Loading,
    Editing,
    Expanded,
    Default,
}

impl CardView {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Editing => "editing",
            Self::Expanded => "expanded",
            Self::Default => "default",
        }
    }
}

impl Display for CardView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct TaskCardState {
    store: CoreStore,
    data: ViewData,
}

impl TaskCardState {
    pub fn new(store: CoreStore, props: ViewProps) -> Self {
        Self {
            store,
            data: ViewData::new(props),
        }
    }

    /// Builds the state against the store provided to this thread.
    ///
    /// # Errors
    /// - `MissingContext` when no provider is alive.
    pub fn from_context(props: ViewProps) -> StoreResult<Self> {
        Ok(Self::new(CoreStore::current()?, props))
    }

    pub fn store(&self) -> &CoreStore {
        &self.store
    }

    /// Loading wins over editing, editing over expanded.
    pub fn view(&self) -> CardView {
        if self.data.flag(IS_LOADING) {
            CardView::Loading
        } else if self.data.flag(IS_EDITING) {
            CardView::Editing
        } else if self.data.flag(IS_EXPANDED) {
            CardView::Expanded
        } else {
            CardView::Default
        }
    }

    /// The task named by `taskId`, if it still exists.
    pub fn task(&self) -> Option<Model> {
        let task_id = self.data.get_str(TASK_ID)?;
        self.store.tasks().get_model(task_id)
    }

    pub fn toggle_expand(&mut self) {
        let expanded = self.data.flag(IS_EXPANDED);
        self.save(flag_record(IS_EXPANDED, !expanded));
    }

    pub fn start_editing(&mut self) {
        self.save(flag_record(IS_EDITING, true));
    }

    pub fn stop_editing(&mut self) {
        self.save(flag_record(IS_EDITING, false));
    }
}

impl ViewType for TaskCardState {
    fn view_data(&self) -> &ViewData {
        &self.data
    }

    fn view_data_mut(&mut self) -> &mut ViewData {
        &mut self.data
    }
}

fn flag_record(attr: &str, value: bool) -> Record {
    record([(attr, Value::Bool(value))])
}
