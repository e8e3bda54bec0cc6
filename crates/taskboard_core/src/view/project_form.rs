//! Form state for creating and editing projects.
//!
//! # Responsibility
//! - Decide between create and edit from the local `projectId`.
//! - Provide initial values and validation rules for the form.
//! - Turn a submission into a project create or update.
//!
//! # Invariants
//! - Invalid values never reach the store.
//! - `isSubmitting` is `true` only while the store write runs and is reset
//!   even when the write fails.
//! - `on_success` runs at most once per submission, after the write.

use crate::model::project::ProjectStatus;
use crate::service::core_store::CoreStore;
use crate::store::record::{record, Record};
use crate::store::{Model, StoreResult};
use crate::view::data::{ViewData, ViewProps, ViewType};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

pub const PROJECT_ID: &str = "projectId";
pub const IS_SUBMITTING: &str = "isSubmitting";
pub const NAME_MIN_LENGTH: usize = 3;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;

type SuccessCallback = Box<dyn FnMut(&Model)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Create,
    Edit,
}

impl FormAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
        }
    }
}

/// Values edited by the project form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFormValues {
    pub name: String,
    pub description: String,
    /// Kept as text: the form may hold a value outside `ProjectStatus`.
    pub status: String,
}

impl Default for ProjectFormValues {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            status: ProjectStatus::Active.as_str().to_string(),
        }
    }
}

impl ProjectFormValues {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn to_record(&self) -> Record {
        record([
            ("name", Value::String(self.name.clone())),
            ("description", Value::String(self.description.clone())),
            ("status", Value::String(self.status.clone())),
        ])
    }
}

/// Constraints on one text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub one_of: Vec<&'static str>,
}

impl FieldRule {
    /// First violated constraint. Lengths count characters; an empty optional
    /// field skips the length and membership checks.
    pub fn check(&self, field: &'static str, value: &str) -> Option<FieldError> {
        if value.trim().is_empty() {
            return self.required.then_some(FieldError::Required { field });
        }
        let length = value.chars().count();
        if let Some(min) = self.min_length.filter(|min| length < *min) {
            return Some(FieldError::TooShort { field, min });
        }
        if let Some(max) = self.max_length.filter(|max| length > *max) {
            return Some(FieldError::TooLong { field, max });
        }
        if !self.one_of.is_empty() && !self.one_of.iter().any(|allowed| *allowed == value) {
            return Some(FieldError::NotAllowed {
                field,
                value: value.to_string(),
            });
        }
        None
    }
}

/// Validation rules of the project form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub name: FieldRule,
    pub description: FieldRule,
    pub status: FieldRule,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            name: FieldRule {
                required: true,
                min_length: Some(NAME_MIN_LENGTH),
                ..FieldRule::default()
            },
            description: FieldRule {
                max_length: Some(DESCRIPTION_MAX_LENGTH),
                ..FieldRule::default()
            },
            status: FieldRule {
                required: true,
                one_of: ProjectStatus::ALL.iter().map(|status| status.as_str()).collect(),
                ..FieldRule::default()
            },
        }
    }
}

impl ValidationRules {
    /// Checks every field and reports all violations together.
    pub fn validate(&self, values: &ProjectFormValues) -> Result<(), ValidationErrors> {
        let errors: Vec<FieldError> = [
            self.name.check("name", &values.name),
            self.description.check("description", &values.description),
            self.status.check("status", &values.status),
        ]
        .into_iter()
        .flatten()
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Required { field: &'static str },
    TooShort { field: &'static str, min: usize },
    TooLong { field: &'static str, max: usize },
    NotAllowed { field: &'static str, value: String },
}

impl FieldError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::NotAllowed { field, .. } => field,
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required { field } => write!(f, "{field} is required"),
            Self::TooShort { field, min } => {
                write!(f, "{field} must be at least {min} characters")
            }
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::NotAllowed { field, value } => write!(f, "{field} `{value}` is not allowed"),
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field() == field)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl Error for ValidationErrors {}

/// Project form submission errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    Invalid(ValidationErrors),
    /// Edit target was removed after the form opened.
    ProjectNotFound(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "invalid project form: {errors}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
        }
    }
}

impl Error for FormError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::ProjectNotFound(_) => None,
        }
    }
}

impl From<ValidationErrors> for FormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Invalid(value)
    }
}

pub struct ProjectFormState {
    store: CoreStore,
    data: ViewData,
    on_success: Option<SuccessCallback>,
}

impl ProjectFormState {
    pub fn new(store: CoreStore, props: ViewProps) -> Self {
        Self {
            store,
            data: ViewData::new(props),
            on_success: None,
        }
    }

    /// Builds the state against the store provided to this thread.
    ///
    /// # Errors
    /// - `MissingContext` when no provider is alive.
    pub fn from_context(props: ViewProps) -> StoreResult<Self> {
        Ok(Self::new(CoreStore::current()?, props))
    }

    /// Called with the saved project after every successful submission.
    pub fn on_success(mut self, callback: impl FnMut(&Model) + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn store(&self) -> &CoreStore {
        &self.store
    }

    /// `Edit` when a non-empty `projectId` is set locally.
    pub fn action(&self) -> FormAction {
        match self.project_id() {
            Some(_) => FormAction::Edit,
            None => FormAction::Create,
        }
    }

    /// Project being edited; `None` in create mode or once it is removed.
    pub fn project(&self) -> Option<Model> {
        self.store.projects().get_model(self.project_id()?)
    }

    pub fn is_submitting(&self) -> bool {
        self.data.flag(IS_SUBMITTING)
    }

    /// Defaults in create mode, the project's current values in edit mode.
    pub fn initial_values(&self) -> ProjectFormValues {
        let defaults = ProjectFormValues::default();
        let Some(project) = self.project() else {
            return defaults;
        };
        ProjectFormValues {
            name: project.get_str("name").unwrap_or(defaults.name),
            description: project.get_str("description").unwrap_or(defaults.description),
            status: project.get_str("status").unwrap_or(defaults.status),
        }
    }

    pub fn validates(&self) -> ValidationRules {
        ValidationRules::default()
    }

    pub fn validate(&self, values: &ProjectFormValues) -> Result<(), ValidationErrors> {
        self.validates().validate(values)
    }

    /// Validates `values`, then creates or updates the project.
    ///
    /// # Errors
    /// - `Invalid` when a validation rule fails; nothing is written.
    /// - `ProjectNotFound` in edit mode when the project no longer exists.
    pub fn handle_submit(&mut self, values: ProjectFormValues) -> Result<Model, FormError> {
        if let Err(errors) = self.validate(&values) {
            warn!(
                "event=project_form_submit module=view status=rejected action={} errors={}",
                self.action().as_str(),
                errors.errors().len()
            );
            return Err(errors.into());
        }

        self.set_attr(IS_SUBMITTING, Value::Bool(true));
        let result = self.write(&values);
        self.set_attr(IS_SUBMITTING, Value::Bool(false));
        let project = result?;

        info!(
            "event=project_form_submit module=view status=ok action={} id={}",
            self.action().as_str(),
            project.id()
        );
        if let Some(callback) = self.on_success.as_mut() {
            callback(&project);
        }
        Ok(project)
    }

    fn write(&self, values: &ProjectFormValues) -> Result<Model, FormError> {
        match self.project_id() {
            None => Ok(self.store.projects().create(values.to_record())),
            Some(id) => {
                let project = self
                    .store
                    .projects()
                    .get_model(id)
                    .ok_or_else(|| FormError::ProjectNotFound(id.to_string()))?;
                project.save(values.to_record());
                Ok(project)
            }
        }
    }

    fn project_id(&self) -> Option<&str> {
        self.data.get_str(PROJECT_ID).filter(|id| !id.is_empty())
    }
}

impl ViewType for ProjectFormState {
    fn view_data(&self) -> &ViewData {
        &self.data
    }

    fn view_data_mut(&mut self) -> &mut ViewData {
        &mut self.data
    }
}

impl Debug for ProjectFormState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectFormState")
            .field("store", &self.store)
            .field("data", &self.data)
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}
