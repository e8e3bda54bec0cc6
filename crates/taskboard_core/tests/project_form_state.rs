use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use taskboard_core::view::project_form::FieldError;
use taskboard_core::{
    record, CoreStore, FormAction, FormError, ProjectFormState, ProjectFormValues, ViewProps,
    ViewType,
};

fn form(core: &CoreStore, project_id: Option<&str>) -> ProjectFormState {
    let data = match project_id {
        Some(id) => record([("projectId", json!(id))]),
        None => Default::default(),
    };
    ProjectFormState::new(core.clone(), ViewProps::new().data(data))
}

#[test]
fn action_depends_on_project_id() {
    let core = CoreStore::new().unwrap();
    assert_eq!(form(&core, None).action(), FormAction::Create);
    assert_eq!(form(&core, Some("")).action(), FormAction::Create);
    assert_eq!(form(&core, Some("p-1")).action(), FormAction::Edit);
}

#[test]
fn project_is_resolved_in_edit_mode_only() {
    let core = CoreStore::new().unwrap();
    let project = core.projects().create(record([("name", json!("Existing"))]));

    assert!(form(&core, None).project().is_none());
    assert_eq!(form(&core, Some(project.id())).project(), Some(project));
    assert!(form(&core, Some("gone")).project().is_none());
}

#[test]
fn initial_values_use_defaults_or_project_attributes() {
    let core = CoreStore::new().unwrap();
    assert_eq!(
        form(&core, None).initial_values(),
        ProjectFormValues {
            name: String::new(),
            description: String::new(),
            status: "active".to_string(),
        }
    );

    let project = core.projects().create(record([
        ("name", json!("Existing")),
        ("description", json!("Details")),
        ("status", json!("completed")),
    ]));
    assert_eq!(
        form(&core, Some(project.id())).initial_values(),
        ProjectFormValues::new("Existing")
            .description("Details")
            .status("completed")
    );
}

#[test]
fn validates_exposes_the_form_rules() {
    let core = CoreStore::new().unwrap();
    let rules = form(&core, None).validates();

    assert!(rules.name.required);
    assert_eq!(rules.name.min_length, Some(3));
    assert_eq!(rules.description.max_length, Some(500));
    assert!(!rules.description.required);
    assert_eq!(rules.status.one_of, vec!["active", "completed", "archived"]);
}

#[test]
fn validate_rejects_each_rule() {
    let core = CoreStore::new().unwrap();
    let state = form(&core, None);

    let missing = state.validate(&ProjectFormValues::new("")).unwrap_err();
    assert_eq!(missing.field("name"), Some(&FieldError::Required { field: "name" }));

    let short = state.validate(&ProjectFormValues::new("ab")).unwrap_err();
    assert!(matches!(short.field("name"), Some(FieldError::TooShort { min: 3, .. })));

    let long = state
        .validate(&ProjectFormValues::new("Valid").description("d".repeat(501)))
        .unwrap_err();
    assert!(matches!(
        long.field("description"),
        Some(FieldError::TooLong { max: 500, .. })
    ));

    let status = state
        .validate(&ProjectFormValues::new("Valid").status("paused"))
        .unwrap_err();
    assert!(matches!(status.field("status"), Some(FieldError::NotAllowed { .. })));

    assert!(state
        .validate(&ProjectFormValues::new("Valid").description("d".repeat(500)))
        .is_ok());
}

#[test]
fn submit_creates_project_in_create_mode() {
    let core = CoreStore::new().unwrap();
    let mut state = form(&core, None);

    let project = state
        .handle_submit(ProjectFormValues::new("New Project").description("About"))
        .expect("valid submission");

    assert_eq!(core.projects().len(), 1);
    assert_eq!(project.get_str("name").as_deref(), Some("New Project"));
    assert_eq!(project.get_str("description").as_deref(), Some("About"));
    assert_eq!(project.get_str("status").as_deref(), Some("active"));
    assert!(!state.is_submitting());
}

#[test]
fn submit_updates_project_in_edit_mode() {
    let core = CoreStore::new().unwrap();
    let existing = core.projects().create(record([("name", json!("Old name"))]));
    let created_at = existing.get("createdAt");
    let mut state = form(&core, Some(existing.id()));

    let values = state.initial_values().status("archived");
    let saved = state
        .handle_submit(ProjectFormValues {
            name: "New name".to_string(),
            ..values
        })
        .expect("valid submission");

    assert_eq!(saved, existing);
    assert_eq!(core.projects().len(), 1);
    assert_eq!(existing.get_str("name").as_deref(), Some("New name"));
    assert_eq!(existing.get_str("status").as_deref(), Some("archived"));
    assert_eq!(existing.get("createdAt"), created_at);
}

#[test]
fn submit_toggles_is_submitting_around_the_write() {
    let core = CoreStore::new().unwrap();
    let seen: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut state = ProjectFormState::new(
        core.clone(),
        ViewProps::new()
            .send_attrs(["isSubmitting"])
            .send_attr(move |attr, value| {
                assert_eq!(attr, "isSubmitting");
                sink.borrow_mut().push(value.clone());
            }),
    );

    state
        .handle_submit(ProjectFormValues::new("Tracked"))
        .expect("valid submission");

    assert_eq!(seen.borrow().as_slice(), &[json!(true), json!(false)]);
}

#[test]
fn on_success_runs_after_successful_submit_only() {
    let core = CoreStore::new().unwrap();
    let saved_ids: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&saved_ids);
    let observer = core.clone();
    let mut state = form(&core, None).on_success(move |project| {
        assert!(observer.projects().contains(project.id()));
        sink.borrow_mut().push(project.id().to_string());
    });

    let err = state
        .handle_submit(ProjectFormValues::new("no"))
        .expect_err("short name is rejected");
    assert!(matches!(err, FormError::Invalid(_)));
    assert!(core.projects().is_empty());
    assert!(saved_ids.borrow().is_empty());

    let project = state
        .handle_submit(ProjectFormValues::new("Accepted"))
        .expect("valid submission");
    assert_eq!(saved_ids.borrow().as_slice(), &[project.id().to_string()]);
}

#[test]
fn submit_fails_when_edited_project_was_removed() {
    let core = CoreStore::new().unwrap();
    let existing = core.projects().create(record([("name", json!("Temporary"))]));
    let mut state = form(&core, Some(existing.id()));
    core.projects().remove(existing.id());

    let err = state
        .handle_submit(ProjectFormValues::new("Still here"))
        .expect_err("edit target is gone");

    assert_eq!(err, FormError::ProjectNotFound(existing.id().to_string()));
    assert!(core.projects().is_empty());
    assert!(!state.is_submitting());
    assert_eq!(state.data().get("isSubmitting"), Some(&json!(false)));
}
