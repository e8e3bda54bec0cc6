//! Local attribute bag shared by view-state objects.
//!
//! # Responsibility
//! - Hold short-lived UI state next to the store, not inside it.
//! - Route selected attribute writes to a parent callback.
//!
//! # Invariants
//! - A write reaches the parent callback only when its attribute name is in
//!   `send_attrs` and a callback is registered. Every other write stays local,
//!   and an empty `send_attrs` list propagates nothing.
//! - `save`/`load` skip attributes whose value equals the current local value.
//! - Attribute names may be dotted paths (`filters.status`); missing
//!   intermediate objects are created on write.

use crate::store::record::Record;
use log::debug;
use serde_json::{Map, Value};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Parent callback receiving propagated attribute writes.
pub type SendAttr = Rc<dyn Fn(&str, &Value)>;

/// Construction input for view-state objects.
#[derive(Clone, Default)]
pub struct ViewProps {
    /// Initial local attributes, applied through `load`.
    pub data: Record,
    /// Attribute names routed to `send_attr` instead of local state.
    pub send_attrs: Vec<String>,
    pub send_attr: Option<SendAttr>,
}

impl ViewProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: Record) -> Self {
        self.data = data;
        self
    }

    pub fn send_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn send_attr(mut self, callback: impl Fn(&str, &Value) + 'static) -> Self {
        self.send_attr = Some(Rc::new(callback));
        self
    }
}

impl Debug for ViewProps {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewProps")
            .field("data", &self.data)
            .field("send_attrs", &self.send_attrs)
            .field("send_attr", &self.send_attr.is_some())
            .finish()
    }
}

/// Local state of one view-state object.
pub struct ViewData {
    data: Record,
    send_attrs: Vec<String>,
    send_attr: Option<SendAttr>,
}

impl ViewData {
    pub fn new(props: ViewProps) -> Self {
        let ViewProps {
            data,
            send_attrs,
            send_attr,
        } = props;
        let mut view = Self {
            data: Record::new(),
            send_attrs,
            send_attr,
        };
        view.load(data);
        view
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    pub fn send_attrs(&self) -> &[String] {
        &self.send_attrs
    }

    pub fn has_send_attr(&self) -> bool {
        self.send_attr.is_some()
    }

    /// Whether a write to `attr` goes to the parent callback.
    pub fn propagates(&self, attr: &str) -> bool {
        self.send_attr.is_some() && self.send_attrs.iter().any(|name| name == attr)
    }

    /// Local value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.data, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    /// `true` only for a local boolean `true`.
    pub fn flag(&self, path: &str) -> bool {
        matches!(self.get(path), Some(Value::Bool(true)))
    }

    /// Writes a local attribute, bypassing propagation.
    pub fn in_attr(&mut self, path: &str, value: Value) {
        set_path(&mut self.data, path, value);
    }

    /// Writes an attribute, propagating it when it is listed in `send_attrs`.
    pub fn set_attr(&mut self, attr: &str, value: Value) {
        let parent = self.send_attr.clone().filter(|_| self.propagates(attr));
        match parent {
            Some(send_attr) => {
                debug!("event=view_attr module=view status=ok action=propagate attr={attr}");
                send_attr(attr, &value);
            }
            None => self.in_attr(attr, value),
        }
    }

    /// Applies `values` through `set_attr`, skipping unchanged ones.
    ///
    /// Returns the attribute names that were written or propagated.
    pub fn save(&mut self, values: Record) -> Vec<String> {
        self.apply(values, Self::set_attr)
    }

    /// Like `save`, but every write stays local.
    pub fn load(&mut self, values: Record) -> Vec<String> {
        self.apply(values, Self::in_attr)
    }

    /// Deep copy of the local attributes.
    pub fn json(&self) -> Record {
        self.data.clone()
    }

    fn apply(&mut self, values: Record, mut write: impl FnMut(&mut Self, &str, Value)) -> Vec<String> {
        let mut written = Vec::new();
        for (attr, value) in values {
            if self.get(&attr) == Some(&value) {
                continue;
            }
            write(self, &attr, value);
            written.push(attr);
        }
        written
    }
}

impl Debug for ViewData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewData")
            .field("data", &self.data)
            .field("send_attrs", &self.send_attrs)
            .field("send_attr", &self.send_attr.is_some())
            .finish()
    }
}

/// Shared behavior of view-state objects over their `ViewData`.
pub trait ViewType {
    fn view_data(&self) -> &ViewData;

    fn view_data_mut(&mut self) -> &mut ViewData;

    fn data(&self) -> &Record {
        self.view_data().data()
    }

    fn in_attr(&mut self, attr: &str, value: Value) {
        self.view_data_mut().in_attr(attr, value);
    }

    fn set_attr(&mut self, attr: &str, value: Value) {
        self.view_data_mut().set_attr(attr, value);
    }

    fn save(&mut self, values: Record) -> Vec<String> {
        self.view_data_mut().save(values)
    }

    fn load(&mut self, values: Record) -> Vec<String> {
        self.view_data_mut().load(values)
    }

    fn json(&self) -> Record {
        self.view_data().json()
    }
}

fn get_path<'a>(source: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = source.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

fn set_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let Some((head, rest)) = path.split_once('.') else {
        target.insert(path.to_string(), value);
        return;
    };
    let slot = target
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        set_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::{ViewData, ViewProps};
    use crate::store::record::record;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<(String, Value)>>>, ViewProps) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let props = ViewProps::new().send_attr(move |attr, value| {
            sink.borrow_mut().push((attr.to_string(), value.clone()));
        });
        (calls, props)
    }

    #[test]
    fn dotted_paths_create_nested_objects() {
        let mut view = ViewData::new(ViewProps::new());
        view.in_attr("filters.status", json!("done"));
        view.in_attr("filters.page", json!(2));
        assert_eq!(view.data().get("filters"), Some(&json!({"status": "done", "page": 2})));
        assert_eq!(view.get_str("filters.status"), Some("done"));

        view.in_attr("filters.status.inner", json!(true));
        assert!(view.flag("filters.status.inner"));
    }

    #[test]
    fn empty_send_attrs_keeps_everything_local() {
        let (calls, props) = recorder();
        let mut view = ViewData::new(props);
        view.set_attr("projectId", json!("p1"));
        assert!(calls.borrow().is_empty());
        assert_eq!(view.get_str("projectId"), Some("p1"));
    }

    #[test]
    fn save_propagates_only_changed_listed_attrs() {
        let (calls, props) = recorder();
        let mut view = ViewData::new(
            props
                .send_attrs(["projectId"])
                .data(record([("projectId", json!("p1")), ("title", json!("a"))])),
        );

        let written = view.save(record([
            ("projectId", json!("p1")),
            ("title", json!("b")),
        ]));
        assert_eq!(written, vec!["title".to_string()]);
        assert!(calls.borrow().is_empty());

        view.save(record([("projectId", json!("p2"))]));
        assert_eq!(
            calls.borrow().as_slice(),
            &[("projectId".to_string(), json!("p2"))]
        );
        assert_eq!(view.get_str("projectId"), Some("p1"));
    }

    #[test]
    fn load_never_propagates() {
        let (calls, props) = recorder();
        let mut view = ViewData::new(props.send_attrs(["projectId"]));
        view.load(record([("projectId", json!("p9"))]));
        assert!(calls.borrow().is_empty());
        assert_eq!(view.get_str("projectId"), Some("p9"));
    }

    #[test]
    fn json_is_a_detached_copy() {
        let mut view = ViewData::new(ViewProps::new().data(record([("taskId", json!("t1"))])));
        let mut snapshot = view.json();
        snapshot.insert("taskId".to_string(), json!("changed"));
        assert_eq!(view.get_str("taskId"), Some("t1"));

        view.in_attr("taskId", json!("t2"));
        assert_eq!(snapshot.get("taskId"), Some(&json!("changed")));
    }
}
