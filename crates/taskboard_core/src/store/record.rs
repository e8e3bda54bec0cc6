//! Raw record shape and timestamp issuing.
//!
//! # Responsibility
//! - Define the plain attribute map every collection stores.
//! - Issue record ids and ISO-8601 timestamps.
//!
//! # Invariants
//! - Timestamps issued by one `Timestamps` source are strictly increasing.
//! - Timestamps use millisecond precision with a `Z` suffix, so string order
//!   equals chronological order.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::Cell;
use uuid::Uuid;

/// Plain attribute mapping for one entity.
pub type Record = Map<String, Value>;

/// Primary key attribute, always equal to the record's table key.
pub const ID: &str = "id";
/// Creation timestamp attribute.
pub const CREATED_AT: &str = "createdAt";
/// Last-write timestamp attribute.
pub const UPDATED_AT: &str = "updatedAt";

/// Generates a fresh record id.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Serializes a typed attribute struct into a record.
///
/// Non-object values (numbers, strings, arrays) yield an empty record.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Record::new()),
    }
}

/// Builds a record from `(key, value)` pairs.
pub fn record<K, I>(pairs: I) -> Record
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect()
}

/// Reads the string `id` of a record, if it has one.
pub fn record_id(record: &Record) -> Option<&str> {
    match record.get(ID) {
        Some(Value::String(id)) if !id.is_empty() => Some(id.as_str()),
        _ => None,
    }
}

/// Wall-clock source used for record timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// System UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Monotonic timestamp issuer shared by every collection of one store.
pub struct Timestamps {
    clock: Box<dyn Clock>,
    last: Cell<Option<DateTime<Utc>>>,
}

impl Timestamps {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: Cell::new(None),
        }
    }

    /// Returns the next timestamp, at least 1 ms after the previous one.
    pub fn next(&self) -> String {
        // Sub-millisecond precision is dropped by the format, so compare at
        // the same resolution.
        let now = truncate_to_millis(self.clock.now());
        let issued = match self.last.get() {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last.set(Some(issued));
        format_timestamp(issued)
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or(value)
}
