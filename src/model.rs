use crate::date_key;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Time used in the sort key of events without a time.
pub const END_OF_DAY: &str = "23:59";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Event {
    pub title: String,
    #[serde(with = "date_key::as_key")]
    pub date: NaiveDate,
    /// `HH:MM`, or empty for an all-day event.
    pub time: String,
    pub location: String,
    pub description: String,
}

/// A record as found in the storage slot, before normalization.
#[derive(Debug, Deserialize, Default)]
pub struct StoredEvent {
    #[serde(default)]
    title: Value,
    #[serde(default)]
    date: Value,
    #[serde(default)]
    time: Value,
    #[serde(default)]
    location: Value,
    #[serde(default)]
    description: Value,
}

/// Raw fields as typed into the new-event form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFields {
    pub title: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub description: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("title is required")]
    MissingTitle,
    #[error("date is required")]
    MissingDate,
    #[error(transparent)]
    BadDate(#[from] date_key::DateKeyError),
}

impl Event {
    /// `date + "T" + time`, with all-day events pinned to the end of their day.
    pub fn effective_timestamp(&self) -> String {
        let time = if self.is_all_day() {
            END_OF_DAY
        } else {
            self.time.as_str()
        };
        format!("{}T{}", date_key::encode(self.date), time)
    }

    pub fn is_all_day(&self) -> bool {
        self.time.is_empty()
    }
}

pub fn compare_events(a: &Event, b: &Event) -> Ordering {
    a.effective_timestamp().cmp(&b.effective_timestamp())
}

/// Stable sort by effective timestamp; ties keep their insertion order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(compare_events);
}

impl StoredEvent {
    /// Normalizes a stored record, or `None` when it lacks a title or a usable date.
    pub fn normalize(self) -> Option<Event> {
        let title = scalar_text(&self.title)?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let date = match &self.date {
            Value::String(raw) if !raw.is_empty() => date_key::decode(raw).ok()?,
            _ => return None,
        };
        Some(Event {
            title,
            date,
            time: scalar_text(&self.time).unwrap_or_default(),
            location: trimmed(&self.location),
            description: trimmed(&self.description),
        })
    }
}

impl EventFields {
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        EventFields {
            title: title.into(),
            date: date.into(),
            ..Default::default()
        }
    }

    /// Trims title, location and description (time is kept as typed) and checks that a title and a valid date are present.
    pub fn into_event(self) -> Result<Event, EventError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(EventError::MissingTitle);
        }
        let date = self.date.trim();
        if date.is_empty() {
            return Err(EventError::MissingDate);
        }
        let date = date_key::decode(date)?;
        Ok(Event {
            title,
            date,
            time: self.time,
            location: self.location.trim().to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn trimmed(value: &Value) -> String {
    scalar_text(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
