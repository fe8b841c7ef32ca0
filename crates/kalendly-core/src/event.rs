use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_TIME_INPUT_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Number(n) => write!(f, "{n}"),
            EventId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EventId {
    fn from(value: i64) -> Self {
        EventId::Number(value)
    }
}

impl From<i32> for EventId {
    fn from(value: i32) -> Self {
        EventId::Number(i64::from(value))
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId::Text(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        EventId::Text(value)
    }
}

/// Scheduling date of an event.
///
/// Text that matches none of the accepted layouts is kept as `Invalid` so the
/// event survives a round trip, but such an event never lands on any day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDate {
    Day(NaiveDate),
    At(NaiveDateTime),
    Invalid(String),
}

impl EventDate {
    /// Parses `YYYY-MM-DD`, `YYYY-MM-DD[T ]HH:MM[:SS]` or RFC 3339.
    ///
    /// Date-only text names a local calendar day. RFC 3339 instants are moved
    /// into the local timezone before the day is taken.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Ok(day) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return EventDate::Day(day);
        }

        for format in DATE_TIME_INPUT_FORMATS {
            if let Ok(at) = NaiveDateTime::parse_from_str(trimmed, format) {
                return EventDate::At(at);
            }
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return EventDate::At(instant.with_timezone(&Local).naive_local());
        }

        debug!(raw = %trimmed, "unparsable event date; event will not match any day");
        EventDate::Invalid(raw.to_string())
    }

    pub fn calendar_day(&self) -> Option<NaiveDate> {
        match self {
            EventDate::Day(day) => Some(*day),
            EventDate::At(at) => Some(at.date()),
            EventDate::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, EventDate::Invalid(_))
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventDate::Day(day) => write!(f, "{}", day.format(DATE_FORMAT)),
            EventDate::At(at) => write!(f, "{}", at.format(DATE_TIME_FORMAT)),
            EventDate::Invalid(raw) => f.write_str(raw),
        }
    }
}

impl From<NaiveDate> for EventDate {
    fn from(value: NaiveDate) -> Self {
        EventDate::Day(value)
    }
}

impl From<NaiveDateTime> for EventDate {
    fn from(value: NaiveDateTime) -> Self {
        EventDate::At(value)
    }
}

impl From<&str> for EventDate {
    fn from(value: &str) -> Self {
        EventDate::parse(value)
    }
}

impl Serialize for EventDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(EventDate::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,

    pub name: String,

    pub date: EventDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CalendarEvent {
    pub fn new(id: impl Into<EventId>, name: impl Into<String>, date: impl Into<EventDate>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date: date.into(),
            description: None,
            color: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn falls_on(&self, day: NaiveDate) -> bool {
        self.date.calendar_day() == Some(day)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{CalendarEvent, EventDate, EventId};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn date_only_text_is_a_local_day() {
        assert_eq!(EventDate::parse("2024-01-15"), EventDate::Day(day(2024, 1, 15)));
    }

    #[test]
    fn time_of_day_is_kept_but_ignored_for_the_day() {
        let parsed = EventDate::parse("2024-01-15T23:45");
        assert!(matches!(parsed, EventDate::At(_)));
        assert_eq!(parsed.calendar_day(), Some(day(2024, 1, 15)));

        let spaced = EventDate::parse("2024-01-15 08:30:00");
        assert_eq!(spaced.calendar_day(), Some(day(2024, 1, 15)));
    }

    #[test]
    fn garbage_never_lands_on_a_day() {
        let parsed = EventDate::parse("not a date");
        assert!(!parsed.is_valid());
        assert_eq!(parsed.calendar_day(), None);
        assert_eq!(parsed.to_string(), "not a date");
    }

    #[test]
    fn extra_fields_survive_json() {
        let raw = json!({
            "id": 7,
            "name": "Standup",
            "date": "2024-03-01",
            "color": "#ff0000",
            "room": "B-12"
        });
        let event: CalendarEvent = serde_json::from_value(raw).expect("deserialize event");
        assert_eq!(event.id, EventId::Number(7));
        assert_eq!(event.color.as_deref(), Some("#ff0000"));
        assert_eq!(event.extra.get("room"), Some(&json!("B-12")));
        assert!(event.falls_on(day(2024, 3, 1)));

        let back = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(back["room"], json!("B-12"));
        assert_eq!(back["date"], json!("2024-03-01"));
    }

    #[test]
    fn builders_fill_optional_fields() {
        let event = CalendarEvent::new(3, "Offsite", "2024-04-02")
            .with_description("Planning day")
            .with_color("teal")
            .with_extra("attendees", json!(12));

        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["description"], json!("Planning day"));
        assert_eq!(value["color"], json!("teal"));
        assert_eq!(value["attendees"], json!(12));

        let back: CalendarEvent = serde_json::from_value(value).expect("deserialize event");
        assert_eq!(back, event);
    }

    #[test]
    fn text_ids_display_verbatim() {
        let event = CalendarEvent::new("evt-1", "Review", day(2024, 1, 20));
        assert_eq!(event.id.to_string(), "evt-1");
        assert!(event.description.is_none());
    }
}
