// Event, RSVP and check-in documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{category_errors, geopoint_errors, Location, LocationInput, PriceRange};
use crate::infrastructure::documents::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Draft,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Draft => "draft",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_date_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_date_time: DateTime<Utc>,
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub price: Option<PriceRange>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub creator_id: String,
    #[serde(default)]
    pub attendee_count: u64,
    #[serde(default)]
    pub interested_count: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub check_in_count: u64,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Event {
    const COLLECTION: &'static str = "events";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if self.end_date_time < self.start_date_time {
            errors.push("end_date_time must not be before start_date_time".to_string());
        }
        if self.price.is_some_and(|p| !p.is_valid()) {
            errors.push("price range is invalid".to_string());
        }
        errors.extend(category_errors(&self.categories));
        errors.extend(geopoint_errors(&self.location));
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_date_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_date_time: DateTime<Utc>,
    pub venue_id: Option<String>,
    pub venue_name: Option<String>,
    #[serde(default)]
    pub location: LocationInput,
    #[serde(default)]
    pub categories: Vec<String>,
    pub price: Option<PriceRange>,
    pub capacity: Option<u32>,
    pub status: Option<EventStatus>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_date_time: Option<DateTime<Utc>>,
    pub venue_id: Option<String>,
    pub location: Option<LocationInput>,
    pub categories: Option<Vec<String>>,
    pub price: Option<PriceRange>,
    pub capacity: Option<u32>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpType {
    Going,
    Interested,
    NotGoing,
}

impl RsvpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpType::Going => "going",
            RsvpType::Interested => "interested",
            RsvpType::NotGoing => "not_going",
        }
    }

    /// Event counter field this response contributes to
    pub fn counter_field(&self) -> Option<&'static str> {
        match self {
            RsvpType::Going => Some("attendee_count"),
            RsvpType::Interested => Some("interested_count"),
            RsvpType::NotGoing => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub response_type: RsvpType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Rsvp {
    /// One RSVP per (event, user)
    pub fn key(event_id: &str, user_id: &str) -> String {
        format!("{}_{}", event_id, user_id)
    }
}

impl Document for Rsvp {
    const COLLECTION: &'static str = "rsvps";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    #[serde(default)]
    pub venue_id: Option<String>,
    pub status: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn key(event_id: &str, user_id: &str) -> String {
        format!("{}_{}", event_id, user_id)
    }
}

impl Document for CheckIn {
    const COLLECTION: &'static str = "check_ins";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event() -> Event {
        let now = Utc::now();
        Event {
            id: "e1".into(),
            name: "Jazz Night".into(),
            slug: "jazz-night".into(),
            description: String::new(),
            start_date_time: now,
            end_date_time: now + Duration::hours(2),
            venue_id: None,
            venue_name: None,
            location: Location::default(),
            categories: vec!["music".into()],
            price: None,
            capacity: None,
            cover_image: None,
            creator_id: "u1".into(),
            attendee_count: 0,
            interested_count: 0,
            view_count: 0,
            check_in_count: 0,
            status: EventStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_event_validation() {
        assert!(event().validate().is_empty());

        let mut bad = event();
        bad.name = " ".into();
        bad.end_date_time = bad.start_date_time - Duration::minutes(1);
        bad.categories.push(String::new());
        assert_eq!(bad.validate().len(), 3);
    }

    #[test]
    fn test_event_serializes_millis_and_snake_case() {
        let value = serde_json::to_value(event()).unwrap();
        assert!(value["start_date_time"].is_i64());
        assert_eq!(value["status"], "scheduled");
    }

    #[test]
    fn test_create_input_rejects_unknown_fields() {
        let raw = r#"{"name":"x","start_date_time":0,"end_date_time":0,"attendee_count":99}"#;
        assert!(serde_json::from_str::<CreateEventInput>(raw).is_err());
    }
}
