// User profiles and mood boards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{geopoint_errors, Location, PriceRange};
use crate::infrastructure::documents::Document;

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    pub event_reminders: bool,
    pub friend_activity: bool,
    pub venue_updates: bool,
    pub recommendations: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            event_reminders: true,
            friend_activity: true,
            venue_updates: true,
            recommendations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preferences {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
    #[serde(default)]
    pub price_range: PriceRange,
    #[serde(default)]
    pub notification_settings: NotificationSettings,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE_KM
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            price_range: PriceRange::default(),
            notification_settings: NotificationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub events_attended: u64,
    pub check_ins: u64,
    pub reviews: u64,
    pub followers: u64,
    pub following: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub is_venue_account: bool,
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_active: DateTime<Utc>,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = geopoint_errors(&self.location);
        let max = self.preferences.max_distance_km;
        if !max.is_finite() || max <= 0.0 {
            errors.push("max_distance_km must be positive".to_string());
        }
        if !self.preferences.price_range.is_valid() {
            errors.push("price range is invalid".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserInput {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub bio: String,
    pub preferences: Option<Preferences>,
    #[serde(default)]
    pub is_venue_account: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserInput {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<Preferences>,
    pub is_venue_account: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedEvent {
    pub event_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Keyed by the owning user's id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodBoard {
    pub id: String,
    #[serde(default)]
    pub saved_events: Vec<SavedEvent>,
}

impl Document for MoodBoard {
    const COLLECTION: &'static str = "mood_boards";

    fn id(&self) -> &str {
        &self.id
    }
}
