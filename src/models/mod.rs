// Models - persisted documents and request payloads

pub mod blog;
pub mod event;
pub mod social;
pub mod user;
pub mod venue;

use serde::{Deserialize, Serialize};

use crate::core::GeoPoint;
use crate::error::AppResult;

pub use blog::{
    Comment, CreateCommentInput, CreatePostInput, NewsletterSignupInput, NewsletterSubscriber,
    Post, UpdatePostInput,
};
pub use event::{
    CheckIn, CreateEventInput, Event, EventStatus, Rsvp, RsvpType, UpdateEventInput,
};
pub use social::{
    Activity, ActivityKind, Category, Follow, FolloweeType, Friendship, FriendshipStatus,
    Notification, NotificationKind, Visibility,
};
pub use user::{
    CreateUserInput, MoodBoard, NotificationSettings, Preferences, SavedEvent, UpdateUserInput,
    User, UserStats,
};
pub use venue::{
    CreateVenueInput, HelpfulVote, Ratings, Review, ReviewInput, ReviewSort, UpdateVenueInput, Venue,
    VenueStatus,
};

/// A street address with an optional coordinate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub geopoint: Option<GeoPoint>,
}

/// Location as submitted by clients: an address plus optional raw coordinates
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationInput {
    #[serde(default)]
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationInput {
    /// Builds a Location, keeping `previous` when no coordinates were supplied.
    pub fn into_location(self, previous: Option<GeoPoint>) -> AppResult<Location> {
        let geopoint = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)?),
            _ => previous,
        };
        Ok(Location {
            address: self.address,
            geopoint,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn is_valid(&self) -> bool {
        let non_negative = |v: Option<f64>| v.map_or(true, |v| v.is_finite() && v >= 0.0);
        let ordered = match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        non_negative(self.min) && non_negative(self.max) && ordered
    }
}

/// Shared checks for category lists
pub(crate) fn category_errors(categories: &[String]) -> Vec<String> {
    if categories.iter().any(|c| c.trim().is_empty()) {
        vec!["categories must be non-empty strings".to_string()]
    } else {
        Vec::new()
    }
}

pub(crate) fn geopoint_errors(location: &Location) -> Vec<String> {
    match location.geopoint.map(|p| p.validate()) {
        Some(Err(e)) => vec![e.to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_input_keeps_previous_geopoint() {
        let previous = GeoPoint::new(40.0, -73.0).unwrap();
        let input = LocationInput {
            address: "1 Main St".into(),
            latitude: None,
            longitude: None,
        };
        let location = input.into_location(Some(previous)).unwrap();
        assert_eq!(location.geopoint, Some(previous));

        let input = LocationInput {
            address: String::new(),
            latitude: Some(91.0),
            longitude: Some(0.0),
        };
        assert!(input.into_location(None).is_err());
    }

    #[test]
    fn test_price_range_validity() {
        assert!(PriceRange { min: Some(5.0), max: Some(10.0) }.is_valid());
        assert!(!PriceRange { min: Some(10.0), max: Some(5.0) }.is_valid());
        assert!(!PriceRange { min: Some(-1.0), max: None }.is_valid());
    }
}
