// Venue and review documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{category_errors, geopoint_errors, Location, LocationInput};
use crate::infrastructure::documents::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueStatus {
    #[default]
    Active,
    Inactive,
}

impl VenueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueStatus::Active => "active",
            VenueStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

/// Rating aggregate; `distribution[n - 1]` counts n-star reviews
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    pub average: f64,
    pub count: u64,
    pub distribution: [u64; 5],
}

impl Ratings {
    pub fn record(&mut self, rating: u8) {
        let total = self.average * self.count as f64 + f64::from(rating);
        self.count += 1;
        self.average = total / self.count as f64;
        self.distribution[usize::from(rating.clamp(1, 5)) - 1] += 1;
    }

    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let mut aggregate = Self::default();
        for rating in ratings {
            aggregate.record(rating);
        }
        aggregate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub owner_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub hours_of_operation: BTreeMap<String, String>,
    /// Public blob paths under `venues/{id}/`
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub event_count: u64,
    #[serde(default)]
    pub check_in_count: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: VenueStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Document for Venue {
    const COLLECTION: &'static str = "venues";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if self.owner_id.is_empty() {
            errors.push("owner_id is required".to_string());
        }
        errors.extend(category_errors(&self.categories));
        errors.extend(geopoint_errors(&self.location));
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateVenueInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: LocationInput,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub hours_of_operation: BTreeMap<String, String>,
    pub status: Option<VenueStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateVenueInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<LocationInput>,
    pub categories: Option<Vec<String>>,
    pub contact: Option<Contact>,
    pub amenities: Option<Vec<String>>,
    pub hours_of_operation: Option<BTreeMap<String, String>>,
    pub status: Option<VenueStatus>,
    /// Transfers ownership when set
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub target_id: String,
    #[serde(default)]
    pub target_name: String,
    pub rating: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub helpful: u64,
    pub status: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub const PUBLISHED: &'static str = "published";
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        if (1..=5).contains(&self.rating) {
            Vec::new()
        } else {
            vec!["rating must be between 1 and 5".to_string()]
        }
    }
}

/// Marks that a user has voted a review helpful
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpfulVote {
    pub id: String,
    pub review_id: String,
    pub user_id: String,
    pub venue_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl HelpfulVote {
    /// One vote per (review, user)
    pub fn key(review_id: &str, user_id: &str) -> String {
        format!("{}_{}", review_id, user_id)
    }
}

impl Document for HelpfulVote {
    const COLLECTION: &'static str = "helpful_votes";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewInput {
    pub rating: Option<u8>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Recent,
    Helpful,
}
