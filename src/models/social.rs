// Social graph, activity and notification documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infrastructure::documents::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Declined,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Declined => "declined",
        }
    }
}

/// `user_id` sent the request, `friend_id` received it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub status: FriendshipStatus,
    pub initiated_by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    /// The participant that is not `user_id`
    pub fn other(&self, user_id: &str) -> &str {
        if self.user_id == user_id {
            &self.friend_id
        } else {
            &self.user_id
        }
    }
}

impl Document for Friendship {
    const COLLECTION: &'static str = "friends";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolloweeType {
    Venue,
    Category,
}

impl FolloweeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FolloweeType::Venue => "venue",
            FolloweeType::Category => "category",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub followee_id: String,
    pub followee_type: FolloweeType,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn key(follower_id: &str, followee_type: FolloweeType, followee_id: &str) -> String {
        format!("{}_{}_{}", follower_id, followee_type.as_str(), followee_id)
    }
}

impl Document for Follow {
    const COLLECTION: &'static str = "followers";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Category ids are the slug of the category name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub venue_count: u64,
    #[serde(default)]
    pub event_count: u64,
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    EventCreated,
    EventUpdated,
    EventDeleted,
    EventRsvp,
    CheckIn,
    Review,
    Follow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub message: String,
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub entity_id: String,
    pub entity_type: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Activity {
    pub fn new(kind: ActivityKind, message: impl Into<String>, entity_type: &str, entity_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
            venue_id: None,
            user_id: None,
            entity_id: entity_id.to_string(),
            entity_type: entity_type.to_string(),
            visibility: Visibility::Public,
            timestamp: Utc::now(),
        }
    }

    pub fn venue(mut self, venue_id: Option<&str>) -> Self {
        self.venue_id = venue_id.map(str::to_string);
        self
    }

    pub fn by(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }
}

impl Document for Activity {
    const COLLECTION: &'static str = "activities";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest,
    FriendRequestResponse,
    VenueReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub source_id: String,
    pub source_type: String,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: impl Into<String>,
        source: (&str, &str),
    ) -> Self {
        let (source_type, source_id) = source;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            title: title.to_string(),
            message: message.into(),
            source_id: source_id.to_string(),
            source_type: source_type.to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }
}
