// Feed Service - activity records, social feeds and notifications

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DocumentQuery, SortDirection};
use crate::infrastructure::documents::Documents;
use crate::models::{Activity, Friendship, FriendshipStatus, Notification, Visibility};
use crate::services::best_effort;

pub const DEFAULT_FEED_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct FeedService {
    docs: Documents,
}

impl FeedService {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Store an activity; failures are logged and swallowed
    pub async fn record_activity(&self, activity: Activity) {
        best_effort(self.docs.create(&activity).await, "activity record");
    }

    pub async fn get_venue_activity(&self, venue_id: &str, limit: u32) -> AppResult<Vec<Activity>> {
        self.docs
            .query(
                DocumentQuery::of::<Activity>()
                    .where_eq("venue_id", venue_id)
                    .order_by("timestamp", SortDirection::Desc)
                    .limit(limit),
            )
            .await
    }

    /// Ids of users with an accepted friendship with `user_id`, either direction
    pub async fn friend_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let accepted = FriendshipStatus::Accepted.as_str();
        let (sent, received) = futures::future::try_join(
            self.docs.query::<Friendship>(
                DocumentQuery::of::<Friendship>()
                    .where_eq("user_id", user_id)
                    .where_eq("status", accepted),
            ),
            self.docs.query::<Friendship>(
                DocumentQuery::of::<Friendship>()
                    .where_eq("friend_id", user_id)
                    .where_eq("status", accepted),
            ),
        )
        .await?;

        let mut ids: Vec<String> = sent
            .iter()
            .chain(received.iter())
            .map(|f| f.other(user_id).to_string())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Friends' public activity plus the user's own, newest first. Users
    /// without friends see global public activity.
    pub async fn get_social_feed(&self, user_id: &str, limit: u32) -> AppResult<Vec<Activity>> {
        let friends = self.friend_ids(user_id).await?;
        let public = Visibility::Public;

        if friends.is_empty() {
            return self
                .docs
                .query(
                    DocumentQuery::of::<Activity>()
                        .where_eq("visibility", serde_json::to_value(public)?)
                        .order_by("timestamp", SortDirection::Desc)
                        .limit(limit),
                )
                .await;
        }

        let (from_friends, own) = futures::future::try_join(
            self.docs.query::<Activity>(
                DocumentQuery::of::<Activity>()
                    .where_in("user_id", friends)
                    .where_eq("visibility", serde_json::to_value(public)?)
                    .order_by("timestamp", SortDirection::Desc)
                    .limit(limit),
            ),
            self.docs.query::<Activity>(
                DocumentQuery::of::<Activity>()
                    .where_eq("user_id", user_id)
                    .order_by("timestamp", SortDirection::Desc)
                    .limit(limit),
            ),
        )
        .await?;

        let mut feed: Vec<Activity> = from_friends.into_iter().chain(own).collect();
        feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        feed.truncate(limit as usize);
        Ok(feed)
    }

    /// Deliver a notification; failures are logged and swallowed
    pub async fn notify(&self, notification: Notification) {
        best_effort(self.docs.create(&notification).await, "notification");
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> AppResult<Vec<Notification>> {
        let mut query = DocumentQuery::of::<Notification>().where_eq("user_id", user_id);
        if unread_only {
            query = query.where_eq("read", false);
        }
        self.docs
            .query(query.order_by("created_at", SortDirection::Desc).limit(limit))
            .await
    }

    pub async fn mark_notification_read(&self, viewer_id: &str, id: &str) -> AppResult<Notification> {
        let notification = self.docs.require::<Notification>(id).await?;
        if notification.user_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the recipient can update a notification".to_string(),
            ));
        }
        if notification.read {
            return Ok(notification);
        }
        self.docs
            .merge::<Notification>(id, serde_json::json!({ "read": true }))
            .await?;
        info!(notification_id = id, "notification marked read");
        self.docs.require(id).await
    }
}
