// User Service - profiles, friendships, follows and mood boards

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DocumentQuery, SortDirection};
use crate::infrastructure::documents::{Document, Documents};
use crate::models::{
    Activity, ActivityKind, Category, CreateUserInput, Event, Follow, FolloweeType, Friendship,
    FriendshipStatus, LocationInput, MoodBoard, Notification, NotificationKind, SavedEvent,
    UpdateUserInput, User, UserStats, Venue,
};
use crate::services::{best_effort, contains_lower, Counters, FeedService};

pub const DEFAULT_USER_SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequest {
    #[serde(flatten)]
    pub friendship: Friendship,
    pub sender: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedEventView {
    #[serde(flatten)]
    pub saved: SavedEvent,
    pub event: Option<Event>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoodBoardView {
    pub saved_events: Vec<SavedEventView>,
}

/// Only the profile owner may change a profile
fn require_self(viewer_id: &str, user_id: &str) -> AppResult<()> {
    if viewer_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Cannot modify another user's profile".to_string()))
    }
}

/// Friendship id for an unordered pair of users
fn friendship_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}_{}", a, b)
    } else {
        format!("{}_{}", b, a)
    }
}

#[derive(Clone)]
pub struct UserService {
    docs: Documents,
    counters: Counters,
    feed: FeedService,
}

impl UserService {
    pub fn new(docs: Documents, counters: Counters, feed: FeedService) -> Self {
        Self {
            docs,
            counters,
            feed,
        }
    }

    pub async fn create_user_profile(&self, id: &str, input: CreateUserInput) -> AppResult<User> {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            display_name: input.display_name.trim().to_string(),
            email: input.email,
            photo_url: input.photo_url,
            bio: input.bio,
            location: Default::default(),
            preferences: input.preferences.unwrap_or_default(),
            stats: UserStats::default(),
            is_venue_account: input.is_venue_account,
            venue_id: None,
            created_at: now,
            last_active: now,
        };
        self.docs.create(&user).await?;
        info!(user_id = id, "user profile created");
        Ok(user)
    }

    pub async fn get_user_profile(&self, id: &str) -> AppResult<User> {
        self.docs.require::<User>(id).await
    }

    pub async fn user_exists(&self, id: &str) -> AppResult<bool> {
        self.docs.exists::<User>(id).await
    }

    pub async fn update_user_profile(
        &self,
        viewer_id: &str,
        id: &str,
        patch: UpdateUserInput,
    ) -> AppResult<User> {
        require_self(viewer_id, id)?;
        let user = self
            .docs
            .update_with::<User, _>(id, |user| {
                if let Some(name) = &patch.display_name {
                    user.display_name = name.trim().to_string();
                }
                if let Some(email) = &patch.email {
                    user.email = email.clone();
                }
                if let Some(photo_url) = &patch.photo_url {
                    user.photo_url = photo_url.clone();
                }
                if let Some(bio) = &patch.bio {
                    user.bio = bio.clone();
                }
                if let Some(preferences) = &patch.preferences {
                    user.preferences = preferences.clone();
                }
                if let Some(is_venue_account) = patch.is_venue_account {
                    user.is_venue_account = is_venue_account;
                }
                user.last_active = Utc::now();
                Ok(())
            })
            .await?;
        info!(user_id = id, "user profile updated");
        Ok(user)
    }

    pub async fn update_user_location(
        &self,
        viewer_id: &str,
        id: &str,
        location: LocationInput,
    ) -> AppResult<User> {
        require_self(viewer_id, id)?;
        let location = location.into_location(None)?;
        self.docs
            .update_with::<User, _>(id, |user| {
                user.location = location.clone();
                user.last_active = Utc::now();
                Ok(())
            })
            .await
    }

    /// Display-name substring search over all profiles
    pub async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>> {
        let needle = query.trim().to_lowercase();
        let users = self
            .docs
            .query::<User>(DocumentQuery::of::<User>().order_by("display_name", SortDirection::Asc))
            .await?;
        Ok(users
            .into_iter()
            .filter(|u| !u.display_name.is_empty() && contains_lower(&u.display_name, &needle))
            .take(limit as usize)
            .collect())
    }

    async fn load_all<T: Document>(&self, ids: &[String]) -> AppResult<Vec<T>> {
        let docs = join_all(ids.iter().map(|id| self.docs.get::<T>(id))).await;
        Ok(docs
            .into_iter()
            .collect::<AppResult<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect())
    }

    pub async fn get_user_friends(&self, user_id: &str) -> AppResult<Vec<User>> {
        let ids = self.feed.friend_ids(user_id).await?;
        self.load_all::<User>(&ids).await
    }

    pub async fn get_pending_friend_requests(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let pending = self
            .docs
            .query::<Friendship>(
                DocumentQuery::of::<Friendship>()
                    .where_eq("friend_id", user_id)
                    .where_eq("status", FriendshipStatus::Pending.as_str())
                    .order_by("created_at", SortDirection::Desc),
            )
            .await?;
        let senders = join_all(pending.iter().map(|f| self.docs.get::<User>(&f.user_id))).await;

        pending
            .into_iter()
            .zip(senders)
            .map(|(friendship, sender)| Ok(FriendRequest { friendship, sender: sender? }))
            .collect()
    }

    /// Returns the id of the new request, or of any pending or accepted
    /// friendship already linking the two users in either direction. A
    /// declined request is reopened as a new request from `user_id`.
    pub async fn send_friend_request(&self, user_id: &str, friend_id: &str) -> AppResult<String> {
        if user_id == friend_id {
            return Err(AppError::Validation(
                "Cannot send a friend request to yourself".to_string(),
            ));
        }
        if !self.docs.exists::<User>(friend_id).await? {
            return Err(AppError::NotFound(format!("users {} not found", friend_id)));
        }

        let key = friendship_key(user_id, friend_id);
        let now = Utc::now();
        let friendship = Friendship {
            id: key.clone(),
            user_id: user_id.to_string(),
            friend_id: friend_id.to_string(),
            status: FriendshipStatus::Pending,
            initiated_by: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        match self.docs.create(&friendship).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                let mut reopened = false;
                self.docs
                    .update_with::<Friendship, _>(&key, |existing| {
                        reopened = existing.status == FriendshipStatus::Declined;
                        if reopened {
                            existing.user_id = user_id.to_string();
                            existing.friend_id = friend_id.to_string();
                            existing.initiated_by = user_id.to_string();
                            existing.status = FriendshipStatus::Pending;
                            existing.updated_at = now;
                        }
                        Ok(())
                    })
                    .await?;
                if !reopened {
                    return Ok(key);
                }
            }
            Err(e) => return Err(e),
        }
        info!(user_id, friend_id, "friend request sent");

        self.feed
            .notify(Notification::new(
                friend_id,
                NotificationKind::FriendRequest,
                "New Friend Request",
                "You have a new friend request.",
                ("user", user_id),
            ))
            .await;
        Ok(key)
    }

    pub async fn respond_to_friend_request(
        &self,
        friendship_id: &str,
        responder_id: &str,
        accept: bool,
    ) -> AppResult<Friendship> {
        let friendship = self.docs.require::<Friendship>(friendship_id).await?;
        if friendship.friend_id != responder_id {
            return Err(AppError::Forbidden(
                "Not authorized to respond to this friend request".to_string(),
            ));
        }

        let status = if accept {
            FriendshipStatus::Accepted
        } else {
            FriendshipStatus::Declined
        };
        let friendship = self
            .docs
            .update_with::<Friendship, _>(friendship_id, |f| {
                if f.status != FriendshipStatus::Pending {
                    return Err(AppError::Conflict(format!(
                        "Friend request already {}",
                        f.status.as_str()
                    )));
                }
                f.status = status;
                f.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        info!(friendship_id, accepted = accept, "friend request answered");

        let (title, message) = if accept {
            ("Friend Request Accepted", "Your friend request was accepted.")
        } else {
            ("Friend Request Declined", "Your friend request was declined.")
        };
        self.feed
            .notify(Notification::new(
                &friendship.user_id,
                NotificationKind::FriendRequestResponse,
                title,
                message,
                ("user", responder_id),
            ))
            .await;

        if accept {
            best_effort(
                self.counters.adjust_user_stat(responder_id, "following", 1).await,
                "responder following count",
            );
            best_effort(
                self.counters
                    .adjust_user_stat(&friendship.user_id, "followers", 1)
                    .await,
                "sender followers count",
            );
        }
        Ok(friendship)
    }

    /// Unfriend, cancel a sent request or reject a received one. Either
    /// party may remove the friendship.
    pub async fn remove_friendship(&self, viewer_id: &str, friendship_id: &str) -> AppResult<()> {
        let friendship = self.docs.require::<Friendship>(friendship_id).await?;
        if friendship.user_id != viewer_id && friendship.friend_id != viewer_id {
            return Err(AppError::Forbidden(
                "Not authorized to remove this friendship".to_string(),
            ));
        }
        if !self.docs.delete::<Friendship>(friendship_id).await? {
            return Ok(());
        }
        info!(friendship_id, status = friendship.status.as_str(), "friendship removed");

        if friendship.status == FriendshipStatus::Accepted {
            best_effort(
                self.counters
                    .adjust_user_stat(&friendship.friend_id, "following", -1)
                    .await,
                "receiver following count",
            );
            best_effort(
                self.counters
                    .adjust_user_stat(&friendship.user_id, "followers", -1)
                    .await,
                "sender followers count",
            );
        }
        Ok(())
    }

    /// Idempotent; returns the follow id
    pub async fn follow_venue(&self, user_id: &str, venue_id: &str) -> AppResult<String> {
        let venue = self.docs.require::<Venue>(venue_id).await?;
        let Some(follow) = self.create_follow(user_id, FolloweeType::Venue, venue_id).await? else {
            return Ok(Follow::key(user_id, FolloweeType::Venue, venue_id));
        };

        self.counters.adjust_venue_followers(venue_id, 1).await?;
        best_effort(
            self.counters.adjust_user_stat(user_id, "following", 1).await,
            "user following count",
        );
        info!(user_id, venue_id, "venue followed");
        self.feed
            .record_activity(
                Activity::new(
                    ActivityKind::Follow,
                    format!("New follower for {}", venue.name),
                    "venue",
                    venue_id,
                )
                .venue(Some(venue_id))
                .by(user_id),
            )
            .await;
        Ok(follow.id)
    }

    /// No-op when the user does not follow the venue
    pub async fn unfollow_venue(&self, user_id: &str, venue_id: &str) -> AppResult<()> {
        let key = Follow::key(user_id, FolloweeType::Venue, venue_id);
        if !self.docs.delete::<Follow>(&key).await? {
            return Ok(());
        }
        best_effort(
            self.counters.adjust_venue_followers(venue_id, -1).await,
            "venue followers count",
        );
        best_effort(
            self.counters.adjust_user_stat(user_id, "following", -1).await,
            "user following count",
        );
        info!(user_id, venue_id, "venue unfollowed");
        Ok(())
    }

    /// Creates the follow record; None when it already existed
    async fn create_follow(
        &self,
        user_id: &str,
        followee_type: FolloweeType,
        followee_id: &str,
    ) -> AppResult<Option<Follow>> {
        let follow = Follow {
            id: Follow::key(user_id, followee_type, followee_id),
            follower_id: user_id.to_string(),
            followee_id: followee_id.to_string(),
            followee_type,
            notifications_enabled: true,
            created_at: Utc::now(),
        };
        match self.docs.create(&follow).await {
            Ok(()) => Ok(Some(follow)),
            Err(AppError::Conflict(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn follow_category(&self, user_id: &str, category_id: &str) -> AppResult<String> {
        self.docs.require::<Category>(category_id).await?;
        let key = Follow::key(user_id, FolloweeType::Category, category_id);
        if self
            .create_follow(user_id, FolloweeType::Category, category_id)
            .await?
            .is_some()
        {
            info!(user_id, category_id, "category followed");
        }
        Ok(key)
    }

    pub async fn unfollow_category(&self, user_id: &str, category_id: &str) -> AppResult<()> {
        self.docs
            .delete::<Follow>(&Follow::key(user_id, FolloweeType::Category, category_id))
            .await?;
        Ok(())
    }

    async fn followee_ids(&self, user_id: &str, followee_type: FolloweeType) -> AppResult<Vec<String>> {
        let follows = self
            .docs
            .query::<Follow>(
                DocumentQuery::of::<Follow>()
                    .where_eq("follower_id", user_id)
                    .where_eq("followee_type", followee_type.as_str())
                    .order_by("created_at", SortDirection::Desc),
            )
            .await?;
        Ok(follows.into_iter().map(|f| f.followee_id).collect())
    }

    pub async fn get_user_followed_venues(&self, user_id: &str) -> AppResult<Vec<Venue>> {
        let ids = self.followee_ids(user_id, FolloweeType::Venue).await?;
        self.load_all::<Venue>(&ids).await
    }

    pub async fn get_user_followed_categories(&self, user_id: &str) -> AppResult<Vec<Category>> {
        let ids = self.followee_ids(user_id, FolloweeType::Category).await?;
        self.load_all::<Category>(&ids).await
    }

    /// Add an event to the user's mood board, or update its note if already saved
    pub async fn save_event(
        &self,
        user_id: &str,
        event_id: &str,
        note: Option<String>,
    ) -> AppResult<MoodBoard> {
        self.docs.require::<Event>(event_id).await?;
        let empty = MoodBoard {
            id: user_id.to_string(),
            saved_events: Vec::new(),
        };
        match self.docs.create(&empty).await {
            Ok(()) | Err(AppError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }

        self.docs
            .update_with::<MoodBoard, _>(user_id, |board| {
                match board.saved_events.iter_mut().find(|s| s.event_id == event_id) {
                    Some(saved) => saved.note = note.clone(),
                    None => board.saved_events.push(SavedEvent {
                        event_id: event_id.to_string(),
                        saved_at: Utc::now(),
                        note: note.clone(),
                    }),
                }
                Ok(())
            })
            .await
    }

    pub async fn remove_saved_event(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        if !self.docs.exists::<MoodBoard>(user_id).await? {
            return Ok(());
        }
        self.docs
            .update_with::<MoodBoard, _>(user_id, |board| {
                board.saved_events.retain(|s| s.event_id != event_id);
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Saved events with the current event details; deleted events keep a
    /// `null` event.
    pub async fn get_user_mood_board(&self, user_id: &str) -> AppResult<MoodBoardView> {
        let Some(board) = self.docs.get::<MoodBoard>(user_id).await? else {
            return Ok(MoodBoardView {
                saved_events: Vec::new(),
            });
        };
        let events = join_all(
            board
                .saved_events
                .iter()
                .map(|s| self.docs.get::<Event>(&s.event_id)),
        )
        .await;

        let saved_events = board
            .saved_events
            .into_iter()
            .zip(events)
            .map(|(saved, event)| Ok(SavedEventView { saved, event: event? }))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(MoodBoardView { saved_events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendship_key_is_order_independent() {
        assert_eq!(friendship_key("a", "b"), friendship_key("b", "a"));
        assert_ne!(friendship_key("a", "b"), friendship_key("a", "c"));
    }
}
