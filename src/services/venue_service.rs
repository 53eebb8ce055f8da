// Venue Service - venue lifecycle, discovery and reviews

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::core::{slugify, GeoPoint};
use crate::error::{AppError, AppResult};
use crate::infrastructure::blob_storage::BlobStore;
use crate::infrastructure::database::{DocumentQuery, FieldDelta, SortDirection};
use crate::infrastructure::documents::Documents;
use crate::models::{
    Activity, ActivityKind, CreateVenueInput, Event, Follow, FolloweeType, HelpfulVote,
    Notification, NotificationKind, Ratings, Review, ReviewInput, ReviewSort, UpdateVenueInput,
    User, Venue, VenueStatus,
};
use crate::services::counters::{category_diff, CategoryCounter, Counters};
use crate::services::nearby::{filter_nearby, Nearby};
use crate::services::{best_effort, contains_lower, image_blob_path, FeedService};

pub const DEFAULT_NEARBY_LIMIT: u32 = 10;
pub const DEFAULT_REVIEW_LIMIT: u32 = 10;
pub const DEFAULT_FEATURED_LIMIT: u32 = 6;
pub const DEFAULT_VENUE_LIST_LIMIT: u32 = 20;
pub const DEFAULT_REVIEW_RATING: u8 = 5;

#[derive(Clone)]
pub struct VenueService {
    docs: Documents,
    blobs: Arc<dyn BlobStore>,
    counters: Counters,
    feed: FeedService,
    queries: QueryConfig,
}

impl VenueService {
    pub fn new(
        docs: Documents,
        blobs: Arc<dyn BlobStore>,
        counters: Counters,
        feed: FeedService,
        queries: QueryConfig,
    ) -> Self {
        Self {
            docs,
            blobs,
            counters,
            feed,
            queries,
        }
    }

    fn require_owner(venue: &Venue, viewer_id: &str) -> AppResult<()> {
        if venue.owner_id == viewer_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the venue owner can modify this venue".to_string(),
            ))
        }
    }

    pub async fn create_venue(&self, owner_id: &str, input: CreateVenueInput) -> AppResult<Venue> {
        if owner_id.trim().is_empty() {
            return Err(AppError::Validation("An owner is required to create a venue".to_string()));
        }

        let now = Utc::now();
        let venue = Venue {
            id: Uuid::new_v4().to_string(),
            slug: slugify(&input.name),
            name: input.name.trim().to_string(),
            owner_id: owner_id.to_string(),
            description: input.description,
            location: input.location.into_location(None)?,
            categories: input.categories,
            contact: input.contact,
            amenities: input.amenities,
            hours_of_operation: input.hours_of_operation,
            photos: Vec::new(),
            ratings: Ratings::default(),
            followers: 0,
            event_count: 0,
            check_in_count: 0,
            verified: false,
            featured: false,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.docs.create(&venue).await?;
        info!(venue_id = %venue.id, owner_id, "venue created");

        self.counters
            .adjust_categories(&venue.categories, CategoryCounter::Venues, 1)
            .await;

        if let Some(owner) = best_effort(self.docs.get::<User>(owner_id).await, "owner lookup").flatten() {
            if owner.is_venue_account {
                best_effort(
                    self.docs
                        .merge::<User>(owner_id, serde_json::json!({ "venue_id": venue.id }))
                        .await,
                    "owner venue link",
                );
            }
        }
        Ok(venue)
    }

    pub async fn get_venue(&self, id: &str) -> AppResult<Venue> {
        self.docs.require::<Venue>(id).await
    }

    pub async fn get_venue_by_slug(&self, slug: &str) -> AppResult<Venue> {
        self.docs
            .first::<Venue>(DocumentQuery::of::<Venue>().where_eq("slug", slug))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venue with slug {} not found", slug)))
    }

    pub async fn update_venue(
        &self,
        viewer_id: &str,
        id: &str,
        patch: UpdateVenueInput,
    ) -> AppResult<Venue> {
        let current = self.docs.require::<Venue>(id).await?;
        Self::require_owner(&current, viewer_id)?;

        if let Some(new_owner) = patch.owner_id.as_deref() {
            if new_owner != current.owner_id && !self.docs.exists::<User>(new_owner).await? {
                return Err(AppError::Validation(format!("Unknown user: {}", new_owner)));
            }
        }
        let location = patch
            .location
            .clone()
            .map(|l| l.into_location(current.location.geopoint))
            .transpose()?;

        // Pre-image of the version the write actually landed on
        let mut before: Option<(Vec<String>, String)> = None;
        let updated = self
            .docs
            .update_with::<Venue, _>(id, |venue| {
                Self::require_owner(venue, viewer_id)?;
                before = Some((venue.categories.clone(), venue.name.clone()));
                if let Some(name) = &patch.name {
                    if name.trim() != venue.name {
                        venue.name = name.trim().to_string();
                        venue.slug = slugify(name);
                    }
                }
                if let Some(description) = &patch.description {
                    venue.description = description.clone();
                }
                if let Some(location) = &location {
                    venue.location = location.clone();
                }
                if let Some(categories) = &patch.categories {
                    venue.categories = categories.clone();
                }
                if let Some(contact) = &patch.contact {
                    venue.contact = contact.clone();
                }
                if let Some(amenities) = &patch.amenities {
                    venue.amenities = amenities.clone();
                }
                if let Some(hours) = &patch.hours_of_operation {
                    venue.hours_of_operation = hours.clone();
                }
                if let Some(status) = patch.status {
                    venue.status = status;
                }
                if let Some(owner_id) = &patch.owner_id {
                    venue.owner_id = owner_id.clone();
                }
                venue.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        info!(venue_id = id, "venue updated");

        let (old_categories, old_name) = before.unwrap_or_default();
        let (removed, added) = category_diff(&old_categories, &updated.categories);
        self.counters
            .adjust_categories(&removed, CategoryCounter::Venues, -1)
            .await;
        self.counters
            .adjust_categories(&added, CategoryCounter::Venues, 1)
            .await;

        if updated.name != old_name {
            best_effort(self.fan_out_venue_name(id, &updated.name).await, "venue name fan-out");
        }
        Ok(updated)
    }

    /// Copy a renamed venue's name onto its events
    async fn fan_out_venue_name(&self, venue_id: &str, name: &str) -> AppResult<usize> {
        let events = self
            .docs
            .query::<Event>(DocumentQuery::of::<Event>().where_eq("venue_id", venue_id))
            .await?;
        let patch = serde_json::json!({ "venue_name": name });
        let results = futures::future::join_all(
            events
                .iter()
                .map(|event| self.docs.merge::<Event>(&event.id, patch.clone())),
        )
        .await;
        for result in results {
            result?;
        }
        Ok(events.len())
    }

    pub async fn delete_venue(&self, viewer_id: &str, id: &str) -> AppResult<()> {
        let venue = self.docs.require::<Venue>(id).await?;
        Self::require_owner(&venue, viewer_id)?;

        let events = self
            .docs
            .count(&DocumentQuery::of::<Event>().where_eq("venue_id", id))
            .await?;
        if events > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot delete venue with {} associated events",
                events
            )));
        }

        let review_query = DocumentQuery::of::<Review>().where_eq("target_id", id);
        let follow_query = DocumentQuery::of::<Follow>()
            .where_eq("followee_id", id)
            .where_eq("followee_type", FolloweeType::Venue.as_str());
        let reviews = self.docs.query::<Review>(review_query.clone()).await?;
        let follows = self.docs.query::<Follow>(follow_query.clone()).await?;

        self.docs.delete::<Venue>(id).await?;
        let deleted_reviews = self.docs.delete_where(&review_query).await?;
        let deleted_follows = self.docs.delete_where(&follow_query).await?;
        self.docs
            .delete_where(&DocumentQuery::of::<HelpfulVote>().where_eq("venue_id", id))
            .await?;
        info!(venue_id = id, deleted_reviews, deleted_follows, "venue deleted");

        // Undo the per-user stats those records contributed.
        for review in &reviews {
            best_effort(
                self.counters.adjust_user_stat(&review.user_id, "reviews", -1).await,
                "reviewer review count",
            );
        }
        for follow in &follows {
            best_effort(
                self.counters
                    .adjust_user_stat(&follow.follower_id, "following", -1)
                    .await,
                "follower following count",
            );
        }

        self.counters
            .adjust_categories(&venue.categories, CategoryCounter::Venues, -1)
            .await;

        let linked = best_effort(
            self.docs
                .query::<User>(DocumentQuery::of::<User>().where_eq("venue_id", id))
                .await,
            "linked user lookup",
        )
        .unwrap_or_default();
        for user in linked {
            best_effort(
                self.docs
                    .merge::<User>(
                        &user.id,
                        serde_json::json!({ "venue_id": null, "is_venue_account": false }),
                    )
                    .await,
                "linked user reset",
            );
        }

        best_effort(
            self.blobs.delete_prefix(&format!("venues/{}", id)).await,
            "venue image cleanup",
        );
        Ok(())
    }

    /// Store a venue photo, returning its public path
    pub async fn upload_venue_image(
        &self,
        viewer_id: &str,
        venue_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        let venue = self.docs.require::<Venue>(venue_id).await?;
        Self::require_owner(&venue, viewer_id)?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }

        let path = image_blob_path("venues", venue_id, file_name)?;
        let url = self.blobs.upload(&path, bytes).await?;
        let stored = url.clone();
        self.docs
            .update_with::<Venue, _>(venue_id, |venue| {
                venue.photos.push(stored.clone());
                Ok(())
            })
            .await?;
        info!(venue_id, path = %path, size = bytes.len(), "venue image uploaded");
        Ok(url)
    }

    /// Active venues near `center`, optionally limited to any of `categories`
    pub async fn get_nearby_venues(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: u32,
        categories: &[String],
    ) -> AppResult<Vec<Nearby<Venue>>> {
        center.validate()?;
        let candidates = self
            .docs
            .query::<Venue>(self.active().limit(self.queries.nearby_venue_batch))
            .await?
            .into_iter()
            .filter(|venue| {
                categories.is_empty() || categories.iter().any(|c| venue.categories.contains(c))
            });
        filter_nearby(candidates, &center, radius_km, limit as usize)
    }

    fn active(&self) -> DocumentQuery {
        DocumentQuery::of::<Venue>().where_eq("status", VenueStatus::Active.as_str())
    }

    pub async fn submit_review(
        &self,
        venue_id: &str,
        user_id: &str,
        input: ReviewInput,
    ) -> AppResult<Review> {
        let rating = input.rating.unwrap_or(DEFAULT_REVIEW_RATING);
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(format!(
                "Rating must be between 1 and 5, got {}",
                rating
            )));
        }
        let venue = self.docs.require::<Venue>(venue_id).await?;
        let user = self.docs.require::<User>(user_id).await?;

        let existing = self
            .docs
            .count(
                &DocumentQuery::of::<Review>()
                    .where_eq("user_id", user_id)
                    .where_eq("target_id", venue_id),
            )
            .await?;
        if existing > 0 {
            return Err(AppError::Conflict("You have already reviewed this venue".to_string()));
        }

        let now = Utc::now();
        let review = Review {
            id: format!("{}_{}", venue_id, user_id),
            user_id: user_id.to_string(),
            user_name: user.display_name.clone(),
            target_id: venue_id.to_string(),
            target_name: venue.name.clone(),
            rating,
            title: input.title,
            content: input.content,
            helpful: 0,
            status: Review::PUBLISHED.to_string(),
            created_at: now,
            updated_at: now,
        };
        match self.docs.create(&review).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                return Err(AppError::Conflict("You have already reviewed this venue".to_string()))
            }
            Err(e) => return Err(e),
        }

        let ratings = self.counters.record_rating(venue_id, rating).await?;
        info!(venue_id, user_id, rating, average = ratings.average, "review submitted");

        best_effort(
            self.counters.adjust_user_stat(user_id, "reviews", 1).await,
            "user review count",
        );
        let reviewer = if user.display_name.is_empty() {
            "Someone"
        } else {
            user.display_name.as_str()
        };
        self.feed
            .notify(Notification::new(
                &venue.owner_id,
                NotificationKind::VenueReview,
                "New Review",
                format!("{} left a review on your venue", reviewer),
                ("review", &review.id),
            ))
            .await;
        self.feed
            .record_activity(
                Activity::new(
                    ActivityKind::Review,
                    format!("New {}-star review for {}", rating, venue.name),
                    "review",
                    &review.id,
                )
                .venue(Some(venue_id))
                .by(user_id),
            )
            .await;
        Ok(review)
    }

    pub async fn get_venue_reviews(
        &self,
        venue_id: &str,
        limit: u32,
        sort: ReviewSort,
    ) -> AppResult<Vec<Review>> {
        let order = match sort {
            ReviewSort::Recent => "created_at",
            ReviewSort::Helpful => "helpful",
        };
        self.docs
            .query(
                DocumentQuery::of::<Review>()
                    .where_eq("target_id", venue_id)
                    .where_eq("status", Review::PUBLISHED)
                    .order_by(order, SortDirection::Desc)
                    .limit(limit),
            )
            .await
    }

    /// Counts at most one helpful vote per user; repeat votes return the review unchanged
    pub async fn mark_review_helpful(
        &self,
        viewer_id: &str,
        review_id: &str,
    ) -> AppResult<Review> {
        let review = self.docs.require::<Review>(review_id).await?;
        let vote = HelpfulVote {
            id: HelpfulVote::key(review_id, viewer_id),
            review_id: review_id.to_string(),
            user_id: viewer_id.to_string(),
            venue_id: review.target_id.clone(),
            created_at: Utc::now(),
        };
        match self.docs.create(&vote).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => return Ok(review),
            Err(e) => return Err(e),
        }
        if !self
            .docs
            .increment::<Review>(review_id, &[FieldDelta::new("helpful", 1)])
            .await?
        {
            return Err(AppError::NotFound(format!("reviews {} not found", review_id)));
        }
        self.docs.require(review_id).await
    }

    pub async fn get_featured_venues(&self, limit: u32) -> AppResult<Vec<Venue>> {
        self.docs
            .query(self.active().where_eq("featured", true).limit(limit))
            .await
    }

    pub async fn search_venues(&self, query: &str, limit: u32) -> AppResult<Vec<Venue>> {
        let needle = query.trim().to_lowercase();
        let candidates = self
            .docs
            .query::<Venue>(self.active().limit(self.queries.search_batch))
            .await?;
        Ok(candidates
            .into_iter()
            .filter(|venue| {
                contains_lower(&venue.name, &needle)
                    || contains_lower(&venue.description, &needle)
                    || contains_lower(&venue.location.address, &needle)
                    || venue.categories.iter().any(|c| contains_lower(c, &needle))
            })
            .take(limit as usize)
            .collect())
    }

    pub async fn get_venues_by_category(&self, category: &str, limit: u32) -> AppResult<Vec<Venue>> {
        self.docs
            .query(
                self.active()
                    .array_contains("categories", category)
                    .limit(limit),
            )
            .await
    }

    /// Follower count from the follow records themselves
    pub async fn get_followers_count(&self, venue_id: &str) -> AppResult<u64> {
        self.docs
            .count(
                &DocumentQuery::of::<Follow>()
                    .where_eq("followee_id", venue_id)
                    .where_eq("followee_type", FolloweeType::Venue.as_str()),
            )
            .await
    }

    pub async fn is_following(&self, user_id: &str, venue_id: &str) -> AppResult<bool> {
        self.docs
            .exists::<Follow>(&Follow::key(user_id, FolloweeType::Venue, venue_id))
            .await
    }

    pub async fn reconcile_venue(&self, viewer_id: &str, venue_id: &str) -> AppResult<Venue> {
        let venue = self.docs.require::<Venue>(venue_id).await?;
        Self::require_owner(&venue, viewer_id)?;
        self.counters.reconcile_venue(venue_id).await
    }
}
