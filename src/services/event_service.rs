// Event Service - event lifecycle, RSVPs, check-ins and event media

use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::core::{slugify, GeoPoint};
use crate::error::{AppError, AppResult};
use crate::infrastructure::blob_storage::BlobStore;
use crate::infrastructure::database::{DocumentQuery, SortDirection};
use crate::infrastructure::documents::Documents;
use crate::models::{
    Activity, ActivityKind, CheckIn, CreateEventInput, Event, EventStatus, Rsvp, RsvpType,
    UpdateEventInput, User, Venue,
};
use crate::services::counters::{category_diff, CategoryCounter, Counters};
use crate::services::nearby::{filter_nearby, Nearby};
use crate::services::{best_effort, contains_lower, image_blob_path, FeedService};

pub const DEFAULT_EVENT_LIMIT: u32 = 12;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const DEFAULT_ATTENDEE_LIMIT: u32 = 20;
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueEventFilter {
    #[default]
    All,
    Upcoming,
    Past,
    Draft,
}

#[derive(Clone)]
pub struct EventService {
    docs: Documents,
    blobs: Arc<dyn BlobStore>,
    counters: Counters,
    feed: FeedService,
    queries: QueryConfig,
}

impl EventService {
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

    async fn require_venue(&self, venue_id: &str) -> AppResult<Venue> {
        self.docs
            .get::<Venue>(venue_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown venue: {}", venue_id)))
    }

    fn require_creator(event: &Event, viewer_id: &str) -> AppResult<()> {
        if event.creator_id == viewer_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the event creator can modify this event".to_string(),
            ))
        }
    }

    pub async fn create_event(&self, creator_id: &str, input: CreateEventInput) -> AppResult<Event> {
        let venue_name = match (&input.venue_id, input.venue_name) {
            (Some(venue_id), None) => Some(self.require_venue(venue_id).await?.name),
            (Some(venue_id), Some(name)) => {
                self.require_venue(venue_id).await?;
                Some(name)
            }
            (None, name) => name,
        };

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4().to_string(),
            slug: slugify(&input.name),
            name: input.name.trim().to_string(),
            description: input.description,
            start_date_time: input.start_date_time,
            end_date_time: input.end_date_time,
            venue_id: input.venue_id,
            venue_name,
            location: input.location.into_location(None)?,
            categories: input.categories,
            price: input.price,
            capacity: input.capacity,
            cover_image: None,
            creator_id: creator_id.to_string(),
            attendee_count: 0,
            interested_count: 0,
            view_count: 0,
            check_in_count: 0,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.docs.create(&event).await?;
        info!(event_id = %event.id, creator_id, "event created");

        if let Some(venue_id) = &event.venue_id {
            self.counters.adjust_venue_events(venue_id, 1).await?;
        }
        self.counters
            .adjust_categories(&event.categories, CategoryCounter::Events, 1)
            .await;
        self.feed
            .record_activity(
                Activity::new(
                    ActivityKind::EventCreated,
                    format!("New event created: {}", event.name),
                    "event",
                    &event.id,
                )
                .venue(event.venue_id.as_deref())
                .by(creator_id),
            )
            .await;
        Ok(event)
    }

    pub async fn get_event(&self, id: &str) -> AppResult<Event> {
        self.docs.require::<Event>(id).await
    }

    pub async fn get_event_by_slug(&self, slug: &str) -> AppResult<Event> {
        self.docs
            .first::<Event>(DocumentQuery::of::<Event>().where_eq("slug", slug))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event with slug {} not found", slug)))
    }

    pub async fn update_event(
        &self,
        viewer_id: &str,
        id: &str,
        patch: UpdateEventInput,
    ) -> AppResult<Event> {
        let current = self.docs.require::<Event>(id).await?;
        Self::require_creator(&current, viewer_id)?;

        // Empty string detaches the event from its venue.
        let new_venue = match patch.venue_id.as_deref() {
            Some("") => Some(None),
            Some(venue_id) if current.venue_id.as_deref() != Some(venue_id) => {
                let venue = self.require_venue(venue_id).await?;
                Some(Some((venue.id, venue.name)))
            }
            _ => None,
        };
        let location = patch
            .location
            .clone()
            .map(|l| l.into_location(current.location.geopoint))
            .transpose()?;

        // Pre-image of the version the write actually landed on
        let mut before: Option<(Vec<String>, Option<String>)> = None;
        let updated = self
            .docs
            .update_with::<Event, _>(id, |event| {
                Self::require_creator(event, viewer_id)?;
                before = Some((event.categories.clone(), event.venue_id.clone()));
                if let Some(name) = &patch.name {
                    if name.trim() != event.name {
                        event.name = name.trim().to_string();
                        event.slug = slugify(name);
                    }
                }
                if let Some(description) = &patch.description {
                    event.description = description.clone();
                }
                if let Some(start) = patch.start_date_time {
                    event.start_date_time = start;
                }
                if let Some(end) = patch.end_date_time {
                    event.end_date_time = end;
                }
                if let Some(venue) = &new_venue {
                    event.venue_id = venue.as_ref().map(|(id, _)| id.clone());
                    event.venue_name = venue.as_ref().map(|(_, name)| name.clone());
                }
                if let Some(location) = &location {
                    event.location = location.clone();
                }
                if let Some(categories) = &patch.categories {
                    event.categories = categories.clone();
                }
                if patch.price.is_some() {
                    event.price = patch.price;
                }
                if patch.capacity.is_some() {
                    event.capacity = patch.capacity;
                }
                if let Some(status) = patch.status {
                    event.status = status;
                }
                event.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        info!(event_id = id, "event updated");

        let (old_categories, old_venue_id) = before.unwrap_or_default();
        if old_venue_id != updated.venue_id {
            if let Some(old) = &old_venue_id {
                best_effort(self.counters.adjust_venue_events(old, -1).await, "venue event count");
            }
            if let Some(new) = &updated.venue_id {
                best_effort(self.counters.adjust_venue_events(new, 1).await, "venue event count");
            }
        }
        let (removed, added) = category_diff(&old_categories, &updated.categories);
        self.counters
            .adjust_categories(&removed, CategoryCounter::Events, -1)
            .await;
        self.counters
            .adjust_categories(&added, CategoryCounter::Events, 1)
            .await;

        self.feed
            .record_activity(
                Activity::new(
                    ActivityKind::EventUpdated,
                    format!("Event updated: {}", updated.name),
                    "event",
                    id,
                )
                .venue(updated.venue_id.as_deref())
                .by(viewer_id),
            )
            .await;
        Ok(updated)
    }

    pub async fn delete_event(&self, viewer_id: &str, id: &str) -> AppResult<()> {
        let event = self.docs.require::<Event>(id).await?;
        Self::require_creator(&event, viewer_id)?;

        let rsvps = self
            .docs
            .delete_where(&DocumentQuery::of::<Rsvp>().where_eq("event_id", id))
            .await?;
        let check_ins = self
            .docs
            .delete_where(&DocumentQuery::of::<CheckIn>().where_eq("event_id", id))
            .await?;
        self.docs.delete::<Event>(id).await?;
        info!(event_id = id, rsvps, check_ins, "event deleted");

        if let Some(cover) = &event.cover_image {
            best_effort(self.blobs.delete(cover).await, "cover image delete");
        }
        if let Some(venue_id) = &event.venue_id {
            best_effort(self.counters.adjust_venue_events(venue_id, -1).await, "venue event count");
        }
        self.counters
            .adjust_categories(&event.categories, CategoryCounter::Events, -1)
            .await;
        self.feed
            .record_activity(
                Activity::new(
                    ActivityKind::EventDeleted,
                    format!("Event deleted: {}", event.name),
                    "event",
                    id,
                )
                .venue(event.venue_id.as_deref())
                .by(viewer_id),
            )
            .await;
        Ok(())
    }

    fn upcoming_scheduled() -> DocumentQuery {
        DocumentQuery::of::<Event>()
            .where_gte("start_date_time", Utc::now().timestamp_millis())
            .where_eq("status", EventStatus::Scheduled.as_str())
            .order_by("start_date_time", SortDirection::Asc)
    }

    pub async fn get_upcoming_events(&self, limit: u32) -> AppResult<Vec<Event>> {
        self.docs.query(Self::upcoming_scheduled().limit(limit)).await
    }

    pub async fn get_events_by_venue(
        &self,
        venue_id: &str,
        filter: VenueEventFilter,
        limit: u32,
    ) -> AppResult<Vec<Event>> {
        let now = Utc::now().timestamp_millis();
        let query = DocumentQuery::of::<Event>().where_eq("venue_id", venue_id);
        let query = match filter {
            VenueEventFilter::Upcoming => query
                .where_gte("start_date_time", now)
                .order_by("start_date_time", SortDirection::Asc),
            VenueEventFilter::Past => query
                .where_lt("start_date_time", now)
                .order_by("start_date_time", SortDirection::Desc),
            VenueEventFilter::Draft => query
                .where_eq("status", EventStatus::Draft.as_str())
                .order_by("updated_at", SortDirection::Desc),
            VenueEventFilter::All => query.order_by("start_date_time", SortDirection::Desc),
        };
        self.docs.query(query.limit(limit)).await
    }

    pub async fn get_events_by_category(&self, category: &str, limit: u32) -> AppResult<Vec<Event>> {
        self.docs
            .query(
                Self::upcoming_scheduled()
                    .array_contains("categories", category)
                    .limit(limit),
            )
            .await
    }

    /// Upcoming scheduled events near `center`, drawn from a bounded batch of
    /// the soonest events.
    pub async fn get_nearby_events(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: u32,
    ) -> AppResult<Vec<Nearby<Event>>> {
        center.validate()?;
        let candidates = self
            .docs
            .query::<Event>(Self::upcoming_scheduled().limit(self.queries.nearby_event_batch))
            .await?;
        filter_nearby(candidates, &center, radius_km, limit as usize)
    }

    pub async fn search_events(&self, query: &str, limit: u32) -> AppResult<Vec<Event>> {
        let needle = query.trim().to_lowercase();
        let candidates = self
            .docs
            .query::<Event>(Self::upcoming_scheduled().limit(self.queries.search_batch))
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|event| {
                contains_lower(&event.name, &needle)
                    || contains_lower(&event.description, &needle)
                    || event
                        .venue_name
                        .as_deref()
                        .is_some_and(|v| contains_lower(v, &needle))
                    || contains_lower(&event.location.address, &needle)
                    || event.categories.iter().any(|c| contains_lower(c, &needle))
            })
            .take(limit as usize)
            .collect())
    }

    /// Create or change the user's single RSVP and move the event counters
    pub async fn rsvp(&self, event_id: &str, user_id: &str, response: RsvpType) -> AppResult<Rsvp> {
        let event = self.docs.require::<Event>(event_id).await?;
        let key = Rsvp::key(event_id, user_id);

        let (rsvp, previous) = loop {
            if self.docs.exists::<Rsvp>(&key).await? {
                let mut previous = None;
                let rsvp = self
                    .docs
                    .update_with::<Rsvp, _>(&key, |rsvp| {
                        previous = Some(rsvp.response_type);
                        if rsvp.response_type != response {
                            rsvp.response_type = response;
                            rsvp.updated_at = Utc::now();
                        }
                        Ok(())
                    })
                    .await?;
                break (rsvp, previous);
            }

            let now = Utc::now();
            let rsvp = Rsvp {
                id: key.clone(),
                event_id: event_id.to_string(),
                user_id: user_id.to_string(),
                response_type: response,
                created_at: now,
                updated_at: now,
            };
            match self.docs.create(&rsvp).await {
                Ok(()) => break (rsvp, None),
                // Lost a race with a concurrent first RSVP; treat it as an update.
                Err(AppError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        };

        self.counters
            .apply_rsvp_transition(event_id, previous, response)
            .await?;
        info!(event_id, user_id, response = response.as_str(), "rsvp recorded");

        if response == RsvpType::Going && previous != Some(RsvpType::Going) {
            self.feed
                .record_activity(
                    Activity::new(
                        ActivityKind::EventRsvp,
                        format!("New RSVP for event: {}", event.name),
                        "event",
                        event_id,
                    )
                    .venue(event.venue_id.as_deref())
                    .by(user_id),
                )
                .await;
        }
        Ok(rsvp)
    }

    pub async fn get_user_rsvp(&self, event_id: &str, user_id: &str) -> AppResult<Option<Rsvp>> {
        self.docs.get::<Rsvp>(&Rsvp::key(event_id, user_id)).await
    }

    pub async fn get_event_attendees(&self, event_id: &str, limit: u32) -> AppResult<Vec<User>> {
        let rsvps = self
            .docs
            .query::<Rsvp>(
                DocumentQuery::of::<Rsvp>()
                    .where_eq("event_id", event_id)
                    .where_eq("response_type", RsvpType::Going.as_str())
                    .limit(limit),
            )
            .await?;
        self.load_users(rsvps.iter().map(|r| r.user_id.as_str())).await
    }

    async fn load_users<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> AppResult<Vec<User>> {
        let users = join_all(ids.into_iter().map(|id| self.docs.get::<User>(id))).await;
        Ok(users
            .into_iter()
            .collect::<AppResult<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Store an image as the event cover, returning its public path
    pub async fn upload_event_image(
        &self,
        viewer_id: &str,
        event_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        let event = self.docs.require::<Event>(event_id).await?;
        Self::require_creator(&event, viewer_id)?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }
        let path = image_blob_path("events", event_id, file_name)?;
        let url = self.blobs.upload(&path, bytes).await?;

        self.docs
            .merge::<Event>(
                event_id,
                serde_json::json!({
                    "cover_image": url,
                    "updated_at": Utc::now().timestamp_millis(),
                }),
            )
            .await?;
        if let Some(old) = &event.cover_image {
            best_effort(self.blobs.delete(old).await, "old cover image delete");
        }
        info!(event_id, path = %path, size = bytes.len(), "event image uploaded");
        Ok(url)
    }

    pub async fn check_in(&self, event_id: &str, user_id: &str) -> AppResult<CheckIn> {
        let event = self.docs.require::<Event>(event_id).await?;
        let check_in = CheckIn {
            id: CheckIn::key(event_id, user_id),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            venue_id: event.venue_id.clone(),
            status: "active".to_string(),
            created_at: Utc::now(),
        };
        match self.docs.create(&check_in).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                return Err(AppError::Conflict("Already checked in to this event".to_string()))
            }
            Err(e) => return Err(e),
        }

        self.counters.record_check_in(&check_in).await?;
        info!(event_id, user_id, "checked in");
        self.feed
            .record_activity(
                Activity::new(
                    ActivityKind::CheckIn,
                    format!("Checked in at {}", event.name),
                    "event",
                    event_id,
                )
                .venue(event.venue_id.as_deref())
                .by(user_id),
            )
            .await;
        Ok(check_in)
    }

    pub async fn is_checked_in(&self, event_id: &str, user_id: &str) -> AppResult<bool> {
        self.docs.exists::<CheckIn>(&CheckIn::key(event_id, user_id)).await
    }

    /// Profiles of the user's friends who checked in to the event
    pub async fn get_friends_checked_in(&self, event_id: &str, user_id: &str) -> AppResult<Vec<User>> {
        let friends = self.feed.friend_ids(user_id).await?;
        if friends.is_empty() {
            return Ok(Vec::new());
        }
        let check_ins = self
            .docs
            .query::<CheckIn>(
                DocumentQuery::of::<CheckIn>()
                    .where_eq("event_id", event_id)
                    .where_in("user_id", friends)
                    .order_by("created_at", SortDirection::Desc),
            )
            .await?;
        self.load_users(check_ins.iter().map(|c| c.user_id.as_str())).await
    }

    pub async fn record_view(&self, event_id: &str) -> AppResult<()> {
        self.counters.record_view(event_id).await
    }

    pub async fn reconcile_event(&self, viewer_id: &str, event_id: &str) -> AppResult<Event> {
        let event = self.docs.require::<Event>(event_id).await?;
        Self::require_creator(&event, viewer_id)?;
        self.counters.reconcile_event(event_id).await
    }
}
