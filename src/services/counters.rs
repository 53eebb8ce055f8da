// Denormalized Counters - parent aggregates maintained from child-record transitions
// Plain counters go through the store's atomic increment; rating aggregates use
// versioned read-modify-write. Reconciliation recounts from the child records.

use tracing::{debug, info};

use crate::core::slugify;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DocumentQuery, FieldDelta};
use crate::infrastructure::documents::{Document, Documents};
use crate::models::{
    Category, CheckIn, Event, Follow, FolloweeType, Ratings, Review, Rsvp, RsvpType, User, Venue,
};
use crate::services::best_effort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCounter {
    Venues,
    Events,
}

impl CategoryCounter {
    fn field(&self) -> &'static str {
        match self {
            CategoryCounter::Venues => "venue_count",
            CategoryCounter::Events => "event_count",
        }
    }
}

/// Event counter deltas for an RSVP moving from `old` to `new`
pub fn rsvp_deltas(old: Option<RsvpType>, new: RsvpType) -> Vec<FieldDelta> {
    if old == Some(new) {
        return Vec::new();
    }
    let mut deltas = Vec::new();
    if let Some(field) = old.and_then(|o| o.counter_field()) {
        deltas.push(FieldDelta::new(field, -1));
    }
    if let Some(field) = new.counter_field() {
        deltas.push(FieldDelta::new(field, 1));
    }
    deltas
}

/// Categories only in `old` and only in `new`, in input order
pub fn category_diff<'a>(old: &'a [String], new: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
    let removed = old
        .iter()
        .filter(|c| !new.contains(c))
        .map(String::as_str)
        .collect();
    let added = new
        .iter()
        .filter(|c| !old.contains(c))
        .map(String::as_str)
        .collect();
    (removed, added)
}

#[derive(Clone)]
pub struct Counters {
    docs: Documents,
}

impl Counters {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    async fn increment_existing<T: Document>(&self, id: &str, deltas: &[FieldDelta]) -> AppResult<()> {
        if self.docs.increment::<T>(id, deltas).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{} {} not found", T::COLLECTION, id)))
        }
    }

    pub async fn apply_rsvp_transition(
        &self,
        event_id: &str,
        old: Option<RsvpType>,
        new: RsvpType,
    ) -> AppResult<()> {
        let deltas = rsvp_deltas(old, new);
        if deltas.is_empty() {
            return Ok(());
        }
        debug!(event_id, ?old, ?new, "applying rsvp transition");
        self.increment_existing::<Event>(event_id, &deltas).await
    }

    pub async fn record_view(&self, event_id: &str) -> AppResult<()> {
        self.increment_existing::<Event>(event_id, &[FieldDelta::new("view_count", 1)])
            .await
    }

    /// Fold one new rating into the venue aggregate
    pub async fn record_rating(&self, venue_id: &str, rating: u8) -> AppResult<Ratings> {
        let venue = self
            .docs
            .update_with::<Venue, _>(venue_id, |venue| {
                venue.ratings.record(rating);
                Ok(())
            })
            .await?;
        Ok(venue.ratings)
    }

    pub async fn adjust_venue_followers(&self, venue_id: &str, delta: i64) -> AppResult<()> {
        self.increment_existing::<Venue>(venue_id, &[FieldDelta::new("followers", delta)])
            .await
    }

    pub async fn adjust_venue_events(&self, venue_id: &str, delta: i64) -> AppResult<()> {
        self.increment_existing::<Venue>(venue_id, &[FieldDelta::new("event_count", delta)])
            .await
    }

    /// Adjust `stats.<field>` on a profile. Returns false when the user has no profile.
    pub async fn adjust_user_stat(&self, user_id: &str, field: &str, delta: i64) -> AppResult<bool> {
        self.docs
            .increment::<User>(user_id, &[FieldDelta::new(&format!("stats.{}", field), delta)])
            .await
    }

    /// Adjust a category counter, creating the category on first positive use
    pub async fn adjust_category(
        &self,
        name: &str,
        counter: CategoryCounter,
        delta: i64,
    ) -> AppResult<()> {
        let id = slugify(name);
        if id.is_empty() || delta == 0 {
            return Ok(());
        }
        let deltas = [FieldDelta::new(counter.field(), delta)];
        if self.docs.increment::<Category>(&id, &deltas).await? || delta < 0 {
            return Ok(());
        }

        let category = Category {
            id: id.clone(),
            name: name.trim().to_string(),
            slug: id.clone(),
            venue_count: 0,
            event_count: 0,
        };
        match self.docs.create(&category).await {
            Ok(()) | Err(AppError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
        self.docs.increment::<Category>(&id, &deltas).await?;
        Ok(())
    }

    /// Best-effort adjustment of several categories
    pub async fn adjust_categories<S: AsRef<str>>(
        &self,
        names: &[S],
        counter: CategoryCounter,
        delta: i64,
    ) {
        for name in names {
            best_effort(
                self.adjust_category(name.as_ref(), counter, delta).await,
                "category count",
            );
        }
    }

    /// Counter fan-out for a new check-in
    pub async fn record_check_in(&self, check_in: &CheckIn) -> AppResult<()> {
        self.increment_existing::<Event>(&check_in.event_id, &[FieldDelta::new("check_in_count", 1)])
            .await?;

        if let Some(venue_id) = &check_in.venue_id {
            best_effort(
                self.docs
                    .increment::<Venue>(venue_id, &[FieldDelta::new("check_in_count", 1)])
                    .await,
                "venue check-in count",
            );
        }
        best_effort(
            self.docs
                .increment::<User>(
                    &check_in.user_id,
                    &[
                        FieldDelta::new("stats.check_ins", 1),
                        FieldDelta::new("stats.events_attended", 1),
                    ],
                )
                .await,
            "user check-in stats",
        );
        Ok(())
    }

    /// Recount RSVPs and check-ins and overwrite the event counters
    pub async fn reconcile_event(&self, event_id: &str) -> AppResult<Event> {
        self.docs.require::<Event>(event_id).await?;

        let rsvps = DocumentQuery::of::<Rsvp>().where_eq("event_id", event_id);
        let going = self
            .docs
            .count(&rsvps.clone().where_eq("response_type", RsvpType::Going.as_str()))
            .await?;
        let interested = self
            .docs
            .count(&rsvps.where_eq("response_type", RsvpType::Interested.as_str()))
            .await?;
        let check_ins = self
            .docs
            .count(&DocumentQuery::of::<CheckIn>().where_eq("event_id", event_id))
            .await?;

        let event = self
            .docs
            .update_with::<Event, _>(event_id, |event| {
                event.attendee_count = going;
                event.interested_count = interested;
                event.check_in_count = check_ins;
                Ok(())
            })
            .await?;
        info!(event_id, going, interested, check_ins, "reconciled event counters");
        Ok(event)
    }

    /// Recount followers, published reviews, events and check-ins for a venue
    pub async fn reconcile_venue(&self, venue_id: &str) -> AppResult<Venue> {
        self.docs.require::<Venue>(venue_id).await?;

        let followers = self
            .docs
            .count(
                &DocumentQuery::of::<Follow>()
                    .where_eq("followee_id", venue_id)
                    .where_eq("followee_type", FolloweeType::Venue.as_str()),
            )
            .await?;
        let reviews: Vec<Review> = self
            .docs
            .query(
                DocumentQuery::of::<Review>()
                    .where_eq("target_id", venue_id)
                    .where_eq("status", Review::PUBLISHED),
            )
            .await?;
        let ratings = Ratings::from_ratings(reviews.iter().map(|r| r.rating));
        let events = self
            .docs
            .count(&DocumentQuery::of::<Event>().where_eq("venue_id", venue_id))
            .await?;
        let check_ins = self
            .docs
            .count(&DocumentQuery::of::<CheckIn>().where_eq("venue_id", venue_id))
            .await?;

        let venue = self
            .docs
            .update_with::<Venue, _>(venue_id, |venue| {
                venue.followers = followers;
                venue.ratings = ratings.clone();
                venue.event_count = events;
                venue.check_in_count = check_ins;
                Ok(())
            })
            .await?;
        info!(venue_id, followers, reviews = venue.ratings.count, events, check_ins, "reconciled venue counters");
        Ok(venue)
    }
}
