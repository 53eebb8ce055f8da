// Analytics Service - venue dashboard aggregates

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DocumentQuery, SortDirection};
use crate::infrastructure::documents::Documents;
use crate::models::{Event, Ratings, Venue};

pub const DEFAULT_ANALYTICS_DAYS: u32 = 30;
pub const MAX_ANALYTICS_DAYS: u32 = 366;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VenueTotals {
    pub events: u64,
    pub upcoming_events: u64,
    pub attendees: u64,
    pub interested: u64,
    pub views: u64,
    pub check_ins: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventStatsRow {
    pub event_id: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_date_time: DateTime<Utc>,
    pub attendee_count: u64,
    pub interested_count: u64,
    pub view_count: u64,
    pub check_in_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAttendance {
    pub date: NaiveDate,
    pub attendees: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueAnalytics {
    pub venue_id: String,
    pub days: u32,
    pub totals: VenueTotals,
    pub followers: u64,
    pub ratings: Ratings,
    pub events: Vec<EventStatsRow>,
    pub attendance: Vec<DailyAttendance>,
}

fn totals(events: &[Event], now: DateTime<Utc>) -> VenueTotals {
    events.iter().fold(VenueTotals::default(), |mut t, e| {
        t.events += 1;
        if e.start_date_time >= now {
            t.upcoming_events += 1;
        }
        t.attendees += e.attendee_count;
        t.interested += e.interested_count;
        t.views += e.view_count;
        t.check_ins += e.check_in_count;
        t
    })
}

/// One entry per day in `(today - days, today]`, oldest first; attendance is
/// credited to the day the event starts.
fn attendance_series(events: &[Event], today: NaiveDate, days: u32) -> Vec<DailyAttendance> {
    let mut series: BTreeMap<NaiveDate, u64> = (0..i64::from(days))
        .map(|back| (today - Duration::days(back), 0))
        .collect();
    for event in events {
        if let Some(total) = series.get_mut(&event.start_date_time.date_naive()) {
            *total += event.attendee_count;
        }
    }
    series
        .into_iter()
        .map(|(date, attendees)| DailyAttendance { date, attendees })
        .collect()
}

#[derive(Clone)]
pub struct AnalyticsService {
    docs: Documents,
}

impl AnalyticsService {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Owner-only dashboard for the venue
    pub async fn venue_analytics(
        &self,
        viewer_id: &str,
        venue_id: &str,
        days: u32,
    ) -> AppResult<VenueAnalytics> {
        if days == 0 || days > MAX_ANALYTICS_DAYS {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {}",
                MAX_ANALYTICS_DAYS
            )));
        }
        let venue = self.docs.require::<Venue>(venue_id).await?;
        if venue.owner_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the venue owner can view its analytics".to_string(),
            ));
        }
        let events = self
            .docs
            .query::<Event>(
                DocumentQuery::of::<Event>()
                    .where_eq("venue_id", venue_id)
                    .order_by("start_date_time", SortDirection::Desc),
            )
            .await?;
        debug!(venue_id, events = events.len(), days, "venue analytics");

        let now = Utc::now();
        Ok(VenueAnalytics {
            venue_id: venue.id,
            days,
            totals: totals(&events, now),
            followers: venue.followers,
            ratings: venue.ratings,
            attendance: attendance_series(&events, now.date_naive(), days),
            events: events
                .into_iter()
                .map(|e| EventStatsRow {
                    event_id: e.id,
                    name: e.name,
                    start_date_time: e.start_date_time,
                    attendee_count: e.attendee_count,
                    interested_count: e.interested_count,
                    view_count: e.view_count,
                    check_in_count: e.check_in_count,
                })
                .collect(),
        })
    }
}
