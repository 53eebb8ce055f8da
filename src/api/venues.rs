// Venue routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::extract::{Json, Query};
use super::{ok, ApiResult, ImageUpload, LimitParams, NearbyParams, SearchParams, UploadedImage};
use crate::app_state::AppState;
use crate::infrastructure::viewer::Vc;
use crate::models::{
    Activity, CreateVenueInput, Event, Review, ReviewInput, ReviewSort, UpdateVenueInput, Venue,
};
use crate::services::analytics_service::{VenueAnalytics, DEFAULT_ANALYTICS_DAYS};
use crate::services::event_service::{VenueEventFilter, DEFAULT_EVENT_LIMIT, DEFAULT_NEARBY_RADIUS_KM};
use crate::services::feed_service::DEFAULT_FEED_LIMIT;
use crate::services::nearby::Nearby;
use crate::services::venue_service::{
    DEFAULT_FEATURED_LIMIT, DEFAULT_NEARBY_LIMIT, DEFAULT_REVIEW_LIMIT, DEFAULT_VENUE_LIST_LIMIT,
};

#[derive(Debug, Deserialize)]
pub struct VenueEventsParams {
    #[serde(default)]
    pub filter: VenueEventFilter,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewParams {
    #[serde(default)]
    pub sort: ReviewSort,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FollowState {
    pub following: bool,
    pub follow_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowerCount {
    pub count: u64,
}

async fn create_venue(
    State(state): State<AppState>,
    vc: Vc,
    Json(input): Json<CreateVenueInput>,
) -> ApiResult<Venue> {
    let user_id = vc.require_user()?;
    ok(state.venues.create_venue(user_id, input).await?)
}

async fn get_venue(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Venue> {
    ok(state.venues.get_venue(&id).await?)
}

async fn get_venue_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Venue> {
    ok(state.venues.get_venue_by_slug(&slug).await?)
}

async fn update_venue(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(patch): Json<UpdateVenueInput>,
) -> ApiResult<Venue> {
    let user_id = vc.require_user()?;
    ok(state.venues.update_venue(user_id, &id, patch).await?)
}

async fn delete_venue(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let user_id = vc.require_user()?;
    state.venues.delete_venue(user_id, &id).await?;
    ok(id)
}

async fn featured_venues(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Venue>> {
    let limit = params.limit.unwrap_or(DEFAULT_FEATURED_LIMIT);
    ok(state.venues.get_featured_venues(limit).await?)
}

async fn search_venues(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Venue>> {
    let limit = params.limit.unwrap_or(DEFAULT_VENUE_LIST_LIMIT);
    ok(state.venues.search_venues(&params.q, limit).await?)
}

async fn nearby_venues(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> ApiResult<Vec<Nearby<Venue>>> {
    let center = params.center()?;
    let radius = params.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    let limit = params.limit.unwrap_or(DEFAULT_NEARBY_LIMIT);
    let categories = params.category_list();
    ok(state
        .venues
        .get_nearby_venues(center, radius, limit, &categories)
        .await?)
}

async fn venues_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Venue>> {
    let limit = params.limit.unwrap_or(DEFAULT_VENUE_LIST_LIMIT);
    ok(state.venues.get_venues_by_category(&category, limit).await?)
}

async fn venue_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<VenueEventsParams>,
) -> ApiResult<Vec<Event>> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    ok(state
        .events
        .get_events_by_venue(&id, params.filter, limit)
        .await?)
}

async fn submit_review(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(input): Json<ReviewInput>,
) -> ApiResult<Review> {
    let user_id = vc.require_user()?;
    ok(state.venues.submit_review(&id, user_id, input).await?)
}

async fn venue_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReviewParams>,
) -> ApiResult<Vec<Review>> {
    let limit = params.limit.unwrap_or(DEFAULT_REVIEW_LIMIT);
    ok(state.venues.get_venue_reviews(&id, limit, params.sort).await?)
}

async fn mark_review_helpful(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Review> {
    let viewer_id = vc.require_user()?;
    ok(state.venues.mark_review_helpful(viewer_id, &id).await?)
}

async fn follow_state(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<FollowState> {
    let user_id = vc.require_user()?;
    let following = state.venues.is_following(user_id, &id).await?;
    ok(FollowState {
        following,
        follow_id: None,
    })
}

async fn follow_venue(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<FollowState> {
    let user_id = vc.require_user()?;
    let follow_id = state.users.follow_venue(user_id, &id).await?;
    ok(FollowState {
        following: true,
        follow_id: Some(follow_id),
    })
}

async fn unfollow_venue(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<FollowState> {
    let user_id = vc.require_user()?;
    state.users.unfollow_venue(user_id, &id).await?;
    ok(FollowState {
        following: false,
        follow_id: None,
    })
}

async fn followers_count(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FollowerCount> {
    let count = state.venues.get_followers_count(&id).await?;
    ok(FollowerCount { count })
}

async fn venue_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Activity>> {
    let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    ok(state.feed.get_venue_activity(&id, limit).await?)
}

async fn venue_analytics(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<VenueAnalytics> {
    let user_id = vc.require_user()?;
    let days = params.days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    ok(state.analytics.venue_analytics(user_id, &id, days).await?)
}

async fn upload_image(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(upload): Json<ImageUpload>,
) -> ApiResult<UploadedImage> {
    let user_id = vc.require_user()?;
    let bytes = upload.bytes()?;
    let path = state
        .venues
        .upload_venue_image(user_id, &id, &upload.file_name, &bytes)
        .await?;
    ok(UploadedImage { path })
}

async fn reconcile(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Venue> {
    let user_id = vc.require_user()?;
    ok(state.venues.reconcile_venue(user_id, &id).await?)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/venues", post(create_venue))
        .route("/venues/featured", get(featured_venues))
        .route("/venues/search", get(search_venues))
        .route("/venues/nearby", get(nearby_venues))
        .route("/venues/by-category/{category}", get(venues_by_category))
        .route("/venues/by-slug/{slug}", get(get_venue_by_slug))
        .route(
            "/venues/{id}",
            get(get_venue).patch(update_venue).delete(delete_venue),
        )
        .route("/venues/{id}/events", get(venue_events))
        .route("/venues/{id}/reviews", get(venue_reviews).post(submit_review))
        .route(
            "/venues/{id}/follow",
            get(follow_state).post(follow_venue).delete(unfollow_venue),
        )
        .route("/venues/{id}/followers/count", get(followers_count))
        .route("/venues/{id}/activity", get(venue_activity))
        .route("/venues/{id}/analytics", get(venue_analytics))
        .route("/venues/{id}/image", post(upload_image))
        .route("/venues/{id}/reconcile", post(reconcile))
        .route("/reviews/{id}/helpful", post(mark_review_helpful))
}
