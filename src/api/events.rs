// Event routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::extract::{Json, Query};
use super::{ok, ApiResult, ImageUpload, LimitParams, NearbyParams, SearchParams, UploadedImage};
use crate::app_state::AppState;
use crate::infrastructure::viewer::Vc;
use crate::models::{CheckIn, CreateEventInput, Event, Rsvp, RsvpType, UpdateEventInput, User};
use crate::services::event_service::{
    DEFAULT_ATTENDEE_LIMIT, DEFAULT_EVENT_LIMIT, DEFAULT_NEARBY_RADIUS_KM, DEFAULT_SEARCH_LIMIT,
};
use crate::services::nearby::Nearby;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RsvpRequest {
    pub response_type: RsvpType,
}

async fn create_event(
    State(state): State<AppState>,
    vc: Vc,
    Json(input): Json<CreateEventInput>,
) -> ApiResult<Event> {
    let user_id = vc.require_user()?;
    ok(state.events.create_event(user_id, input).await?)
}

async fn get_event(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Event> {
    ok(state.events.get_event(&id).await?)
}

async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Event> {
    ok(state.events.get_event_by_slug(&slug).await?)
}

async fn update_event(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(patch): Json<UpdateEventInput>,
) -> ApiResult<Event> {
    let user_id = vc.require_user()?;
    ok(state.events.update_event(user_id, &id, patch).await?)
}

async fn delete_event(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let user_id = vc.require_user()?;
    state.events.delete_event(user_id, &id).await?;
    ok(id)
}

async fn upcoming_events(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Event>> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    ok(state.events.get_upcoming_events(limit).await?)
}

async fn search_events(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Event>> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    ok(state.events.search_events(&params.q, limit).await?)
}

async fn nearby_events(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> ApiResult<Vec<Nearby<Event>>> {
    let center = params.center()?;
    let radius = params.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    ok(state.events.get_nearby_events(center, radius, limit).await?)
}

async fn events_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Event>> {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    ok(state.events.get_events_by_category(&category, limit).await?)
}

async fn rsvp(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(req): Json<RsvpRequest>,
) -> ApiResult<Rsvp> {
    let user_id = vc.require_user()?;
    ok(state.events.rsvp(&id, user_id, req.response_type).await?)
}

async fn get_rsvp(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Option<Rsvp>> {
    let user_id = vc.require_user()?;
    ok(state.events.get_user_rsvp(&id, user_id).await?)
}

async fn attendees(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<User>> {
    let limit = params.limit.unwrap_or(DEFAULT_ATTENDEE_LIMIT);
    ok(state.events.get_event_attendees(&id, limit).await?)
}

async fn check_in(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<CheckIn> {
    let user_id = vc.require_user()?;
    ok(state.events.check_in(&id, user_id).await?)
}

async fn checked_in(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<bool> {
    let user_id = vc.require_user()?;
    ok(state.events.is_checked_in(&id, user_id).await?)
}

async fn friends_checked_in(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Vec<User>> {
    let user_id = vc.require_user()?;
    ok(state.events.get_friends_checked_in(&id, user_id).await?)
}

async fn record_view(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<String> {
    state.events.record_view(&id).await?;
    ok(id)
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
        .events
        .upload_event_image(user_id, &id, &upload.file_name, &bytes)
        .await?;
    ok(UploadedImage { path })
}

async fn reconcile(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Event> {
    let user_id = vc.require_user()?;
    ok(state.events.reconcile_event(user_id, &id).await?)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/upcoming", get(upcoming_events))
        .route("/events/search", get(search_events))
        .route("/events/nearby", get(nearby_events))
        .route("/events/by-category/{category}", get(events_by_category))
        .route("/events/by-slug/{slug}", get(get_event_by_slug))
        .route(
            "/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/events/{id}/rsvp", get(get_rsvp).post(rsvp))
        .route("/events/{id}/attendees", get(attendees))
        .route("/events/{id}/check-in", get(checked_in).post(check_in))
        .route("/events/{id}/check-ins/friends", get(friends_checked_in))
        .route("/events/{id}/view", post(record_view))
        .route("/events/{id}/image", post(upload_image))
        .route("/events/{id}/reconcile", post(reconcile))
}
