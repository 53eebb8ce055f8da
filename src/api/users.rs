// User, friendship and follow routes

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use super::extract::{Json, Query};
use super::{ok, ApiResult, SearchParams};
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::Vc;
use crate::models::{
    Category, CreateUserInput, Friendship, LocationInput, MoodBoard, UpdateUserInput, User, Venue,
};
use crate::services::user_service::{FriendRequest, MoodBoardView, DEFAULT_USER_SEARCH_LIMIT};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendRequestBody {
    pub friend_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondBody {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveEventBody {
    pub event_id: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
}

/// The viewer, who must be the user named in the path
fn require_same_user<'a>(vc: &'a Vc, user_id: &str) -> AppResult<&'a str> {
    let viewer = vc.require_user()?;
    if viewer == user_id {
        Ok(viewer)
    } else {
        Err(AppError::Forbidden(
            "Cannot act on behalf of another user".to_string(),
        ))
    }
}

/// Profiles are keyed by the caller's identity
async fn create_user(
    State(state): State<AppState>,
    vc: Vc,
    Json(input): Json<CreateUserInput>,
) -> ApiResult<User> {
    let user_id = vc.require_user()?;
    ok(state.users.create_user_profile(user_id, input).await?)
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    ok(state.users.get_user_profile(&id).await?)
}

async fn update_user(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(patch): Json<UpdateUserInput>,
) -> ApiResult<User> {
    let viewer = vc.require_user()?;
    ok(state.users.update_user_profile(viewer, &id, patch).await?)
}

async fn update_location(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(location): Json<LocationInput>,
) -> ApiResult<User> {
    let viewer = vc.require_user()?;
    ok(state.users.update_user_location(viewer, &id, location).await?)
}

async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<User>> {
    let limit = params.limit.unwrap_or(DEFAULT_USER_SEARCH_LIMIT);
    ok(state.users.search_users(&params.q, limit).await?)
}

async fn friends(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<User>> {
    ok(state.users.get_user_friends(&id).await?)
}

async fn friend_requests(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Vec<FriendRequest>> {
    let user_id = require_same_user(&vc, &id)?;
    ok(state.users.get_pending_friend_requests(user_id).await?)
}

async fn followed_venues(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Venue>> {
    ok(state.users.get_user_followed_venues(&id).await?)
}

async fn followed_categories(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Category>> {
    ok(state.users.get_user_followed_categories(&id).await?)
}

async fn mood_board(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<MoodBoardView> {
    let user_id = require_same_user(&vc, &id)?;
    ok(state.users.get_user_mood_board(user_id).await?)
}

async fn save_event(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(body): Json<SaveEventBody>,
) -> ApiResult<MoodBoard> {
    let user_id = require_same_user(&vc, &id)?;
    ok(state
        .users
        .save_event(user_id, &body.event_id, body.note)
        .await?)
}

async fn remove_saved_event(
    State(state): State<AppState>,
    vc: Vc,
    Path((id, event_id)): Path<(String, String)>,
) -> ApiResult<String> {
    let user_id = require_same_user(&vc, &id)?;
    state.users.remove_saved_event(user_id, &event_id).await?;
    ok(event_id)
}

async fn send_friend_request(
    State(state): State<AppState>,
    vc: Vc,
    Json(body): Json<FriendRequestBody>,
) -> ApiResult<Created> {
    let user_id = vc.require_user()?;
    let id = state.users.send_friend_request(user_id, &body.friend_id).await?;
    ok(Created { id })
}

async fn respond_to_friend_request(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(body): Json<RespondBody>,
) -> ApiResult<Friendship> {
    let user_id = vc.require_user()?;
    ok(state
        .users
        .respond_to_friend_request(&id, user_id, body.accept)
        .await?)
}

async fn remove_friendship(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let user_id = vc.require_user()?;
    state.users.remove_friendship(user_id, &id).await?;
    ok(id)
}

async fn follow_category(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Created> {
    let user_id = vc.require_user()?;
    let id = state.users.follow_category(user_id, &id).await?;
    ok(Created { id })
}

async fn unfollow_category(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let user_id = vc.require_user()?;
    state.users.unfollow_category(user_id, &id).await?;
    ok(id)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/search", get(search_users))
        .route("/users/{id}", get(get_user).patch(update_user))
        .route("/users/{id}/location", put(update_location))
        .route("/users/{id}/friends", get(friends))
        .route("/users/{id}/friend-requests", get(friend_requests))
        .route("/users/{id}/followed-venues", get(followed_venues))
        .route("/users/{id}/followed-categories", get(followed_categories))
        .route("/users/{id}/mood-board", get(mood_board).post(save_event))
        .route("/users/{id}/mood-board/{event_id}", delete(remove_saved_event))
        .route("/friends/requests", post(send_friend_request))
        .route(
            "/friends/requests/{id}/respond",
            post(respond_to_friend_request),
        )
        .route("/friendships/{id}", delete(remove_friendship))
        .route(
            "/categories/{id}/follow",
            post(follow_category).delete(unfollow_category),
        )
}
