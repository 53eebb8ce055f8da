// Social feed and notification routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::extract::Query;
use super::{ok, ApiResult, LimitParams};
use crate::app_state::AppState;
use crate::infrastructure::viewer::Vc;
use crate::models::{Activity, Notification};
use crate::services::feed_service::DEFAULT_FEED_LIMIT;

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<u32>,
}

async fn social_feed(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Activity>> {
    let user_id = vc.require_user()?;
    let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    ok(state.feed.get_social_feed(user_id, limit).await?)
}

async fn notifications(
    State(state): State<AppState>,
    vc: Vc,
    Query(params): Query<NotificationParams>,
) -> ApiResult<Vec<Notification>> {
    let user_id = vc.require_user()?;
    let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    ok(state
        .feed
        .list_notifications(user_id, params.unread_only, limit)
        .await?)
}

async fn mark_read(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let user_id = vc.require_user()?;
    ok(state.feed.mark_notification_read(user_id, &id).await?)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(social_feed))
        .route("/notifications", get(notifications))
        .route("/notifications/{id}/read", post(mark_read))
}
