// Blog routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};

use super::extract::{Json, Query};
use super::{ok, ApiResult, LimitParams, SearchParams};
use crate::app_state::AppState;
use crate::infrastructure::viewer::Vc;
use crate::models::{
    Comment, CreateCommentInput, CreatePostInput, NewsletterSignupInput, NewsletterSubscriber, Post,
    UpdatePostInput,
};
use crate::services::blog_service::{PostCategory, DEFAULT_POST_LIMIT};

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Vec<Post>> {
    let limit = params.limit.unwrap_or(DEFAULT_POST_LIMIT);
    ok(state.blog.list_recent_posts(limit).await?)
}

async fn create_post(
    State(state): State<AppState>,
    vc: Vc,
    Json(input): Json<CreatePostInput>,
) -> ApiResult<Post> {
    let user_id = vc.require_user()?;
    ok(state.blog.create_post(user_id, input).await?)
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Post> {
    ok(state.blog.get_post(&id).await?)
}

async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Post> {
    ok(state.blog.get_post_by_slug(&slug).await?)
}

async fn posts_by_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Vec<Post>> {
    ok(state.blog.get_posts_by_category(&slug).await?)
}

async fn update_post(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(patch): Json<UpdatePostInput>,
) -> ApiResult<Post> {
    let user_id = vc.require_user()?;
    ok(state.blog.update_post(user_id, &id, patch).await?)
}

async fn delete_post(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let user_id = vc.require_user()?;
    state.blog.delete_post(user_id, &id).await?;
    ok(id)
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Comment>> {
    ok(state.blog.list_comments(&id).await?)
}

async fn add_comment(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> ApiResult<Comment> {
    let user_id = vc.require_user()?;
    ok(state.blog.add_comment(&id, user_id, input).await?)
}

async fn search_posts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<Post>> {
    let limit = params.limit.unwrap_or(DEFAULT_POST_LIMIT);
    ok(state.blog.search_posts(&params.q, limit).await?)
}

async fn subscribe(
    State(state): State<AppState>,
    Json(input): Json<NewsletterSignupInput>,
) -> ApiResult<NewsletterSubscriber> {
    ok(state.blog.subscribe_newsletter(input).await?)
}

async fn categories(State(state): State<AppState>) -> ApiResult<Vec<PostCategory>> {
    ok(state.blog.list_categories().await?)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/search", get(search_posts))
        .route("/posts/by-slug/{slug}", get(get_post_by_slug))
        .route("/posts/by-category/{slug}", get(posts_by_category))
        .route(
            "/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route("/blog/categories", get(categories))
        .route("/newsletter", post(subscribe))
}
