// Blog Service - posts, comments and the derived category index

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::slugify;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{DocumentQuery, SortDirection};
use crate::infrastructure::documents::Documents;
use crate::models::blog::DEFAULT_SUBSCRIBER_SOURCE;
use crate::models::{
    Comment, CreateCommentInput, CreatePostInput, NewsletterSignupInput, NewsletterSubscriber,
    Post, UpdatePostInput, User,
};
use crate::services::contains_lower;

pub const DEFAULT_POST_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostCategory {
    pub name: String,
    pub slug: String,
    pub count: u64,
}

/// Count category occurrences; most used first, ties by name
fn tally_categories<'a>(categories: impl IntoIterator<Item = &'a String>) -> Vec<PostCategory> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for category in categories {
        *counts.entry(category.as_str()).or_default() += 1;
    }
    let mut tally: Vec<PostCategory> = counts
        .into_iter()
        .map(|(name, count)| PostCategory {
            name: name.to_string(),
            slug: slugify(name),
            count,
        })
        .collect();
    tally.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    tally
}

#[derive(Clone)]
pub struct BlogService {
    docs: Documents,
}

impl BlogService {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    async fn display_name(&self, user_id: &str) -> AppResult<String> {
        Ok(self
            .docs
            .get::<User>(user_id)
            .await?
            .map(|u| u.display_name)
            .unwrap_or_default())
    }

    fn require_author(post: &Post, viewer_id: &str) -> AppResult<()> {
        if post.author_id == viewer_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the author can modify this post".to_string(),
            ))
        }
    }

    fn published() -> DocumentQuery {
        DocumentQuery::of::<Post>()
            .where_eq("published", true)
            .order_by("created_at", SortDirection::Desc)
    }

    pub async fn create_post(&self, author_id: &str, input: CreatePostInput) -> AppResult<Post> {
        let now = Utc::now();
        let excerpt = input
            .excerpt
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| Post::excerpt_of(&input.content));
        let post = Post {
            id: Uuid::new_v4().to_string(),
            slug: slugify(&input.title),
            title: input.title.trim().to_string(),
            content: input.content,
            excerpt,
            author_id: author_id.to_string(),
            author_name: self.display_name(author_id).await?,
            categories: input.categories,
            cover_image: input.cover_image,
            published: input.published,
            created_at: now,
            updated_at: now,
        };
        self.docs.create(&post).await?;
        info!(post_id = %post.id, author_id, "post created");
        Ok(post)
    }

    pub async fn get_post(&self, id: &str) -> AppResult<Post> {
        self.docs.require::<Post>(id).await
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> AppResult<Post> {
        self.docs
            .first::<Post>(DocumentQuery::of::<Post>().where_eq("slug", slug))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post with slug {} not found", slug)))
    }

    pub async fn list_recent_posts(&self, limit: u32) -> AppResult<Vec<Post>> {
        self.docs.query(Self::published().limit(limit)).await
    }

    /// Published posts with a category whose slug is `category_slug`
    pub async fn get_posts_by_category(&self, category_slug: &str) -> AppResult<Vec<Post>> {
        let posts = self.docs.query::<Post>(Self::published()).await?;
        debug!(category_slug, scanned = posts.len(), "category post scan");
        Ok(posts
            .into_iter()
            .filter(|p| p.categories.iter().any(|c| slugify(c) == category_slug))
            .collect())
    }

    pub async fn update_post(
        &self,
        viewer_id: &str,
        id: &str,
        patch: UpdatePostInput,
    ) -> AppResult<Post> {
        let post = self.docs.require::<Post>(id).await?;
        Self::require_author(&post, viewer_id)?;

        let post = self
            .docs
            .update_with::<Post, _>(id, |post| {
                if let Some(title) = &patch.title {
                    post.title = title.trim().to_string();
                    post.slug = slugify(title);
                }
                if let Some(content) = &patch.content {
                    post.content = content.clone();
                    if patch.excerpt.is_none() {
                        post.excerpt = Post::excerpt_of(content);
                    }
                }
                if let Some(excerpt) = &patch.excerpt {
                    post.excerpt = excerpt.clone();
                }
                if let Some(categories) = &patch.categories {
                    post.categories = categories.clone();
                }
                if let Some(cover_image) = &patch.cover_image {
                    post.cover_image = Some(cover_image.clone()).filter(|c| !c.is_empty());
                }
                if let Some(published) = patch.published {
                    post.published = published;
                }
                post.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        info!(post_id = id, "post updated");
        Ok(post)
    }

    pub async fn delete_post(&self, viewer_id: &str, id: &str) -> AppResult<()> {
        let post = self.docs.require::<Post>(id).await?;
        Self::require_author(&post, viewer_id)?;

        let removed = self
            .docs
            .delete_where(&DocumentQuery::of::<Comment>().where_eq("post_id", id))
            .await?;
        self.docs.delete::<Post>(id).await?;
        info!(post_id = id, comments = removed, "post deleted");
        Ok(())
    }

    /// Oldest first
    pub async fn list_comments(&self, post_id: &str) -> AppResult<Vec<Comment>> {
        self.docs
            .query(
                DocumentQuery::of::<Comment>()
                    .where_eq("post_id", post_id)
                    .order_by("created_at", SortDirection::Asc),
            )
            .await
    }

    pub async fn add_comment(
        &self,
        post_id: &str,
        author_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<Comment> {
        self.docs.require::<Post>(post_id).await?;
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            author_name: self.display_name(author_id).await?,
            content: input.content.trim().to_string(),
            created_at: Utc::now(),
        };
        self.docs.create(&comment).await?;
        info!(comment_id = %comment.id, post_id, "comment added");
        Ok(comment)
    }

    /// Published posts whose title, content or excerpt contains `query`,
    /// newest first. A blank query matches nothing.
    pub async fn search_posts(&self, query: &str, limit: u32) -> AppResult<Vec<Post>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let posts = self.docs.query::<Post>(Self::published()).await?;
        debug!(query = %needle, scanned = posts.len(), "post search scan");
        Ok(posts
            .into_iter()
            .filter(|post| {
                contains_lower(&post.title, &needle)
                    || contains_lower(&post.content, &needle)
                    || contains_lower(&post.excerpt, &needle)
            })
            .take(limit as usize)
            .collect())
    }

    pub async fn subscribe_newsletter(
        &self,
        input: NewsletterSignupInput,
    ) -> AppResult<NewsletterSubscriber> {
        let email = NewsletterSubscriber::normalize_email(&input.email);
        let subscriber = NewsletterSubscriber {
            id: email.clone(),
            email,
            source: input
                .source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUBSCRIBER_SOURCE.to_string()),
            created_at: Utc::now(),
        };
        match self.docs.create(&subscriber).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                return Err(AppError::Conflict(format!(
                    "{} is already subscribed",
                    subscriber.email
                )))
            }
            Err(e) => return Err(e),
        }
        info!(source = %subscriber.source, "newsletter subscriber added");
        Ok(subscriber)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<PostCategory>> {
        let posts = self.docs.query::<Post>(Self::published()).await?;
        Ok(tally_categories(posts.iter().flat_map(|p| p.categories.iter())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_orders_by_count_then_name() {
        let categories: Vec<String> = ["Travel", "Food", "Travel", "Art", "Food", "Tech Talk"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tally = tally_categories(categories.iter());
        let names: Vec<&str> = tally.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Food", "Travel", "Art", "Tech Talk"]);
        assert_eq!(tally[0].count, 2);
        assert_eq!(tally[3].slug, "tech-talk");
    }
}
