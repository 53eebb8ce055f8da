// Blog posts and comments

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::category_errors;
use crate::infrastructure::documents::Document;

pub const MAX_COMMENT_CHARS: usize = 2000;
pub const EXCERPT_CHARS: usize = 150;
pub const DEFAULT_SUBSCRIBER_SOURCE: &str = "website";

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Markdown source
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Leading slice of the content, ellipsized when truncated
    pub fn excerpt_of(content: &str) -> String {
        if content.chars().count() > EXCERPT_CHARS {
            let head: String = content.chars().take(EXCERPT_CHARS).collect();
            format!("{}...", head)
        } else {
            content.to_string()
        }
    }
}

impl Document for Post {
    const COLLECTION: &'static str = "posts";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("title is required".to_string());
        }
        if self.content.trim().is_empty() {
            errors.push("content is required".to_string());
        }
        errors.extend(category_errors(&self.categories));
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub cover_image: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub categories: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Document for Comment {
    const COLLECTION: &'static str = "comments";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let chars = self.content.chars().count();
        if self.content.trim().is_empty() {
            vec!["comment must not be empty".to_string()]
        } else if chars > MAX_COMMENT_CHARS {
            vec![format!("comment exceeds {} characters", MAX_COMMENT_CHARS)]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentInput {
    pub content: String,
}

/// Newsletter signup; the id is the normalized email so each address
/// subscribes once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterSubscriber {
    pub id: String,
    pub email: String,
    pub source: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl NewsletterSubscriber {
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

impl Document for NewsletterSubscriber {
    const COLLECTION: &'static str = "newsletter_subscribers";

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        if self.email.is_empty() {
            vec!["email is required".to_string()]
        } else if !EMAIL.is_match(&self.email) {
            vec![format!("invalid email address: {}", self.email)]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsletterSignupInput {
    pub email: String,
    pub source: Option<String>,
}
