// Services - one method per use case over the document and blob stores

pub mod analytics_service;
pub mod blog_service;
pub mod counters;
pub mod event_service;
pub mod feed_service;
pub mod nearby;
pub mod user_service;
pub mod venue_service;

pub use analytics_service::AnalyticsService;
pub use blog_service::BlogService;
pub use counters::Counters;
pub use event_service::EventService;
pub use feed_service::FeedService;
pub use user_service::UserService;
pub use venue_service::VenueService;

use chrono::Utc;
use rand::Rng;

use crate::error::{AppError, AppResult};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Log and drop the error of a secondary write
pub(crate) fn best_effort<T>(result: AppResult<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Best-effort {} failed: {}", what, e);
            None
        }
    }
}

/// Case-insensitive substring match; `needle` must already be lowercase
pub(crate) fn contains_lower(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Blob path `{kind}/{id}/{millis}_{random6}.{ext}` for an uploaded image.
/// Only common web image extensions are accepted.
pub(crate) fn image_blob_path(kind: &str, id: &str, file_name: &str) -> AppResult<String> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Unsupported image type: {} (expected one of {})",
                file_name,
                IMAGE_EXTENSIONS.join(", ")
            ))
        })?;

    let random: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    Ok(format!(
        "{}/{}/{}_{}.{}",
        kind,
        id,
        Utc::now().timestamp_millis(),
        random,
        extension
    ))
}
