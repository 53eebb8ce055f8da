// Core primitives - pure helpers shared by every service

pub mod geo;
pub mod slug;

// Re-export commonly used types
pub use geo::{haversine_km, GeoPoint};
pub use slug::slugify;
