// Happen - event and venue discovery service

// HTTP API - axum routes and handlers
pub mod api;

// Shared application state and configuration
pub mod app_state;
pub mod config;

// Core primitives
pub mod core;

// Infrastructure - document store, cache, blobs, viewer context
pub mod infrastructure;

// Persisted documents and request payloads
pub mod models;

// Use-case services
pub mod services;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
