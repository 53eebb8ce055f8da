// ViewerContext - who a request runs on behalf of
// Identity is established upstream; the caller's user id arrives in the X-User-Id header

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user_id: Option<String>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    fn from_headers(headers: &HeaderMap) -> AppResult<Self> {
        let user_id = match headers.get(USER_ID_HEADER) {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| AppError::BadRequest("X-User-Id must be ASCII".to_string()))?
                    .trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            None => None,
        };
        Ok(Self {
            user_id,
            request_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The viewer's user id, or `Unauthorized` for anonymous requests
    pub fn require_user(&self) -> AppResult<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }
}

/// Builds the request-scoped ViewerContext and stores it in request extensions
pub async fn viewer_context_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let viewer = ViewerContext::from_headers(request.headers())?;
    tracing::debug!(request_id = %viewer.request_id, user_id = ?viewer.user_id, "viewer context");
    request.extensions_mut().insert(Arc::new(viewer));
    Ok(next.run(request).await)
}

/// Handler-facing wrapper; derefs to ViewerContext
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Routes mounted without the middleware still get a viewer from the headers.
        match parts.extensions.get::<Arc<ViewerContext>>() {
            Some(vc) => Ok(Vc(vc.clone())),
            None => Ok(Vc(Arc::new(ViewerContext::from_headers(&parts.headers)?))),
        }
    }
}
