//! JWT authentication middleware for REST endpoints.
//!
//! Validates Bearer tokens and injects `AuthInfo` into request extensions.
//! Handlers read it back through the [`CurrentUser`] extractor.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use addons_core::{AppError, AuthInfo, JwtError, JwtValidator};
use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::response::IntoResponse;
use http::request::Parts;
use http::{HeaderValue, Request, Response};
use phf::phf_set;
use tower::{Layer, Service};
use tracing::{Span, debug};

/// Public routes that bypass authentication.
/// Uses compile-time perfect hash function for O(1) lookup with zero runtime initialization.
static PUBLIC_ROUTES: phf::Set<&'static str> = phf_set! {
    "/",
    "/health",
    "/health/live",
    "/health/ready",
};

/// Tower layer for JWT authentication.
#[derive(Clone)]
pub struct AuthLayer {
    validator: JwtValidator,
}

impl AuthLayer {
    #[must_use]
    pub const fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            validator: self.validator.clone(),
        }
    }
}

/// Authentication middleware service.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    validator: JwtValidator,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AuthMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // Allow CORS preflight
        if req.method() == http::Method::OPTIONS {
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        }

        let path = req.uri().path();

        if is_public_route(path) {
            debug!(path, "Public route - skipping auth");
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        }

        match self.authenticate(&req) {
            Ok(auth_info) => {
                Span::current().record("user_id", auth_info.user_id.to_string());
                debug!(user_id = %auth_info.user_id, role = %auth_info.role, "Authenticated");
                req.extensions_mut().insert(auth_info);
                let mut inner = self.inner.clone();
                Box::pin(async move { inner.call(req).await })
            }
            Err(err) => Box::pin(async move { Ok(unauthorized(&err)) }),
        }
    }
}

impl<S> AuthMiddleware<S> {
    const BEARER_PREFIX: &str = "Bearer ";

    fn authenticate<T>(&self, req: &Request<T>) -> Result<AuthInfo, JwtError> {
        let header = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(JwtError::MissingHeader)?;

        let token = header
            .strip_prefix(Self::BEARER_PREFIX)
            .or_else(|| header.strip_prefix("bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(JwtError::InvalidFormat)?;

        self.validator.validate(token)
    }
}

/// Check if path is public.
fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.contains(path)
}

/// 401 with a JSON body and a Bearer challenge.
fn unauthorized(err: &JwtError) -> Response<Body> {
    let mut response = AppError::Unauthenticated(err.to_string()).into_response();
    response.headers_mut().insert(
        http::header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
    );
    response
}

/// Session identity of an authenticated request.
///
/// Rejects with `AppError::Unauthenticated` when the request did not pass
/// through [`AuthLayer`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthInfo);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthInfo>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Unauthenticated("Missing session".to_string()))
    }
}
