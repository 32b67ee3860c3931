//! Middleware pipeline for REST endpoints.
//!
//! # Middleware Order
//! Middleware is applied in layers. When using `.layer()` on a router:
//! - Outermost layer is added last
//! - Request flows: outermost → innermost → handler
//! - Response flows: handler → innermost → outermost
//!
//! Order used by `startup::build_app` (top-to-bottom on request):
//! 1. TraceLayer - Request tracing with spans
//! 2. TimeoutLayer - Request timeout
//! 3. CorsLayer - CORS handling
//! 4. AuthLayer - JWT authentication (skips public routes)

pub mod auth;

pub use auth::{AuthLayer, CurrentUser};
