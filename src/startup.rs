//! Server startup and wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use addons_core::JwtValidator;
use addons_db::{Database, create_pool, run_migrations};
use addons_totp::TotpRs;
use axum::Router;
use http::{HeaderValue, Request};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};

use crate::config::Config;
use crate::middleware::AuthLayer;
use crate::routes::rest_routes;
use crate::services::AuthenticatorWizard;

/// Provisioning wizard wired to the real TOTP backend and database.
pub type Wizard = AuthenticatorWizard<TotpRs, Database>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub wizard: Arc<Wizard>,
}

impl AppState {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            wizard: Arc::new(AuthenticatorWizard::new(TotpRs, db.clone())),
            db,
        }
    }
}

/// Build and configure the complete application.
pub async fn build_app(config: &Config) -> anyhow::Result<(Router, SocketAddr)> {
    // Database
    let pool = create_pool(&config.database()).await?;
    info!("Connected to database");
    if config.db_migrate {
        run_migrations(&pool).await?;
    }
    let state = AppState::new(Database::new(pool));

    let addr: SocketAddr = config.http_address.parse()?;

    Ok((build_router(state, config), addr))
}

/// REST routes behind the middleware stack.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        uri = %req.uri(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(TimeoutLayer::with_status_code(
            http::StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(build_cors(config.cors_origins()))
        .layer(AuthLayer::new(JwtValidator::new(&config.jwt_secret_key)));

    rest_routes(state).layer(middleware)
}

fn build_cors(origins: Option<Vec<String>>) -> CorsLayer {
    let cors = match origins {
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new().allow_origin(allowed)
        }
        None => CorsLayer::permissive(),
    };

    cors.allow_headers(Any)
        .allow_methods(Any)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use addons_core::JwtSubject;
    use axum::body::Body;
    use clap::Parser;
    use http::StatusCode;
    use http::header::{AUTHORIZATION, CONTENT_TYPE};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    const JWT_SECRET: &str = "this_is_a_very_long_secret_key_32";

    struct Subject(Uuid);

    impl JwtSubject for Subject {
        fn user_id(&self) -> Uuid {
            self.0
        }
        fn name(&self) -> &str {
            "Marc Demo"
        }
        fn role(&self) -> &str {
            "user"
        }
    }

    /// Router over a pool that never connects; requests must fail before
    /// reaching the database.
    fn app() -> Router {
        let config = Config::try_parse_from([
            "addons-service",
            "--jwt-secret-key",
            JWT_SECRET,
            "--db-url",
            "postgres://addons@127.0.0.1:1/addons",
        ])
        .unwrap();
        let pool = PgPoolOptions::new().connect_lazy(&config.db_url).unwrap();

        build_router(AppState::new(Database::new(pool)), &config)
    }

    fn token(user_id: Uuid) -> String {
        JwtValidator::new(&SecretString::from(JWT_SECRET))
            .generate_session_token(&Subject(user_id), 5)
            .unwrap()
    }

    async fn post(path: &str, token: Option<String>, body: &Value) -> (StatusCode, Value) {
        let mut req = Request::post(path).header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app()
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn confirm_body(user_id: Option<Uuid>) -> Value {
        json!({
            "name": "Phone",
            "secret_key": "JBSWY3DPEHPK3PXP",
            "user_id": user_id,
            "confirmation_code": "abcdef",
        })
    }

    #[tokio::test]
    async fn wrong_confirmation_code_is_unprocessable() {
        let user_id = Uuid::new_v4();
        let (status, body) = post(
            "/v1/authenticators/confirm",
            Some(token(user_id)),
            &confirm_body(None),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("confirmation code")
        );
    }

    #[tokio::test]
    async fn confirm_for_other_user_is_forbidden() {
        let (status, _) = post(
            "/v1/authenticators/confirm",
            Some(token(Uuid::new_v4())),
            &confirm_body(Some(Uuid::new_v4())),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn confirm_requires_session() {
        let (status, _) = post("/v1/authenticators/confirm", None, &confirm_body(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn liveness_is_public() {
        let response = app()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn cors_skips_invalid_origins() {
        let _ = build_cors(Some(vec![
            "https://erp.example".to_string(),
            "bad\norigin".to_string(),
        ]));
        let _ = build_cors(None);
    }
}
