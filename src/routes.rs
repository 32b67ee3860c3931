//! REST routes and health check handlers.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router, extract::State};
use serde::Serialize;

use crate::config::VERSION;
use crate::services::{authenticators, filters};
use crate::startup::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    database: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl CheckResult {
    const fn healthy() -> Self {
        Self {
            status: "healthy",
            message: None,
        }
    }

    fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: "unhealthy",
            message: Some(message.into()),
        }
    }

    const fn is_healthy(&self) -> bool {
        self.message.is_none()
    }
}

/// Build REST routes with the given application state.
pub fn rest_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "addons-service" }))
        .route("/health", get(|| async { "OK" }))
        .route("/health/live", get(|| async { "OK" }))
        .route("/health/ready", get(readiness_handler))
        .merge(api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/authenticators", get(authenticators::list_handler))
        .route(
            "/v1/authenticators/wizard",
            post(authenticators::open_wizard_handler),
        )
        .route(
            "/v1/authenticators/confirm",
            post(authenticators::confirm_handler),
        )
        .route(
            "/v1/authenticators/{id}",
            delete(authenticators::delete_handler),
        )
        .route("/v1/filters/dead-mans-switch", get(filters::list_handler))
        .route(
            "/v1/filters/{id}/dead-mans-switch",
            put(filters::set_flag_handler),
        )
}

async fn readiness_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.db.health_check().await {
        CheckResult::healthy()
    } else {
        CheckResult::unhealthy("Database connection failed")
    };

    Json(HealthResponse {
        status: if database.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        },
        version: VERSION,
        checks: HealthChecks { database },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_shape() {
        let response = HealthResponse {
            status: "unhealthy",
            version: VERSION,
            checks: HealthChecks {
                database: CheckResult::unhealthy("Database connection failed"),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["checks"]["database"]["status"], "unhealthy");
        assert_eq!(
            json["checks"]["database"]["message"],
            "Database connection failed"
        );
    }

    #[test]
    fn healthy_check_omits_message() {
        let json = serde_json::to_value(CheckResult::healthy()).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "healthy" }));
    }
}
