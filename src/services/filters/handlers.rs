//! REST handlers for the dead-man's-switch flag.

use addons_core::AppResult;
use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::{Span, info, instrument};
use uuid::Uuid;

use super::FilterReport;
use crate::middleware::CurrentUser;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct SetFlagBody {
    pub enabled: bool,
}

#[instrument(skip_all, fields(user_id))]
pub async fn list_handler(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> AppResult<Json<Vec<FilterReport>>> {
    Span::current().record("user_id", auth.user_id.to_string());
    auth.require_admin()?;

    let filters = state.db.saved_filters.list_dead_mans_switch().await?;
    Ok(Json(filters.into_iter().map(FilterReport::from).collect()))
}

#[instrument(skip_all, fields(user_id, filter_id))]
pub async fn set_flag_handler(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetFlagBody>,
) -> AppResult<Json<FilterReport>> {
    let span = Span::current();
    span.record("user_id", auth.user_id.to_string());
    span.record("filter_id", id.to_string());
    auth.require_admin()?;

    let filter = state
        .db
        .saved_filters
        .set_dead_mans_switch(id, body.enabled)
        .await?;

    info!(enabled = body.enabled, "Dead-man's-switch flag updated");
    Ok(Json(filter.into()))
}
