//! REST handlers for authenticator provisioning.
//!
//! Thin handlers that extract the session and delegate to the wizard.

use addons_core::{AppResult, AuthInfo};
use addons_db::Authenticator;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Span, instrument};
use uuid::Uuid;

use super::{ActionDescriptor, ProvisioningRequest};
use crate::middleware::CurrentUser;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenWizardBody {
    pub name: String,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct WizardResponse {
    pub name: String,
    pub secret_key: String,
    pub user_id: Option<Uuid>,
    pub qr_code_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    pub name: String,
    pub secret_key: String,
    pub user_id: Option<Uuid>,
    pub confirmation_code: String,
}

/// Authenticator as listed to its owner.
#[derive(Debug, Serialize)]
pub struct AuthenticatorSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Authenticator> for AuthenticatorSummary {
    fn from(a: Authenticator) -> Self {
        Self {
            id: a.id,
            name: a.name,
            created_at: a.created_at,
        }
    }
}

/// Resolve the user a request acts on; only admins may name another user.
fn target_user(auth: &AuthInfo, requested: Option<Uuid>, action: &str) -> AppResult<Uuid> {
    let target = requested.unwrap_or(auth.user_id);
    auth.require_access(target, action)?;
    Ok(target)
}

#[instrument(skip_all, fields(user_id, target_user_id))]
pub async fn open_wizard_handler(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Json(body): Json<OpenWizardBody>,
) -> AppResult<Json<WizardResponse>> {
    Span::current().record("user_id", auth.user_id.to_string());
    let target = target_user(&auth, body.user_id, "provision authenticators")?;
    Span::current().record("target_user_id", target.to_string());

    let mut request = state.wizard.new_request(body.name, Some(&auth));
    request.user_id = Some(target);

    let qr_code_tag = state.wizard.compute_provisioning_display(&request).await?;

    Ok(Json(WizardResponse {
        name: request.name,
        secret_key: request.secret_key,
        user_id: request.user_id,
        qr_code_tag,
    }))
}

#[instrument(skip_all, fields(user_id))]
pub async fn confirm_handler(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Json(body): Json<ConfirmBody>,
) -> AppResult<Json<ActionDescriptor>> {
    Span::current().record("user_id", auth.user_id.to_string());
    let user_id = target_user(&auth, body.user_id, "provision authenticators")?;

    let action = state
        .wizard
        .confirm(&ProvisioningRequest {
            name: body.name,
            secret_key: body.secret_key,
            user_id: Some(user_id),
            confirmation_code: body.confirmation_code,
        })
        .await?;

    Ok(Json(action))
}

#[instrument(skip_all, fields(user_id))]
pub async fn list_handler(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
) -> AppResult<Json<Vec<AuthenticatorSummary>>> {
    Span::current().record("user_id", auth.user_id.to_string());
    let authenticators = state.db.authenticators.list_for_user(auth.user_id).await?;
    Ok(Json(authenticators.into_iter().map(Into::into).collect()))
}

#[instrument(skip_all, fields(user_id, authenticator_id))]
pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentUser(auth): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let span = Span::current();
    span.record("user_id", auth.user_id.to_string());
    span.record("authenticator_id", id.to_string());

    let authenticator = state.db.authenticators.get(id).await?;
    auth.require_access(authenticator.user_id, "delete authenticators")?;

    state.db.authenticators.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
