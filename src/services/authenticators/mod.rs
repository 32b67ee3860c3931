//! TOTP authenticator provisioning.
//!
//! Organized by concern:
//! - `mod.rs`: Capability traits, `ProvisioningRequest`, `AuthenticatorWizard`
//! - `handlers.rs`: Thin REST handlers
//!
//! An authenticator is only ever persisted by [`AuthenticatorWizard::confirm`],
//! after the submitted code has been verified against the request's own secret.

mod handlers;

use std::future::Future;

use addons_core::validation::{require, validate_name};
use addons_core::{AppError, AppResult, AuthInfo};
use addons_db::{Authenticator, CreateAuthenticatorParams, Database, UserIdentity};
use addons_totp::{SecretGenerator, TotpProvider};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub use handlers::{
    AuthenticatorSummary, ConfirmBody, OpenWizardBody, WizardResponse, confirm_handler,
    delete_handler, list_handler, open_wizard_handler,
};

/// Message of the validation error raised for a rejected code.
pub const INVALID_CODE_MESSAGE: &str =
    "The confirmation code is not valid. Check the code shown by your authenticator app and try again.";

/// QR code image size in pixels.
const QR_CODE_SIZE: u32 = 300;

// ============================================================================
// Capabilities
// ============================================================================

/// Persistence for confirmed authenticators.
pub trait AuthenticatorStore: Send + Sync {
    fn create_authenticator(
        &self,
        params: CreateAuthenticatorParams<'_>,
    ) -> impl Future<Output = AppResult<Authenticator>> + Send;
}

/// Read access to host users.
pub trait UserDirectory: Send + Sync {
    fn find_identity(&self, user_id: Uuid) -> impl Future<Output = AppResult<UserIdentity>> + Send;
}

impl AuthenticatorStore for Database {
    async fn create_authenticator(
        &self,
        params: CreateAuthenticatorParams<'_>,
    ) -> AppResult<Authenticator> {
        self.authenticators.create(params).await
    }
}

impl UserDirectory for Database {
    async fn find_identity(&self, user_id: Uuid) -> AppResult<UserIdentity> {
        self.users.find_identity(user_id).await
    }
}

// ============================================================================
// Provisioning request and result
// ============================================================================

/// Transient provisioning form. The confirmation code is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub name: String,
    pub secret_key: String,
    pub user_id: Option<Uuid>,
    pub confirmation_code: String,
}

/// Action the client navigates to after a successful confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub xml_id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub action_type: &'static str,
    pub res_model: &'static str,
    pub view_mode: &'static str,
    pub target: &'static str,
    pub res_id: Uuid,
}

impl ActionDescriptor {
    /// The host's "my preferences" form, opened on `user_id`.
    #[must_use]
    pub const fn my_preferences(user_id: Uuid) -> Self {
        Self {
            xml_id: "base.action_res_users_my",
            name: "Change My Preferences",
            action_type: "ir.actions.act_window",
            res_model: "res.users",
            view_mode: "form",
            target: "inline",
            res_id: user_id,
        }
    }
}

// ============================================================================
// AuthenticatorWizard
// ============================================================================

/// Interactive provisioning flow over injected TOTP and persistence capabilities.
pub struct AuthenticatorWizard<T, S> {
    totp: T,
    store: S,
}

impl<T, S> AuthenticatorWizard<T, S>
where
    T: SecretGenerator + TotpProvider,
    S: AuthenticatorStore + UserDirectory,
{
    #[must_use]
    pub const fn new(totp: T, store: S) -> Self {
        Self { totp, store }
    }

    /// Fresh random shared secret.
    pub fn default_secret(&self) -> String {
        self.totp.generate_secret()
    }

    /// The acting session's user, if any.
    #[must_use]
    pub fn default_user(&self, session: Option<&AuthInfo>) -> Option<Uuid> {
        session.map(|auth| auth.user_id)
    }

    /// New request populated with the default secret and user.
    pub fn new_request(&self, name: impl Into<String>, session: Option<&AuthInfo>) -> ProvisioningRequest {
        ProvisioningRequest {
            name: name.into(),
            secret_key: self.default_secret(),
            user_id: self.default_user(session),
            confirmation_code: String::new(),
        }
    }

    /// `<img>` tag rendering the provisioning URI as a QR code.
    ///
    /// Returns `None` without touching the TOTP backend when no user is set.
    #[instrument(skip_all, fields(user_id = ?request.user_id))]
    pub async fn compute_provisioning_display(
        &self,
        request: &ProvisioningRequest,
    ) -> AppResult<Option<String>> {
        let Some(user_id) = request.user_id else {
            debug!("No user on provisioning request, skipping QR code");
            return Ok(None);
        };

        let identity = self.store.find_identity(user_id).await?;
        let uri = self.totp.provisioning_uri(
            &request.secret_key,
            &identity.display_name,
            &identity.company_display_name,
        )?;

        Ok(Some(qr_code_tag(&uri)))
    }

    /// Verify the confirmation code against the request's secret.
    ///
    /// # Errors
    /// `AppError::Validation` when the code is rejected.
    pub fn validate(&self, request: &ProvisioningRequest) -> AppResult<()> {
        if self
            .totp
            .verify(&request.secret_key, &request.confirmation_code)?
        {
            Ok(())
        } else {
            Err(AppError::validation(INVALID_CODE_MESSAGE))
        }
    }

    /// Persist the authenticator described by `request`.
    pub async fn create_authenticator(
        &self,
        request: &ProvisioningRequest,
    ) -> AppResult<Authenticator> {
        let user_id = require("user_id", request.user_id)?;
        validate_name("name", &request.name)?;

        self.store
            .create_authenticator(CreateAuthenticatorParams {
                name: &request.name,
                secret_key: &request.secret_key,
                user_id,
            })
            .await
    }

    /// Validate, then persist. Nothing is stored when validation fails.
    #[instrument(skip_all, fields(user_id = ?request.user_id))]
    pub async fn confirm(&self, request: &ProvisioningRequest) -> AppResult<ActionDescriptor> {
        self.validate(request)?;
        let authenticator = self.create_authenticator(request).await?;

        info!(authenticator_id = %authenticator.id, "Authenticator provisioned");
        Ok(ActionDescriptor::my_preferences(authenticator.user_id))
    }
}

fn qr_code_tag(uri: &str) -> String {
    format!(
        r#"<img src="/report/barcode/?type=QR&amp;value={}&amp;width={QR_CODE_SIZE}&amp;height={QR_CODE_SIZE}">"#,
        urlencoding::encode(uri)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use addons_core::UserRole;
    use addons_totp::TotpError;
    use chrono::Utc;

    use super::*;

    /// TOTP double recording every call.
    struct RecordingTotp {
        secret: String,
        uri: String,
        accept: bool,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingTotp {
        fn new(accept: bool) -> Self {
            Self {
                secret: "JBSWY3DPEHPK3PXP".to_string(),
                uri: "test:uri".to_string(),
                accept,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SecretGenerator for RecordingTotp {
        fn generate_secret(&self) -> String {
            self.calls.lock().unwrap().push("generate_secret".to_string());
            self.secret.clone()
        }
    }

    impl TotpProvider for RecordingTotp {
        fn provisioning_uri(
            &self,
            secret: &str,
            account_name: &str,
            issuer: &str,
        ) -> Result<String, TotpError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("provisioning_uri({secret}, {account_name}, {issuer})"));
            Ok(self.uri.clone())
        }

        fn verify(&self, secret: &str, code: &str) -> Result<bool, TotpError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("verify({secret}, {code})"));
            Ok(self.accept)
        }
    }

    /// In-memory persistence double.
    #[derive(Default)]
    struct MemoryStore {
        authenticators: Mutex<Vec<Authenticator>>,
        lookups: Mutex<Vec<Uuid>>,
    }

    impl AuthenticatorStore for MemoryStore {
        async fn create_authenticator(
            &self,
            params: CreateAuthenticatorParams<'_>,
        ) -> AppResult<Authenticator> {
            let authenticator = Authenticator {
                id: Uuid::new_v4(),
                name: params.name.to_string(),
                secret_key: params.secret_key.to_string(),
                user_id: params.user_id,
                created_at: Utc::now(),
            };
            self.authenticators
                .lock()
                .unwrap()
                .push(authenticator.clone());
            Ok(authenticator)
        }
    }

    impl UserDirectory for MemoryStore {
        async fn find_identity(&self, user_id: Uuid) -> AppResult<UserIdentity> {
            self.lookups.lock().unwrap().push(user_id);
            Ok(UserIdentity {
                id: user_id,
                display_name: "Mitchell Admin".to_string(),
                company_display_name: "YourCompany".to_string(),
            })
        }
    }

    fn session(user_id: Uuid) -> AuthInfo {
        AuthInfo {
            user_id,
            name: "Mitchell Admin".to_string(),
            role: UserRole::User,
        }
    }

    fn request(user_id: Option<Uuid>) -> ProvisioningRequest {
        ProvisioningRequest {
            name: "Test Authenticator".to_string(),
            secret_key: "JBSWY3DPEHPK3PXP".to_string(),
            user_id,
            confirmation_code: "Test".to_string(),
        }
    }

    fn wizard(accept: bool) -> AuthenticatorWizard<RecordingTotp, MemoryStore> {
        AuthenticatorWizard::new(RecordingTotp::new(accept), MemoryStore::default())
    }

    #[test]
    fn secret_key_defaults_to_generated_secret() {
        let wizard = wizard(true);
        assert_eq!(wizard.default_secret(), "JBSWY3DPEHPK3PXP");
        assert_eq!(wizard.totp.calls(), vec!["generate_secret"]);
    }

    #[test]
    fn default_user_without_session_is_none() {
        assert_eq!(wizard(true).default_user(None), None);
    }

    #[test]
    fn default_user_with_session() {
        let user_id = Uuid::new_v4();
        assert_eq!(
            wizard(true).default_user(Some(&session(user_id))),
            Some(user_id)
        );
    }

    #[test]
    fn new_request_uses_defaults() {
        let user_id = Uuid::new_v4();
        let request = wizard(true).new_request("Phone", Some(&session(user_id)));

        assert_eq!(request.name, "Phone");
        assert_eq!(request.secret_key, "JBSWY3DPEHPK3PXP");
        assert_eq!(request.user_id, Some(user_id));
        assert!(request.confirmation_code.is_empty());
    }

    #[tokio::test]
    async fn qr_code_skipped_without_user() {
        let wizard = wizard(true);
        let tag = wizard
            .compute_provisioning_display(&request(None))
            .await
            .unwrap();

        assert_eq!(tag, None);
        assert!(wizard.totp.calls().is_empty());
        assert!(wizard.store.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn qr_code_tag_encodes_uri() {
        let tag = wizard(true)
            .compute_provisioning_display(&request(Some(Uuid::new_v4())))
            .await
            .unwrap();

        assert_eq!(
            tag.as_deref(),
            Some(
                r#"<img src="/report/barcode/?type=QR&amp;value=test%3Auri&amp;width=300&amp;height=300">"#
            )
        );
    }

    #[tokio::test]
    async fn qr_code_uses_user_and_company_names() {
        let wizard = wizard(true);
        wizard
            .compute_provisioning_display(&request(Some(Uuid::new_v4())))
            .await
            .unwrap();

        assert_eq!(
            wizard.totp.calls(),
            vec!["provisioning_uri(JBSWY3DPEHPK3PXP, Mitchell Admin, YourCompany)"]
        );
    }

    #[test]
    fn wrong_confirmation_code_is_rejected() {
        let err = wizard(false)
            .validate(&request(Some(Uuid::new_v4())))
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("confirmation code"));
    }

    #[test]
    fn right_confirmation_code_passes() {
        assert!(wizard(true).validate(&request(Some(Uuid::new_v4()))).is_ok());
    }

    #[test]
    fn validate_calls_verifier_once_with_code() {
        let wizard = wizard(true);
        wizard.validate(&request(Some(Uuid::new_v4()))).unwrap();

        assert_eq!(wizard.totp.calls(), vec!["verify(JBSWY3DPEHPK3PXP, Test)"]);
    }

    #[tokio::test]
    async fn create_authenticator_copies_request() {
        let wizard = wizard(true);
        let user_id = Uuid::new_v4();
        let req = request(Some(user_id));
        wizard.create_authenticator(&req).await.unwrap();

        let stored = wizard.store.authenticators.lock().unwrap().clone();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            (
                stored[0].name.as_str(),
                stored[0].secret_key.as_str(),
                stored[0].user_id
            ),
            (req.name.as_str(), req.secret_key.as_str(), user_id)
        );
    }

    #[tokio::test]
    async fn create_authenticator_requires_user() {
        let wizard = wizard(true);
        let err = wizard.create_authenticator(&request(None)).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(wizard.store.authenticators.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_authenticator_requires_name() {
        let wizard = wizard(true);
        let mut req = request(Some(Uuid::new_v4()));
        req.name = "  ".to_string();

        let err = wizard.create_authenticator(&req).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(msg) if msg.contains("name")));
    }

    #[tokio::test]
    async fn confirm_returns_preferences_action() {
        let wizard = wizard(true);
        let user_id = Uuid::new_v4();
        let action = wizard.confirm(&request(Some(user_id))).await.unwrap();

        assert_eq!(action, ActionDescriptor::my_preferences(user_id));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            serde_json::json!({
                "xml_id": "base.action_res_users_my",
                "name": "Change My Preferences",
                "type": "ir.actions.act_window",
                "res_model": "res.users",
                "view_mode": "form",
                "target": "inline",
                "res_id": user_id,
            })
        );
        assert_eq!(wizard.store.authenticators.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn confirm_persists_nothing_on_wrong_code() {
        let wizard = wizard(false);
        let err = wizard
            .confirm(&request(Some(Uuid::new_v4())))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("confirmation code"));
        assert!(wizard.store.authenticators.lock().unwrap().is_empty());
        assert_eq!(wizard.totp.calls().len(), 1);
    }
}
