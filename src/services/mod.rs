//! REST services.

pub mod authenticators;
pub mod filters;

pub use authenticators::AuthenticatorWizard;
