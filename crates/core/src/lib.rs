//! Core library with shared types, traits, and error handling.
//!
//! This crate provides reusable components for the add-ons service:
//! - Error type with automatic HTTP response conversion
//! - Extension traits for string fields
//! - Domain-level validation helpers
//! - JWT session identity (with `jwt` feature)

pub mod error;
#[cfg(feature = "jwt")]
pub mod jwt;
pub mod str_ext;
pub mod validation;

pub use error::{AppError, AppResult};
#[cfg(feature = "jwt")]
pub use jwt::{AuthInfo, JwtError, JwtSubject, JwtValidator, UserRole};
pub use str_ext::{OptionStrExt, StrExt};
