//! Identity Service contract and wire types.
//!
//! The portal never authenticates anyone itself. Password checks, OTP
//! delivery, OTP verification and token validation are all delegated to an
//! external `GoTrue`-compatible auth API, and profile rows live in a
//! `PostgREST` `users` table next to it. This module defines the narrow
//! [`IdentityService`] trait the rest of the crate is written against, so the
//! gate and handlers can be exercised against an in-memory fake.
//!
//! Session tokens are opaque here: they are checked for presence and handed
//! back upstream, never decoded.

mod client;

pub use client::IdentityClient;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, future::Future, pin::Pin, sync::Arc};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Name of the upstream profile table.
pub const USERS_TABLE: &str = "users";

/// Authoritative identity record owned by the Identity Service.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Access/refresh token pair issued by the Identity Service.
#[derive(ToSchema, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl Session {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
            expires_in: None,
        }
    }
}

// Never print token material.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// A row of the `users` table.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of a sign-in that always yields both a user and a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedIn {
    pub user: User,
    pub session: Session,
}

/// Result of an OTP verification. Upstream may verify without issuing a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The service answered with a non-success status. `message` is the
    /// upstream text, passed through untouched.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected identity service response: {0}")]
    Decode(String),
}

impl IdentityError {
    #[must_use]
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// True when upstream refused the presented token.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Rejected { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

pub type IdentityFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, IdentityError>> + Send + 'a>>;

/// Operations the portal needs from the Identity Service.
pub trait IdentityService: Send + Sync {
    /// Resolve the user owning `access_token`.
    fn get_user<'a>(&'a self, access_token: &'a str) -> IdentityFuture<'a, User>;

    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, SignedIn>;

    /// Send a one-time code to `email`. Returns the raw upstream payload.
    fn sign_in_with_otp<'a>(
        &'a self,
        email: &'a str,
        should_create_user: bool,
    ) -> IdentityFuture<'a, Value>;

    /// Verify an emailed one-time code.
    fn verify_otp<'a>(&'a self, email: &'a str, token: &'a str) -> IdentityFuture<'a, AuthOutcome>;

    /// Validate a token pair, refreshing it when the access token was refused.
    fn set_session<'a>(&'a self, session: &'a Session) -> IdentityFuture<'a, SignedIn>;

    /// Select the `users` row for `user_id`, if any.
    fn select_profile<'a>(
        &'a self,
        session: &'a Session,
        user_id: Uuid,
    ) -> IdentityFuture<'a, Option<Profile>>;

    /// Insert the `users` row for `profile.user_id` unless one already exists.
    fn provision_profile<'a>(
        &'a self,
        session: &'a Session,
        profile: &'a Profile,
    ) -> IdentityFuture<'a, ()>;
}

pub type SharedIdentity = Arc<dyn IdentityService>;
