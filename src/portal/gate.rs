//! Route-group guards.
//!
//! Flow Overview:
//! 1) Read the session tokens from the request (no network).
//! 2) Ask the Identity Service who owns them.
//! 3) Guest pages bounce signed-in visitors to the dashboard; protected pages
//!    additionally require a `users` row and receive it as [`ProfileContext`].
//!
//! Identity failures are treated as "signed out". The cause is logged and the
//! visitor only ever sees a redirect.

use crate::{
    identity::{IdentityService, Profile, Session, SharedIdentity},
    portal::{session::current_session, state::ProfileContext},
};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision<T> {
    Allow(T),
    Redirect(&'static str),
}

/// Decide whether a guest-only page (login, verify) may render.
pub async fn guest_only(
    identity: &dyn IdentityService,
    session: Option<&Session>,
) -> GateDecision<()> {
    let Some(session) = session else {
        return GateDecision::Allow(());
    };

    match identity.get_user(&session.access_token).await {
        Ok(user) => {
            debug!(user_id = %user.id, "signed-in visitor on guest page");
            GateDecision::Redirect(DASHBOARD_PATH)
        }
        Err(err) => {
            warn!(error = %err, "session cookie present but user did not resolve");
            GateDecision::Allow(())
        }
    }
}

/// Decide whether a protected page may render, yielding the visitor's profile.
pub async fn require_profile(
    identity: &dyn IdentityService,
    session: Option<&Session>,
) -> GateDecision<Profile> {
    let Some(session) = session else {
        return GateDecision::Redirect(LOGIN_PATH);
    };

    let user = match identity.get_user(&session.access_token).await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "failed to resolve user for protected page");
            return GateDecision::Redirect(LOGIN_PATH);
        }
    };

    // A user without a row is treated exactly like a signed-out visitor.
    match identity.select_profile(session, user.id).await {
        Ok(Some(profile)) => GateDecision::Allow(profile),
        Ok(None) => {
            warn!(user_id = %user.id, "authenticated user has no profile row");
            GateDecision::Redirect(LOGIN_PATH)
        }
        Err(err) => {
            warn!(user_id = %user.id, error = %err, "failed to load profile row");
            GateDecision::Redirect(LOGIN_PATH)
        }
    }
}

/// Middleware for the guest route group.
pub async fn guest_gate(
    Extension(identity): Extension<SharedIdentity>,
    request: Request,
    next: Next,
) -> Response {
    let session = current_session(request.headers());
    match guest_only(identity.as_ref(), session.as_ref()).await {
        GateDecision::Allow(()) => next.run(request).await,
        GateDecision::Redirect(path) => Redirect::temporary(path).into_response(),
    }
}

/// Middleware for the protected route group. Injects [`ProfileContext`].
pub async fn profile_gate(
    Extension(identity): Extension<SharedIdentity>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = current_session(request.headers());
    match require_profile(identity.as_ref(), session.as_ref()).await {
        GateDecision::Allow(profile) => {
            request.extensions_mut().insert(ProfileContext::new(profile));
            next.run(request).await
        }
        GateDecision::Redirect(path) => Redirect::temporary(path).into_response(),
    }
}
