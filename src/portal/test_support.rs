//! In-memory Identity Service for handler and gate tests.

use crate::identity::{
    AuthOutcome, IdentityError, IdentityFuture, IdentityService, Profile, Session, SignedIn, User,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    future::ready,
    sync::{Mutex, PoisonError},
};
use uuid::Uuid;

pub(crate) const INVALID_OTP: &str = "Token has expired or is invalid";
pub(crate) const INVALID_LOGIN: &str = "Invalid login credentials";

#[derive(Default)]
pub(crate) struct FakeIdentity {
    users_by_token: HashMap<String, User>,
    passwords: HashMap<(String, String), SignedIn>,
    codes: HashMap<(String, String), AuthOutcome>,
    profiles: Mutex<Vec<Profile>>,
    otp_requests: Mutex<Vec<(String, bool)>>,
    fail_profile_lookups: bool,
    fail_provisioning: bool,
    garbled: bool,
}

impl FakeIdentity {
    /// Accept `token` as an access token for `user`.
    pub(crate) fn with_token(mut self, token: &str, user: User) -> Self {
        self.users_by_token.insert(token.to_string(), user);
        self
    }

    /// Accept `email`/`password`, issuing `session`. Also registers the token.
    pub(crate) fn with_password(
        mut self,
        email: &str,
        password: &str,
        user: User,
        session: Session,
    ) -> Self {
        self.users_by_token
            .insert(session.access_token.clone(), user.clone());
        self.passwords.insert(
            (email.to_string(), password.to_string()),
            SignedIn { user, session },
        );
        self
    }

    /// Accept `code` for `email`. Codes stay valid after use.
    pub(crate) fn with_code(
        mut self,
        email: &str,
        code: &str,
        user: User,
        session: Option<Session>,
    ) -> Self {
        if let Some(session) = &session {
            self.users_by_token
                .insert(session.access_token.clone(), user.clone());
        }
        self.codes.insert(
            (email.to_string(), code.to_string()),
            AuthOutcome {
                user: Some(user),
                session,
            },
        );
        self
    }

    pub(crate) fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(profile);
        self
    }

    pub(crate) fn failing_profile_lookups(mut self) -> Self {
        self.fail_profile_lookups = true;
        self
    }

    pub(crate) fn failing_provisioning(mut self) -> Self {
        self.fail_provisioning = true;
        self
    }

    /// Auth actions fail as if the service answered with something unreadable.
    pub(crate) fn garbled(mut self) -> Self {
        self.garbled = true;
        self
    }

    fn garbled_error(&self) -> Option<IdentityError> {
        self.garbled.then(|| {
            IdentityError::Decode(
                "expected value at line 1 column 1 from http://10.0.0.5:9999".to_string(),
            )
        })
    }

    pub(crate) fn profile_rows(&self, user_id: Uuid) -> Vec<Profile> {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|profile| profile.user_id == user_id)
            .cloned()
            .collect()
    }

    pub(crate) fn otp_requests(&self) -> Vec<(String, bool)> {
        self.otp_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn resolve(&self, access_token: &str) -> Result<User, IdentityError> {
        self.users_by_token
            .get(access_token)
            .cloned()
            .ok_or_else(|| IdentityError::rejected(StatusCode::UNAUTHORIZED, "invalid JWT"))
    }
}

impl IdentityService for FakeIdentity {
    fn get_user<'a>(&'a self, access_token: &'a str) -> IdentityFuture<'a, User> {
        Box::pin(ready(self.resolve(access_token)))
    }

    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, SignedIn> {
        if let Some(err) = self.garbled_error() {
            return Box::pin(ready(Err(err)));
        }
        let result = self
            .passwords
            .get(&(email.to_string(), password.to_string()))
            .cloned()
            .ok_or_else(|| IdentityError::rejected(StatusCode::BAD_REQUEST, INVALID_LOGIN));
        Box::pin(ready(result))
    }

    fn sign_in_with_otp<'a>(
        &'a self,
        email: &'a str,
        should_create_user: bool,
    ) -> IdentityFuture<'a, Value> {
        if let Some(err) = self.garbled_error() {
            return Box::pin(ready(Err(err)));
        }
        self.otp_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((email.to_string(), should_create_user));
        Box::pin(ready(Ok(json!({}))))
    }

    fn verify_otp<'a>(&'a self, email: &'a str, token: &'a str) -> IdentityFuture<'a, AuthOutcome> {
        if let Some(err) = self.garbled_error() {
            return Box::pin(ready(Err(err)));
        }
        let result = self
            .codes
            .get(&(email.to_string(), token.to_string()))
            .cloned()
            .ok_or_else(|| IdentityError::rejected(StatusCode::FORBIDDEN, INVALID_OTP));
        Box::pin(ready(result))
    }

    fn set_session<'a>(&'a self, session: &'a Session) -> IdentityFuture<'a, SignedIn> {
        let result = self.resolve(&session.access_token).map(|user| SignedIn {
            user,
            session: session.clone(),
        });
        Box::pin(ready(result))
    }

    fn select_profile<'a>(
        &'a self,
        _session: &'a Session,
        user_id: Uuid,
    ) -> IdentityFuture<'a, Option<Profile>> {
        let result = if self.fail_profile_lookups {
            Err(IdentityError::rejected(
                StatusCode::SERVICE_UNAVAILABLE,
                "profile table unavailable",
            ))
        } else {
            Ok(self.profile_rows(user_id).into_iter().next())
        };
        Box::pin(ready(result))
    }

    fn provision_profile<'a>(
        &'a self,
        _session: &'a Session,
        profile: &'a Profile,
    ) -> IdentityFuture<'a, ()> {
        if self.fail_provisioning {
            return Box::pin(ready(Err(IdentityError::rejected(
                StatusCode::SERVICE_UNAVAILABLE,
                "profile table unavailable",
            ))));
        }
        let mut rows = self.profiles.lock().unwrap_or_else(PoisonError::into_inner);
        if !rows.iter().any(|row| row.user_id == profile.user_id) {
            rows.push(profile.clone());
        }
        Box::pin(ready(Ok(())))
    }
}
