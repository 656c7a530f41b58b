//! Per-render page state.
//!
//! Each value is built fresh for a single page render and handed to the
//! renderer as a parameter. Nothing is persisted or shared between requests,
//! and nothing here is synchronized with the Identity Service.

use crate::identity::Profile;

/// The email address an OTP was sent to, awaiting its code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingVerification {
    email: Option<String>,
}

impl PendingVerification {
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Record the pending address. Blank input clears it.
    pub fn set(&mut self, email: impl Into<String>) {
        let email = email.into();
        let trimmed = email.trim();
        self.email = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

/// Snapshot of the signed-in visitor's `users` row.
///
/// Only the protected-route gate constructs one, after it has confirmed both a
/// session and a matching row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileContext {
    profile: Profile,
}

impl ProfileContext {
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.profile.email
    }

    /// The row's `name`, or the email when no name was recorded.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.profile
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.profile.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn pending_starts_empty() {
        assert_eq!(PendingVerification::default().email(), None);
    }

    #[test]
    fn pending_set_trims_and_clears() {
        let mut pending = PendingVerification::default();
        pending.set("  a@b.com ");
        assert_eq!(pending.email(), Some("a@b.com"));
        pending.set("   ");
        assert_eq!(pending.email(), None);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut profile = Profile {
            user_id: Uuid::nil(),
            email: "a@b.com".to_string(),
            name: None,
        };
        assert_eq!(ProfileContext::new(profile.clone()).display_name(), "a@b.com");

        profile.name = Some("Ada".to_string());
        let context = ProfileContext::new(profile);
        assert_eq!(context.display_name(), "Ada");
        assert_eq!(context.email(), "a@b.com");
    }
}
