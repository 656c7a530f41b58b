//! # Portal
//!
//! `portal` is a thin backend-for-frontend that sits between a browser and an
//! external Identity Service (a `GoTrue` auth API plus a `PostgREST` `users`
//! table). It owns no credentials and no session store of its own: every
//! login, OTP request and OTP verification is forwarded upstream and the
//! outcome is reflected back as normalized JSON plus `HttpOnly` session
//! cookies.
//!
//! ## Route groups
//!
//! | Group | Routes | Gate |
//! |-------|--------|------|
//! | guest | `/login`, `/verify` | signed-in visitors are sent to `/dashboard` |
//! | protected | `/dashboard` | requires a session **and** a `users` row, else `/login` |
//! | api | `/api/auth/*`, `/api/protected`, `/api/upload` | JSON errors, never redirects |
//!
//! Identity failures inside the gate are logged and treated as "signed out".
//! They are never shown to the visitor.
//!
//! ## Profile provisioning
//!
//! The first successful OTP verification provisions a `users` row keyed on
//! the identity's `user_id`. Provisioning is an upsert that ignores
//! duplicates, so verifying twice never yields two rows for one identity.

pub mod cli;
pub mod identity;
pub mod portal;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
