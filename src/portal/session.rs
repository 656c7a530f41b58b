//! Session token transport between the browser and the portal.
//!
//! Tokens issued by the Identity Service are stored in two `HttpOnly` cookies.
//! API callers may instead present the access token as a bearer credential.
//! Nothing here validates a token; that is the Identity Service's job.

use crate::identity::Session;
use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

pub const ACCESS_COOKIE: &str = "portal-access-token";
pub const REFRESH_COOKIE: &str = "portal-refresh-token";

/// Access cookie lifetime when upstream does not report `expires_in`.
const DEFAULT_ACCESS_TTL_SECONDS: u64 = 60 * 60;
/// Refresh cookie lifetime (7 days).
const REFRESH_TTL_SECONDS: u64 = 60 * 60 * 24 * 7;

#[derive(Clone, Copy, Debug, Default)]
pub struct CookieConfig {
    secure: bool,
}

impl CookieConfig {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }
}

/// Read the caller's session from the bearer header or the session cookies.
///
/// Returns `None` when no access token is present. A bearer-only caller gets an
/// empty refresh token.
#[must_use]
pub fn current_session(headers: &HeaderMap) -> Option<Session> {
    let access_token = bearer_token(headers).or_else(|| cookie_value(headers, ACCESS_COOKIE))?;
    let refresh_token = cookie_value(headers, REFRESH_COOKIE).unwrap_or_default();
    Some(Session::new(access_token, refresh_token))
}

/// Append `Set-Cookie` headers carrying `session`.
/// # Errors
/// Returns an error if a token contains bytes that are invalid in a header.
pub fn set_session_cookies(
    headers: &mut HeaderMap,
    config: &CookieConfig,
    session: &Session,
) -> Result<(), InvalidHeaderValue> {
    let access_ttl = session.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECONDS);
    headers.append(
        SET_COOKIE,
        cookie(config, ACCESS_COOKIE, &session.access_token, access_ttl)?,
    );
    if !session.refresh_token.is_empty() {
        headers.append(
            SET_COOKIE,
            cookie(config, REFRESH_COOKIE, &session.refresh_token, REFRESH_TTL_SECONDS)?,
        );
    }
    Ok(())
}

fn cookie(
    config: &CookieConfig,
    name: &str,
    value: &str,
    max_age: u64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            let val = val.trim();
            (key.trim() == name && !val.is_empty()).then(|| val.to_string())
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn no_credentials_means_no_session() {
        assert!(current_session(&HeaderMap::new()).is_none());
        assert!(current_session(&headers_with(COOKIE, "theme=dark")).is_none());
        assert!(current_session(&headers_with(AUTHORIZATION, "Bearer   ")).is_none());
    }

    #[test]
    fn reads_both_cookies() {
        let headers = headers_with(
            COOKIE,
            "theme=dark; portal-access-token=acc.jwt.sig; portal-refresh-token=ref123",
        );
        let session = current_session(&headers);
        assert_eq!(session, Some(Session::new("acc.jwt.sig", "ref123")));
    }

    #[test]
    fn empty_access_cookie_is_ignored() {
        let headers = headers_with(COOKIE, "portal-access-token=; portal-refresh-token=r");
        assert!(current_session(&headers).is_none());
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = headers_with(COOKIE, "portal-access-token=from-cookie");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let session = current_session(&headers);
        assert_eq!(
            session.map(|s| s.access_token),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn set_session_cookies_appends_both() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        let mut session = Session::new("acc", "ref");
        session.expires_in = Some(120);
        set_session_cookies(&mut headers, &CookieConfig::new(false), &session)?;

        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(
            cookies,
            vec![
                "portal-access-token=acc; Path=/; HttpOnly; SameSite=Lax; Max-Age=120",
                "portal-refresh-token=ref; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800",
            ]
        );
        Ok(())
    }

    #[test]
    fn secure_flag_is_appended() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        set_session_cookies(
            &mut headers,
            &CookieConfig::new(true),
            &Session::new("acc", ""),
        )?;
        let cookies: Vec<_> = headers.get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].to_str()?.ends_with("; Secure"));
        Ok(())
    }
}
