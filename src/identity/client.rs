//! HTTP implementation of [`IdentityService`] for `GoTrue` + `PostgREST`.
//!
//! Flow Overview:
//! 1) Every request carries the anonymous `apikey` header.
//! 2) User-scoped calls authenticate with the caller's access token, the rest
//!    with the anonymous key.
//! 3) Non-success answers become [`IdentityError::Rejected`] with the
//!    upstream message extracted from the JSON body.

use super::{
    AuthOutcome, IdentityError, IdentityFuture, IdentityService, Profile, Session, SignedIn, User,
    USERS_TABLE,
};
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

const PREFER_IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=minimal";

#[derive(Clone)]
pub struct IdentityClient {
    http: Client,
    base_url: String,
    anon_key: SecretString,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Token endpoint payload: a flattened session plus the user.
#[derive(Deserialize, Debug, Default)]
struct TokenPayload {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    user: Option<User>,
}

impl TokenPayload {
    fn into_outcome(self) -> AuthOutcome {
        let session = match (self.access_token, self.refresh_token) {
            (Some(access_token), Some(refresh_token)) => Some(Session {
                access_token,
                refresh_token,
                token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
                expires_in: self.expires_in,
            }),
            _ => None,
        };
        AuthOutcome {
            user: self.user,
            session,
        }
    }

    fn into_signed_in(self) -> Result<SignedIn, IdentityError> {
        match self.into_outcome() {
            AuthOutcome {
                user: Some(user),
                session: Some(session),
            } => Ok(SignedIn { user, session }),
            _ => Err(IdentityError::Decode(
                "token response is missing the user or session".to_string(),
            )),
        }
    }
}

impl IdentityClient {
    /// Build a client for the Identity Service at `base_url`.
    /// # Errors
    /// Returns an error if the URL is not absolute http(s) or the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid identity service URL: {base_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported identity service URL scheme: {}", parsed.scheme());
        }

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build identity HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach `apikey` and the bearer credential.
    fn authorize(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let anon = self.anon_key.expose_secret();
        request
            .header("apikey", anon)
            .bearer_auth(bearer.unwrap_or(anon))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<TokenPayload, IdentityError> {
        let request = self
            .http
            .post(self.endpoint("/auth/v1/token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let response = self.authorize(request, None).send().await?;
        decode_json(response).await
    }

    #[instrument(skip(self, access_token))]
    async fn fetch_user(&self, access_token: &str) -> Result<User, IdentityError> {
        let request = self.http.get(self.endpoint("/auth/v1/user"));
        let response = self.authorize(request, Some(access_token)).send().await?;
        decode_json(response).await
    }

    #[instrument(skip(self, password))]
    async fn password_grant(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await?
            .into_signed_in()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SignedIn, IdentityError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?
            .into_signed_in()
    }

    #[instrument(skip(self))]
    async fn send_otp(&self, email: &str, should_create_user: bool) -> Result<Value, IdentityError> {
        let request = self
            .http
            .post(self.endpoint("/auth/v1/otp"))
            .json(&json!({ "email": email, "create_user": should_create_user }));
        let response = self.authorize(request, None).send().await?;
        // Passed through as-is; GoTrue usually answers `{}`.
        decode_value(response).await
    }

    #[instrument(skip(self, token))]
    async fn verify(&self, email: &str, token: &str) -> Result<AuthOutcome, IdentityError> {
        let request = self
            .http
            .post(self.endpoint("/auth/v1/verify"))
            .json(&json!({ "type": "email", "email": email, "token": token }));
        let response = self.authorize(request, None).send().await?;
        let payload: TokenPayload = decode_json(response).await?;
        Ok(payload.into_outcome())
    }

    async fn establish(&self, session: &Session) -> Result<SignedIn, IdentityError> {
        match self.fetch_user(&session.access_token).await {
            Ok(user) => Ok(SignedIn {
                user,
                session: session.clone(),
            }),
            Err(err) if err.is_unauthorized() => {
                debug!("access token refused, refreshing session");
                self.refresh(&session.refresh_token).await
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, session))]
    async fn profile_by_user_id(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Option<Profile>, IdentityError> {
        let request = self
            .http
            .get(self.endpoint(&format!("/rest/v1/{USERS_TABLE}")))
            .query(&[
                ("select", "user_id,email,name".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("limit", "1".to_string()),
            ]);
        let response = self
            .authorize(request, Some(&session.access_token))
            .send()
            .await?;
        let rows: Vec<Profile> = decode_json(response).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, session))]
    async fn upsert_profile(&self, session: &Session, profile: &Profile) -> Result<(), IdentityError> {
        let request = self
            .http
            .post(self.endpoint(&format!("/rest/v1/{USERS_TABLE}")))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", PREFER_IGNORE_DUPLICATES)
            .json(&[profile]);
        let response = self
            .authorize(request, Some(&session.access_token))
            .send()
            .await?;
        decode_value(response).await.map(|_| ())
    }
}

impl IdentityService for IdentityClient {
    fn get_user<'a>(&'a self, access_token: &'a str) -> IdentityFuture<'a, User> {
        Box::pin(self.fetch_user(access_token))
    }

    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, SignedIn> {
        Box::pin(self.password_grant(email, password))
    }

    fn sign_in_with_otp<'a>(
        &'a self,
        email: &'a str,
        should_create_user: bool,
    ) -> IdentityFuture<'a, Value> {
        Box::pin(self.send_otp(email, should_create_user))
    }

    fn verify_otp<'a>(&'a self, email: &'a str, token: &'a str) -> IdentityFuture<'a, AuthOutcome> {
        Box::pin(self.verify(email, token))
    }

    fn set_session<'a>(&'a self, session: &'a Session) -> IdentityFuture<'a, SignedIn> {
        Box::pin(self.establish(session))
    }

    fn select_profile<'a>(
        &'a self,
        session: &'a Session,
        user_id: Uuid,
    ) -> IdentityFuture<'a, Option<Profile>> {
        Box::pin(self.profile_by_user_id(session, user_id))
    }

    fn provision_profile<'a>(
        &'a self,
        session: &'a Session,
        profile: &'a Profile,
    ) -> IdentityFuture<'a, ()> {
        Box::pin(self.upsert_profile(session, profile))
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
    let value = decode_value(response).await?;
    serde_json::from_value(value).map_err(|err| IdentityError::Decode(err.to_string()))
}

/// Read the body as JSON, mapping non-success statuses to `Rejected`.
/// An empty body decodes to `Value::Null`.
async fn decode_value(response: Response) -> Result<Value, IdentityError> {
    let status = response.status();
    let text = response.text().await?;
    let value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if status.is_success() {
        return Ok(value);
    }

    let message = upstream_message(&value).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Identity service error")
            .to_string()
    });
    Err(IdentityError::Rejected { status, message })
}

/// Pick the human readable message out of a `GoTrue`/`PostgREST` error body.
fn upstream_message(body: &Value) -> Option<String> {
    if let Value::String(text) = body {
        let trimmed = text.trim();
        return (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_http_scheme() {
        assert!(IdentityClient::new("ftp://auth.test", SecretString::from("anon")).is_err());
        assert!(IdentityClient::new("not a url", SecretString::from("anon")).is_err());
    }

    #[test]
    fn endpoint_joins_without_double_slash() -> Result<()> {
        let client = IdentityClient::new("https://auth.test/", SecretString::from("anon"))?;
        assert_eq!(client.base_url(), "https://auth.test");
        assert_eq!(client.endpoint("/auth/v1/user"), "https://auth.test/auth/v1/user");
        assert_eq!(client.endpoint("rest/v1/users"), "https://auth.test/rest/v1/users");
        Ok(())
    }

    #[test]
    fn debug_hides_anon_key() -> Result<()> {
        let client = IdentityClient::new("https://auth.test", SecretString::from("anon-secret"))?;
        assert!(!format!("{client:?}").contains("anon-secret"));
        Ok(())
    }

    #[test]
    fn upstream_message_prefers_description() {
        let body = json!({"error": "invalid_grant", "error_description": "Invalid login credentials"});
        assert_eq!(
            upstream_message(&body).as_deref(),
            Some("Invalid login credentials")
        );
    }

    #[test]
    fn upstream_message_reads_msg_and_message() {
        assert_eq!(
            upstream_message(&json!({"code": 403, "msg": "Token has expired or is invalid"}))
                .as_deref(),
            Some("Token has expired or is invalid")
        );
        assert_eq!(
            upstream_message(&json!({"message": "duplicate key value"})).as_deref(),
            Some("duplicate key value")
        );
        assert_eq!(upstream_message(&json!({"code": 500})), None);
        assert_eq!(upstream_message(&Value::Null), None);
    }

    #[test]
    fn token_payload_without_refresh_token_has_no_session() {
        let payload = TokenPayload {
            access_token: Some("a".to_string()),
            ..TokenPayload::default()
        };
        assert_eq!(payload.into_outcome(), AuthOutcome::default());
    }

    #[test]
    fn token_payload_without_user_cannot_sign_in() {
        let payload = TokenPayload {
            access_token: Some("a".to_string()),
            refresh_token: Some("r".to_string()),
            ..TokenPayload::default()
        };
        assert!(matches!(
            payload.into_signed_in(),
            Err(IdentityError::Decode(_))
        ));
    }
}
