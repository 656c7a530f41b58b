//! HTML shells for the gated pages.
//!
//! The pages are deliberately plain: forms post to the JSON API and the
//! browser script only shuffles between pages. Renderers are pure functions
//! of their state parameters.

use crate::portal::state::{PendingVerification, ProfileContext};
use axum::{
    extract::{Extension, Query},
    response::Html,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    pub email: Option<String>,
}

pub async fn login_page() -> Html<String> {
    Html(render_login())
}

pub async fn verify_page(Query(query): Query<VerifyQuery>) -> Html<String> {
    let mut pending = PendingVerification::default();
    if let Some(email) = query.email {
        pending.set(email);
    }
    Html(render_verify(&pending))
}

pub async fn dashboard_page(Extension(context): Extension<ProfileContext>) -> Html<String> {
    Html(render_dashboard(&context))
}

#[must_use]
pub fn render_login() -> String {
    shell(
        "Sign in",
        r#"<h1>Sign in</h1>
<form id="login" method="post" action="/api/auth/login">
  <input type="email" name="email" placeholder="Email" required>
  <input type="password" name="password" placeholder="Password" required>
  <button type="submit">Sign in</button>
</form>
<h2>Or get a code by email</h2>
<form id="otp" method="post" action="/api/auth">
  <input type="email" name="email" placeholder="Email" required>
  <button type="submit">Send code</button>
</form>
<p id="message" role="status"></p>
<script>
async function post(url, body) {
  const res = await fetch(url, {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
  return [res.ok, await res.json()];
}
document.getElementById("login").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const [ok, data] = await post("/api/auth/login", Object.fromEntries(form));
  if (ok) { location.href = "/dashboard"; }
  else { document.getElementById("message").textContent = data.error; }
});
document.getElementById("otp").addEventListener("submit", async (event) => {
  event.preventDefault();
  const email = new FormData(event.target).get("email");
  const [ok, data] = await post("/api/auth", { email });
  if (ok) { location.href = "/verify?email=" + encodeURIComponent(email); }
  else { document.getElementById("message").textContent = data.error; }
});
</script>"#,
    )
}

#[must_use]
pub fn render_verify(pending: &PendingVerification) -> String {
    let email = pending.email().map(escape_html).unwrap_or_default();
    let notice = if email.is_empty() {
        "<p>Enter the email address and the code you received.</p>".to_string()
    } else {
        format!("<p>We sent a code to <strong>{email}</strong>.</p>")
    };
    let body = format!(
        r#"<h1>Check your email</h1>
{notice}
<form id="verify" method="post" action="/api/auth/verify">
  <input type="email" name="email" placeholder="Email" value="{email}" required>
  <input type="text" name="token" placeholder="Code" inputmode="numeric" autocomplete="one-time-code" required>
  <button type="submit">Verify</button>
</form>
<p id="message" role="status"></p>
<script>
document.getElementById("verify").addEventListener("submit", async (event) => {{
  event.preventDefault();
  const form = new FormData(event.target);
  const res = await fetch("/api/auth/verify", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    body: JSON.stringify(Object.fromEntries(form)),
  }});
  const data = await res.json();
  if (res.ok) {{ location.href = "/dashboard"; }}
  else {{ document.getElementById("message").textContent = data.error; }}
}});
</script>"#
    );
    shell("Verify", &body)
}

#[must_use]
pub fn render_dashboard(context: &ProfileContext) -> String {
    let body = format!(
        r#"<h1>Welcome, {name}</h1>
<p>Signed in as <span id="email">{email}</span></p>
<form id="upload" method="post" action="/api/upload" enctype="multipart/form-data">
  <input type="file" name="file" required>
  <button type="submit">Upload</button>
</form>"#,
        name = escape_html(context.display_name()),
        email = escape_html(context.email()),
    );
    shell("Dashboard", &body)
}

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n<main>\n{body}\n</main>\n</body>\n</html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
