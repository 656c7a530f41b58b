use crate::{
    cli::globals::GlobalArgs,
    identity::{IdentityClient, SharedIdentity},
    portal::{self, session::CookieConfig, upload::UploadRelay},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upload_url: Option<String>,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a configured URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let identity: SharedIdentity = Arc::new(
        IdentityClient::new(&args.globals.identity_url, args.globals.identity_anon_key.clone())
            .context("Failed to configure the Identity Service client")?,
    );

    let upload = args
        .upload_url
        .as_deref()
        .map(UploadRelay::new)
        .transpose()
        .context("Failed to configure the upload relay")?
        .map(Arc::new);

    let cookies = CookieConfig::new(args.globals.cookie_secure);

    portal::new(args.port, portal::router(identity, cookies, upload)).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("identity_url", args.globals.identity_url.clone()),
        ("identity_anon_key", "REDACTED".to_string()),
        (
            "upload_url",
            args.upload_url
                .as_deref()
                .map_or_else(|| "none".to_string(), redact_url),
        ),
        ("cookie_secure", args.globals.cookie_secure.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

// Internal endpoints sometimes carry credentials in the URL.
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-url".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", portal_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn portal_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    PORTAL_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed).to_string()
}

const PORTAL_BANNER: &str = r"
  +---------+
  |  +---+  |
  |  |   |  |  P O R T A L {VERSION}
  |  |   |  |
  +--+---+--+";
